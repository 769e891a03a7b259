//! Ultrasonic water level sensor behind an Arduino on a serial link.
//!
//! The board measures the distance from the sensor down to the water
//! surface. The node asks for one reading by writing a single request byte
//! and gets back an ASCII number terminated by `\n`, possibly split over
//! several reads. Blank lines are skipped, so a `\r\n` that reaches us as
//! two terminators never shifts later readings by one response.
//!
//! ```text
//!  node ── 0x01 ──────────▶ Arduino
//!       ◀─ "123.4\r\n" ───
//! ```
//!
//! Water level = mounting distance - measured distance.
//!
//! Every exchange is bounded by a read timeout: a silent board is reported
//! as `Io(TimedOut)` instead of stalling the Measurer.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use heapless::Vec;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::app::ports::SensorReader;
use crate::error::{Error, SensorError};

/// Byte that asks the board for one measurement.
const REQUEST_BYTE: u8 = 0x01;

/// Longest response line accepted, terminator excluded.
pub const MAX_LINE_LEN: usize = 128;

/// Opening the tty resets the board; give it time to boot.
const BOARD_RESET_DELAY: Duration = Duration::from_secs(2);

/// Response bound used when none is configured.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ArduinoLevelSensor<P> {
    port: P,
    /// Distance from the sensor to the river bed (cm).
    sensor_distance: f64,
    read_timeout: Duration,
}

impl ArduinoLevelSensor<Box<dyn SerialPort>> {
    /// Open the serial device at `baud_rate`, 8N1, raw mode. Failure here is
    /// fatal at startup.
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration, sensor_distance: f64) -> Result<Self, Error> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|e| Error::Init(format!("cannot open sensor link {path}: {e}")))?;
        log::info!("WaterLevel: opened {} at {} baud, waiting for board reset", path, baud_rate);
        thread::sleep(BOARD_RESET_DELAY);
        Ok(Self::new(port, sensor_distance).with_read_timeout(read_timeout))
    }
}

impl<P: Read + Write> ArduinoLevelSensor<P> {
    pub fn new(port: P, sensor_distance: f64) -> Self {
        Self {
            port,
            sensor_distance,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Ask for one reading and return the raw distance.
    fn request_distance(&mut self) -> Result<f64, SensorError> {
        self.port
            .write_all(&[REQUEST_BYTE])
            .and_then(|()| self.port.flush())
            .map_err(|e| SensorError::Io(e.kind()))?;

        let deadline = Instant::now().checked_add(self.read_timeout);
        let mut line: Vec<u8, MAX_LINE_LEN> = Vec::new();
        let mut chunk = [0u8; 32];
        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(SensorError::Io(ErrorKind::TimedOut));
            }
            let n = match self.port.read(&mut chunk) {
                Ok(0) => return Err(SensorError::Disconnected),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(SensorError::Io(ErrorKind::TimedOut));
                }
                Err(e) => return Err(SensorError::Io(e.kind())),
            };
            for &b in &chunk[..n] {
                if b != b'\n' {
                    line.push(b).map_err(|_| SensorError::LineTooLong)?;
                } else if line.iter().all(u8::is_ascii_whitespace) {
                    line.clear();
                } else {
                    return parse_level_line(&line);
                }
            }
        }
    }
}

impl<P: Read + Write> SensorReader for ArduinoLevelSensor<P> {
    fn read_level(&mut self) -> Result<f64, SensorError> {
        let distance = self.request_distance()?;
        log::debug!("WaterLevel: distance {} cm", distance);
        Ok(self.sensor_distance - distance)
    }
}

/// Parse one response line (without its `\n`) as a distance.
pub fn parse_level_line(line: &[u8]) -> Result<f64, SensorError> {
    let text = core::str::from_utf8(line).map_err(|_| SensorError::Malformed)?;
    let value: f64 = text.trim().parse().map_err(|_| SensorError::Malformed)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SensorError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Serial port double: records writes, replays canned read chunks.
    struct MockPort {
        written: std::vec::Vec<u8>,
        chunks: VecDeque<io::Result<std::vec::Vec<u8>>>,
    }

    impl MockPort {
        fn replying(chunks: &[&[u8]]) -> Self {
            Self {
                written: std::vec::Vec::new(),
                chunks: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
            }
        }
    }

    impl Read for MockPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut c)) => {
                    let n = c.len().min(buf.len());
                    buf[..n].copy_from_slice(&c[..n]);
                    if n < c.len() {
                        self.chunks.push_front(Ok(c.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for MockPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn level_is_mount_distance_minus_reading() {
        let mut s = ArduinoLevelSensor::new(MockPort::replying(&[b"150.5\r\n"]), 600.0);
        assert!((s.read_level().unwrap() - 449.5).abs() < 1e-9);
        assert_eq!(s.port.written, [REQUEST_BYTE]);
    }

    #[test]
    fn response_split_across_reads() {
        let mut s = ArduinoLevelSensor::new(MockPort::replying(&[b"12", b"3", b"\n"]), 200.0);
        assert!((s.read_level().unwrap() - 77.0).abs() < 1e-9);
    }

    #[test]
    fn interrupted_read_is_retried() {
        let mut port = MockPort::replying(&[b"10\n"]);
        port.chunks
            .push_front(Err(io::Error::from(ErrorKind::Interrupted)));
        let mut s = ArduinoLevelSensor::new(port, 100.0);
        assert!((s.read_level().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn closed_link_mid_line() {
        let mut s = ArduinoLevelSensor::new(MockPort::replying(&[b"12"]), 100.0);
        assert_eq!(s.read_level(), Err(SensorError::Disconnected));
    }

    #[test]
    fn runaway_line_is_rejected() {
        let long = [b'1'; MAX_LINE_LEN + 1];
        let mut s = ArduinoLevelSensor::new(MockPort::replying(&[&long]), 100.0);
        assert_eq!(s.read_level(), Err(SensorError::LineTooLong));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(parse_level_line(b"abc"), Err(SensorError::Malformed));
        assert_eq!(parse_level_line(b""), Err(SensorError::Malformed));
        assert_eq!(parse_level_line(b"inf"), Err(SensorError::Malformed));
        assert_eq!(parse_level_line(&[0xff, 0xfe]), Err(SensorError::Malformed));
        assert_eq!(parse_level_line(b" 42 \r"), Ok(42.0));
    }

    #[test]
    fn stray_terminators_do_not_shift_readings() {
        // A tty translating CR to NL turns "150\r\n" into "150\n\n".
        let port = MockPort::replying(&[b"150\n", b"\n", b"140\n", b"\r\n\r\n130\r\n"]);
        let mut s = ArduinoLevelSensor::new(port, 600.0);
        assert_eq!(s.read_level(), Ok(450.0));
        assert_eq!(s.read_level(), Ok(460.0));
        assert_eq!(s.read_level(), Ok(470.0));
        assert_eq!(s.port.written, [REQUEST_BYTE; 3]);
    }

    /// Port that never answers: each read waits out its timeout, as a real
    /// tty opened with a read timeout does.
    struct SilentPort {
        per_read: Duration,
        chunk: Option<&'static [u8]>,
    }

    impl Read for SilentPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(self.per_read);
            match self.chunk {
                None => Err(io::Error::from(ErrorKind::TimedOut)),
                Some(c) => {
                    buf[..c.len()].copy_from_slice(c);
                    Ok(c.len())
                }
            }
        }
    }

    impl Write for SilentPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn silent_board_times_out() {
        let port = SilentPort {
            per_read: Duration::from_millis(50),
            chunk: None,
        };
        let mut s = ArduinoLevelSensor::new(port, 600.0).with_read_timeout(Duration::from_millis(50));
        let started = Instant::now();
        assert_eq!(s.read_level(), Err(SensorError::Io(ErrorKind::TimedOut)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn trickling_board_is_bounded_by_deadline() {
        // Bytes keep coming but the line never ends.
        let port = SilentPort {
            per_read: Duration::from_millis(10),
            chunk: Some(b"1"),
        };
        let mut s = ArduinoLevelSensor::new(port, 600.0).with_read_timeout(Duration::from_millis(100));
        let started = Instant::now();
        assert_eq!(s.read_level(), Err(SensorError::Io(ErrorKind::TimedOut)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn missing_device_is_init_error() {
        let r = ArduinoLevelSensor::open("/nonexistent/ttyACM9", 9600, DEFAULT_READ_TIMEOUT, 600.0);
        assert!(matches!(r, Err(Error::Init(_))));
    }
}
