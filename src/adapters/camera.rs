//! Camera adapters implementing [`ImageCapture`].
//!
//! On the field node stills come from the Raspberry Pi camera via the
//! `raspistill` tool. Bench setups without a camera use [`StaticPicture`],
//! which always hands back the same file.

use std::path::PathBuf;
use std::process::Command;

use crate::app::ports::ImageCapture;
use crate::error::CameraError;

/// JPEG quality passed to `raspistill` (0-100).
const JPEG_QUALITY: &str = "20";
/// Preview/settle time before capture, in ms.
const CAPTURE_DELAY_MS: &str = "500";

pub struct RaspistillCamera {
    dir: PathBuf,
}

impl RaspistillCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ImageCapture for RaspistillCamera {
    fn capture(&mut self, name: &str) -> Result<PathBuf, CameraError> {
        let path = self.dir.join(format!("{name}.jpg"));
        log::debug!("Camera: capturing {}", path.display());

        let status = Command::new("raspistill")
            .arg("-o")
            .arg(&path)
            .args(["-q", JPEG_QUALITY, "-t", CAPTURE_DELAY_MS, "-n"])
            .status()
            .map_err(|e| CameraError::Io(e.kind()))?;

        if !status.success() {
            return Err(CameraError::CaptureFailed(status.code()));
        }
        Ok(path)
    }
}

/// Simulation camera: every capture is the same pre-existing file.
pub struct StaticPicture {
    path: PathBuf,
}

impl StaticPicture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageCapture for StaticPicture {
    fn capture(&mut self, _name: &str) -> Result<PathBuf, CameraError> {
        Ok(self.path.clone())
    }
}
