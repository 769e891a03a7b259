//! HTTP implementation of the [`Backend`] port.
//!
//! Blocking `reqwest` client: every call is made from the loop thread that
//! needs the answer, so there is nothing to gain from an async client here.
//!
//! | Operation                   | Request                                        |
//! |-----------------------------|------------------------------------------------|
//! | get_configuration           | `GET  {node}/configuration` (404 = none yet)   |
//! | post_measurement            | `POST {node}/readings` JSON                    |
//! | post_picture                | `POST {node}/readings/{reading}/photos` form   |
//! | get_manual_request_pending  | `GET  {node}/manual-reading`                   |
//!
//! Paths come from [`NodeConfig`] templates with `{node}` and `{reading}`
//! placeholders.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use embassy_time::Duration;
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::model::{Configuration, Measurement, MeasurementId, Picture, State};
use crate::app::ports::Backend;
use crate::config::NodeConfig;
use crate::error::BackendError;

// ───────────────────────────────────────────────────────────────
// Wire types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateDto {
    /// Seconds.
    #[serde(alias = "Interval")]
    interval: u64,
    #[serde(alias = "UpperLimit")]
    upper_limit: f64,
    #[serde(alias = "LowerLimit")]
    lower_limit: f64,
    #[serde(alias = "PicturesNum", default)]
    pictures_num: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementBody {
    timestamp: DateTime<Utc>,
    water_level: f64,
    manual_reading: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementCreated {
    #[serde(alias = "ReadingId", alias = "id")]
    reading_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManualRequest {
    #[serde(alias = "ManualReading")]
    manual_reading: bool,
}

/// Decode a configuration body: a JSON object keyed by state name.
pub fn decode_configuration(body: &[u8]) -> Result<Configuration, BackendError> {
    let raw: BTreeMap<String, StateDto> =
        serde_json::from_slice(body).map_err(|e| BackendError::Decode(e.to_string()))?;

    let states = raw
        .into_iter()
        .map(|(name, s)| {
            let interval = Duration::try_from_secs(s.interval).ok_or_else(|| {
                BackendError::Decode(format!("state '{name}': interval {} s out of range", s.interval))
            })?;
            State::new(&name, s.lower_limit, s.upper_limit, interval, s.pictures_num)
                .map_err(|e| BackendError::Decode(format!("state '{name}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Configuration::new(states).map_err(|e| BackendError::Decode(e.to_string()))
}

// ───────────────────────────────────────────────────────────────
// HttpBackend
// ───────────────────────────────────────────────────────────────

pub struct HttpBackend {
    client: Client,
    configuration_url: String,
    measurement_url: String,
    picture_url_template: String,
    manual_request_url: String,
}

impl HttpBackend {
    pub fn new(config: &NodeConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(transport)?;

        let url = |template: &str| endpoint(&config.server_url, template, &config.node_name);
        Ok(Self {
            client,
            configuration_url: url(&config.get_configuration_path),
            measurement_url: url(&config.post_measurement_path),
            picture_url_template: url(&config.post_picture_path),
            manual_request_url: url(&config.get_manual_request_path),
        })
    }

    fn picture_url(&self, id: MeasurementId) -> String {
        self.picture_url_template.replace("{reading}", &id.to_string())
    }
}

impl Backend for HttpBackend {
    fn get_configuration(&self) -> Result<Option<Configuration>, BackendError> {
        let resp = self
            .client
            .get(&self.configuration_url)
            .send()
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = success(resp)?.bytes().map_err(transport)?;
        decode_configuration(&body).map(Some)
    }

    fn post_measurement(&self, m: &Measurement) -> Result<MeasurementId, BackendError> {
        let body = MeasurementBody {
            timestamp: m.timestamp,
            water_level: m.value,
            manual_reading: m.is_manual,
        };
        let resp = self
            .client
            .post(&self.measurement_url)
            .json(&body)
            .send()
            .map_err(transport)?;
        let created: MeasurementCreated = success(resp)?.json().map_err(transport)?;
        Ok(MeasurementId(created.reading_id))
    }

    fn post_picture(&self, id: MeasurementId, picture: &Picture) -> Result<(), BackendError> {
        let part = Part::bytes(picture.bytes.clone())
            .file_name(picture.file_name.clone())
            .mime_str("image/jpeg")
            .map_err(transport)?;
        let form = Form::new()
            .text("pictureNumber", picture.number.to_string())
            .part("picture", part);

        let resp = self
            .client
            .post(self.picture_url(id))
            .multipart(form)
            .send()
            .map_err(transport)?;
        success(resp)?;
        Ok(())
    }

    fn get_manual_request_pending(&self) -> Result<bool, BackendError> {
        let resp = self
            .client
            .get(&self.manual_request_url)
            .send()
            .map_err(transport)?;
        let req: ManualRequest = success(resp)?.json().map_err(transport)?;
        Ok(req.manual_reading)
    }
}

// ─── helpers ─────────────────────────────────────────────────

fn endpoint(server: &str, template: &str, node: &str) -> String {
    format!(
        "{}{}",
        server.trim_end_matches('/'),
        template.replace("{node}", node)
    )
}

fn success(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(BackendError::Status(status.as_u16()))
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    if e.is_decode() {
        BackendError::Decode(e.to_string())
    } else {
        BackendError::Transport(e.to_string())
    }
}
