//! Download of recorded data over plain HTTP.
//!
//! A recording is served under the HTTP path reported by
//! `recordings/{uuid}.http-path`. Its JSON manifest names the gaze, event and
//! IMU files, each of which holds one JSON value per line.

use crate::client::G3Client;
use crate::error::{G3Error, Result};
use serde_json::Value;
use uuid::Uuid;

/// Data streams stored alongside a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStream {
    Gaze,
    Events,
    Imu,
}

impl RecordingStream {
    fn manifest_key(self) -> &'static str {
        match self {
            RecordingStream::Gaze => "gaze",
            RecordingStream::Events => "events",
            RecordingStream::Imu => "imu",
        }
    }
}

/// Parse line-delimited JSON, skipping blank lines
pub fn parse_json_lines(text: &str) -> Result<Vec<Value>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| G3Error::Malformed(format!("{}: {}", e, line)))
        })
        .collect()
}

impl G3Client {
    /// HTTP URL of a recording
    pub async fn recording_url(&self, uuid: Uuid) -> Result<String> {
        let object = format!("recordings/{}", uuid);
        let path = self.get_property(&object, "http-path").await?;
        let path = path
            .as_str()
            .ok_or_else(|| G3Error::Malformed(format!("{}.http-path is not a string: {}", object, path)))?;
        Ok(format!("{}{}", self.http_url(), path))
    }

    /// The recording's JSON manifest
    pub async fn recording_g3(&self, uuid: Uuid) -> Result<Value> {
        let url = self.recording_url(uuid).await?;
        let text = self.fetch(&url, &[]).await?;
        serde_json::from_str(&text).map_err(|e| G3Error::Malformed(format!("{}: {}", url, e)))
    }

    /// All entries of one data stream of a recording
    pub async fn recording_stream(&self, uuid: Uuid, stream: RecordingStream) -> Result<Vec<Value>> {
        let base_url = self.recording_url(uuid).await?;
        let manifest = self.recording_g3(uuid).await?;

        let key = stream.manifest_key();
        let file = manifest
            .get(key)
            .and_then(|s| s.get("file"))
            .and_then(Value::as_str)
            .ok_or_else(|| G3Error::Malformed(format!("manifest has no {}.file", key)))?;

        let url = format!("{}/{}", base_url, file);
        let text = self
            .fetch(&url, &[("use-content-encoding", "true")])
            .await?;
        let entries = parse_json_lines(&text)?;
        tracing::debug!("Fetched {} {} entries from {}", entries.len(), key, url);
        Ok(entries)
    }

    pub async fn recording_gaze(&self, uuid: Uuid) -> Result<Vec<Value>> {
        self.recording_stream(uuid, RecordingStream::Gaze).await
    }

    pub async fn recording_events(&self, uuid: Uuid) -> Result<Vec<Value>> {
        self.recording_stream(uuid, RecordingStream::Events).await
    }

    pub async fn recording_imu(&self, uuid: Uuid) -> Result<Vec<Value>> {
        self.recording_stream(uuid, RecordingStream::Imu).await
    }

    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let response = self
            .http()
            .get(url)
            .query(query)
            .timeout(self.config().http_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(G3Error::SemanticFailure {
                path: url.to_string(),
                detail: format!("HTTP {}", status),
            });
        }
        Ok(response.text().await?)
    }
}
