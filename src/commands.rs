//! Named commands of the Glasses 3 API.
//!
//! Each of these is a single property read/write or action call on a fixed
//! path; they carry no protocol logic of their own.

use crate::client::G3Client;
use crate::error::{G3Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use uuid::Uuid;

/// Printable characters the recorder refuses in folder names
const ILLEGAL_FOLDER_CHARS: &[char] = &['"', '*', '/', ':', '<', '>', '?', '\\', '|', '_'];

/// Check a recording folder name before sending it
///
/// The folder is created on a FAT32/exFAT card, so control characters
/// 0x00-0x1F and `" * / : < > ? \ | _` are rejected.
pub fn validate_folder_name(folder_name: &str) -> Result<()> {
    if let Some(c) = folder_name
        .chars()
        .find(|c| ILLEGAL_FOLDER_CHARS.contains(c) || (*c as u32) < 0x20)
    {
        return Err(G3Error::InvalidArgument(format!(
            "folder name can not include {:?}",
            c
        )));
    }
    Ok(())
}

fn parse_uuid(path: &str, value: &Value) -> Result<Uuid> {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| G3Error::Malformed(format!("{} is not a uuid: {}", path, value)))
}

impl G3Client {
    // System

    pub async fn battery_level(&self) -> Result<Value> {
        self.get_property("system/battery", "level").await
    }

    pub async fn remaining_battery_time(&self) -> Result<Value> {
        self.get_property("system/battery", "remaining-time").await
    }

    pub async fn battery_state(&self) -> Result<Value> {
        self.get_property("system/battery", "state").await
    }

    pub async fn system_time(&self) -> Result<Value> {
        self.get_property("system", "time").await
    }

    pub async fn system_timezone(&self) -> Result<Value> {
        self.get_property("system", "timezone").await
    }

    pub async fn head_unit_serial(&self) -> Result<Value> {
        self.get_property("system", "head-unit-serial").await
    }

    pub async fn recording_unit_serial(&self) -> Result<Value> {
        self.get_property("system", "recording-unit-serial").await
    }

    pub async fn firmware_version(&self) -> Result<Value> {
        self.get_property("system", "version").await
    }

    pub async fn sd_card_state(&self) -> Result<Value> {
        self.get_property("system/storage", "card-state").await
    }

    // Recorder

    /// Uuid of the recording in progress, `None` when idle
    pub async fn recording_uuid(&self) -> Result<Option<Uuid>> {
        let value = self.get_property("recorder", "uuid").await?;
        if value.is_null() {
            return Ok(None);
        }
        parse_uuid("recorder.uuid", &value).map(Some)
    }

    pub async fn recording_folder(&self) -> Result<Value> {
        self.get_property("recorder", "folder").await
    }

    /// Seconds recorded so far; -1 when not recording
    pub async fn duration(&self) -> Result<Value> {
        self.get_property("recorder", "duration").await
    }

    pub async fn is_recording(&self) -> Result<bool> {
        Ok(self.duration().await? != json!(-1))
    }

    pub async fn start_recording(&self) -> Result<Value> {
        self.send_action("recorder", "start", vec![]).await
    }

    pub async fn stop_recording(&self) -> Result<Value> {
        self.send_action("recorder", "stop", vec![]).await
    }

    /// Set the folder the next recording is stored in
    pub async fn set_folder_name(&self, folder_name: &str) -> Result<Value> {
        validate_folder_name(folder_name)?;
        self.set_property("recorder", "folder", json!(folder_name)).await
    }

    /// Name stored in the recording and shown by the glasses' apps
    pub async fn set_visible_name(&self, visible_name: &str) -> Result<Value> {
        self.set_property("recorder", "visible-name", json!(visible_name))
            .await
    }

    /// Store an arbitrary blob under `key` in the current recording
    pub async fn meta_insert(&self, key: &str, data: impl AsRef<[u8]>) -> Result<Value> {
        let encoded = BASE64.encode(data.as_ref());
        self.send_action("recorder", "meta_insert", vec![json!(key), json!(encoded)])
            .await
    }

    /// Add a tagged event to the current recording
    pub async fn send_event(&self, tag: &str, data: Value) -> Result<Value> {
        self.send_action("recorder", "send-event", vec![json!(tag), data])
            .await
    }

    // Calibration

    pub async fn emit_calibrate_markers(&self) -> Result<Value> {
        self.send_action("calibrate", "emit-markers", vec![]).await
    }

    pub async fn calibrate(&self) -> Result<Value> {
        self.send_action("calibrate", "run", vec![]).await
    }

    // Settings

    pub async fn set_gaze_overlay(&self, overlay: bool) -> Result<Value> {
        self.set_property("settings", "gaze_overlay", json!(overlay))
            .await
    }

    // Network

    /// Create an empty Wi-Fi configuration and return its uuid
    pub async fn create_wifi_config(&self, name: &str) -> Result<Uuid> {
        let value = self
            .send_action("network/wifi", "create-config", vec![json!(name)])
            .await?;
        parse_uuid("network/wifi!create-config", &value)
    }

    /// Fill in and save a WPA-PSK Wi-Fi configuration
    pub async fn config_wifi(&self, uuid: Uuid, ssid: &str, psk: &str) -> Result<()> {
        let object = format!("network/wifi/configurations/{}", uuid);
        self.set_property(&object, "ssid-name", json!(ssid)).await?;
        self.set_property(&object, "security", json!("wpa-psk")).await?;
        self.set_property(&object, "psk", json!(psk)).await?;
        self.send_action(&object, "save", vec![]).await?;
        Ok(())
    }

    pub async fn connect_wifi(&self, uuid: Uuid) -> Result<Value> {
        self.send_action("network/wifi", "connect", vec![json!(uuid.to_string())])
            .await
    }

    pub async fn disconnect_wifi(&self) -> Result<Value> {
        self.send_action("network/wifi", "disconnect", vec![]).await
    }

    pub async fn scan_wifi(&self) -> Result<Value> {
        self.send_action("network/wifi", "scan", vec![]).await
    }

    pub async fn network_factory_reset(&self) -> Result<Value> {
        self.send_action("network", "reset", vec![]).await
    }
}
