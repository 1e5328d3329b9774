use crate::client::G3Client;
use crate::error::{G3Error, Result};
use crate::transport::url_host;
use std::process::Stdio;
use tokio::process::Command;

/// Port of the glasses' RTSP server
pub const RTSP_PORT: u16 = 8554;

impl G3Client {
    /// RTSP URL carrying scene video, eye video, gaze and audio
    pub fn livestream_url(&self) -> String {
        format!("rtsp://{}:{}/live/all", url_host(self.address()), RTSP_PORT)
    }

    /// Launch an external media player (e.g. `vlc`) on the live stream
    ///
    /// The player is detached; it keeps running after the client is dropped.
    pub async fn open_livestream(&self, player: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(G3Error::NotConnected);
        }

        let url = self.livestream_url();
        tracing::info!("Opening live stream {} in {}", url, player);
        let child = Command::new(player)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()?;
        tracing::debug!("Player started with pid {:?}", child.id());
        Ok(())
    }
}
