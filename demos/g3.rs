//! Small command line tool for poking at a pair of Glasses 3.
//!
//! ```text
//! cargo run --example g3 -- [address] [command]
//! ```
//!
//! Without an address the glasses are discovered. Commands: `status`
//! (default), `record <seconds>`, `calibrate`, `live`.

use std::time::Duration;
use tobii_g3::G3Client;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let looks_like_address = |s: &str| s.contains('.') || s.contains(':') || s.starts_with("g3");
    let address = if args.first().is_some_and(|a| looks_like_address(a)) {
        args.remove(0)
    } else {
        let Some(found) = G3Client::discover().await? else {
            eprintln!("No glasses found on the network");
            return Ok(());
        };
        found
    };
    let mut args = args.into_iter();
    let command = args.next().unwrap_or_else(|| "status".to_string());

    let client = G3Client::new(address);
    client.connect().await?;
    println!("Connected to {}", client.ws_url());

    match command.as_str() {
        "status" => {
            println!("Firmware:      {}", client.firmware_version().await?);
            println!("Head unit:     {}", client.head_unit_serial().await?);
            println!("Battery:       {}", client.battery_level().await?);
            println!("Battery state: {}", client.battery_state().await?);
            println!("SD card:       {}", client.sd_card_state().await?);
            println!("Recording:     {}", client.is_recording().await?);
        }
        "record" => {
            let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);
            client.start_recording().await?;
            println!("Recording {:?}", client.recording_uuid().await?);
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            client.stop_recording().await?;
            println!("Stopped after {}s", seconds);
        }
        "calibrate" => {
            client.emit_calibrate_markers().await?;
            println!("Calibration result: {}", client.calibrate().await?);
        }
        "live" => {
            client.open_livestream("vlc").await?;
        }
        other => {
            eprintln!("Unknown command: {}", other);
        }
    }

    client.disconnect().await;
    Ok(())
}
