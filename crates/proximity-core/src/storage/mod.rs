mod config;
pub mod home_store;

pub use config::{AlertsConfig, Config, GeocoderConfig, MonitorConfig, TrackingConfig};
pub use home_store::HomeStore;

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `PROXIMITY_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/proximity[-dev]/`, with `PROXIMITY_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("PROXIMITY_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("PROXIMITY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("proximity-dev")
            } else {
                base_dir.join("proximity")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
