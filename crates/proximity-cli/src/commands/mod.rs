pub mod check;
pub mod config;
pub mod geocode;
pub mod home;
pub mod watch;

use proximity_core::Config;

/// Load configuration, falling back to defaults when the file is unusable.
pub(crate) fn load_config() -> Config {
    Config::load_or_default()
}
