//! XDG Base Directory paths for drover.
//!
//! The daemon keeps its config (daemon settings, tenant agent settings) and
//! its data (activation state, agent logs) under XDG paths on every platform,
//! the way tools like gh and kubectl do.

use std::path::PathBuf;

/// Get the drover config directory.
///
/// Returns `$XDG_CONFIG_HOME/drover` if set, otherwise `~/.config/drover`.
/// Daemon `config.toml`, `global.toml` and `tenants/*.toml` live here.
///
/// # Examples
///
/// ```
/// use drover_paths::config_dir;
///
/// let config = config_dir();
/// let tenants = config.join("tenants");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_or_home("XDG_CONFIG_HOME", ".config")
}

/// Get the drover data directory.
///
/// Returns `$XDG_DATA_HOME/drover` if set, otherwise `~/.local/share/drover`.
/// Activation state and agent log files are written here.
pub fn data_dir() -> PathBuf {
    xdg_or_home("XDG_DATA_HOME", ".local/share")
}

/// Directory holding one `<tenant>.toml` per tenant.
pub fn tenants_dir() -> PathBuf {
    config_dir().join("tenants")
}

fn xdg_or_home(var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(var) {
        PathBuf::from(base).join("drover")
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join("drover")
    } else {
        PathBuf::from(home_relative).join("drover")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_drover() {
        let path = config_dir();
        assert!(
            path.ends_with("drover"),
            "config_dir should end with 'drover'"
        );
    }

    #[test]
    fn test_data_dir_ends_with_drover() {
        let path = data_dir();
        assert!(path.ends_with("drover"), "data_dir should end with 'drover'");
    }

    #[test]
    fn test_tenants_dir_is_under_config_dir() {
        assert!(tenants_dir().starts_with(config_dir()));
        assert!(tenants_dir().ends_with("tenants"));
    }

    #[test]
    fn test_dirs_respect_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
            std::env::set_var("XDG_DATA_HOME", "/tmp/test-data");
        }
        assert_eq!(config_dir(), PathBuf::from("/tmp/test-config/drover"));
        assert_eq!(data_dir(), PathBuf::from("/tmp/test-data/drover"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
