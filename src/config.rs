//! Configuration loaded from environment variables at startup.
//!
//! Centralizes all DPPCTL_* env var access into a single Config struct,
//! providing a single source of truth with fail-fast validation.

use std::path::PathBuf;
use std::sync::Mutex;

/// Global configuration instance, lazily initialized and resettable for tests.
static CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Configuration loaded from DPPCTL_* environment variables.
///
/// All environment variable access should go through this struct
/// rather than calling env::var directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding hostapd per-interface control sockets
    /// (DPPCTL_CTRL_DIR or /var/run/hostapd)
    pub ctrl_dir: PathBuf,
    /// Directory for the ephemeral reply socket and the log file
    /// (DPPCTL_RUNTIME_DIR or /tmp)
    pub runtime_dir: PathBuf,
    /// Association state file (DPPCTL_STATE_FILE or
    /// /tmp/dpp_configurator_state.json)
    pub state_file: PathBuf,
    /// Verbose flag (DPPCTL_VERBOSE=1)
    pub verbose: bool,
}

impl Config {
    /// Initialize global config from environment variables (call once at startup).
    /// Can be called multiple times - subsequent calls are no-ops.
    pub fn init() {
        let mut config = CONFIG.lock().unwrap();
        if config.is_none() {
            *config = Some(Self::from_env());
        }
    }

    /// Get reference to global config (must call init() first).
    /// Panics if init() was not called.
    pub fn get() -> Config {
        CONFIG
            .lock()
            .unwrap()
            .clone()
            .expect("Config::init() must be called before Config::get()")
    }

    /// Get the global config if it has been initialized.
    ///
    /// Used by code that must not panic when running outside the binary
    /// entry point (the logger, store warnings in unit tests).
    pub fn try_get() -> Option<Config> {
        CONFIG.lock().unwrap().clone()
    }

    /// Reset global config (test-only).
    /// Allows tests to reinitialize config with different env vars.
    #[cfg(test)]
    pub fn reset() {
        *CONFIG.lock().unwrap() = None;
    }

    /// Load configuration from environment variables
    fn from_env() -> Self {
        use std::env;

        // DPPCTL_CTRL_DIR: where hostapd exposes ctrl_interface sockets
        let ctrl_dir = env::var("DPPCTL_CTRL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/run/hostapd"));

        // DPPCTL_RUNTIME_DIR: scratch dir for reply socket + log
        let runtime_dir = env::var("DPPCTL_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"));

        // DPPCTL_STATE_FILE: association store location
        let state_file = env::var("DPPCTL_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp/dpp_configurator_state.json"));

        // DPPCTL_VERBOSE: boolean flag (true if "1")
        let verbose = env::var("DPPCTL_VERBOSE").map(|v| v == "1").unwrap_or(false);

        Self {
            ctrl_dir,
            runtime_dir,
            state_file,
            verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to set env var for test scope
    fn with_env<F>(key: &str, value: &str, f: F)
    where
        F: FnOnce(),
    {
        // SAFETY: Tests use serial_test to run single-threaded.
        // No data races possible when tests run serially.
        unsafe {
            env::set_var(key, value);
        }
        f();
        unsafe {
            env::remove_var(key);
        }
    }

    /// Helper to clear multiple env vars for test scope
    fn without_env<F>(keys: &[&str], f: F)
    where
        F: FnOnce(),
    {
        let saved: Vec<_> = keys.iter().map(|k| (k, env::var(k).ok())).collect();

        // SAFETY: Tests use serial_test to run single-threaded.
        // No data races possible when tests run serially.
        for key in keys {
            unsafe {
                env::remove_var(key);
            }
        }

        f();

        for (key, val) in saved {
            if let Some(v) = val {
                unsafe {
                    env::set_var(key, v);
                }
            }
        }
    }

    #[test]
    #[serial]
    fn default_ctrl_dir_is_hostapd_run_dir() {
        Config::reset();
        without_env(&["DPPCTL_CTRL_DIR"], || {
            Config::init();
            let config = Config::get();
            assert_eq!(config.ctrl_dir, PathBuf::from("/var/run/hostapd"));
        });
    }

    #[test]
    #[serial]
    fn ctrl_dir_env_overrides_default() {
        Config::reset();
        with_env("DPPCTL_CTRL_DIR", "/custom/hostapd", || {
            Config::init();
            let config = Config::get();
            assert_eq!(config.ctrl_dir, PathBuf::from("/custom/hostapd"));
        });
    }

    #[test]
    #[serial]
    fn default_state_file() {
        Config::reset();
        without_env(&["DPPCTL_STATE_FILE"], || {
            Config::init();
            let config = Config::get();
            assert_eq!(
                config.state_file,
                PathBuf::from("/tmp/dpp_configurator_state.json")
            );
        });
    }

    #[test]
    #[serial]
    fn state_file_env_overrides_default() {
        Config::reset();
        with_env("DPPCTL_STATE_FILE", "/var/lib/dppctl/state.json", || {
            Config::init();
            let config = Config::get();
            assert_eq!(config.state_file, PathBuf::from("/var/lib/dppctl/state.json"));
        });
    }

    #[test]
    #[serial]
    fn runtime_dir_env_overrides_default() {
        Config::reset();
        with_env("DPPCTL_RUNTIME_DIR", "/run/user/1000", || {
            Config::init();
            let config = Config::get();
            assert_eq!(config.runtime_dir, PathBuf::from("/run/user/1000"));
        });
    }

    #[test]
    #[serial]
    fn verbose_true_when_1() {
        Config::reset();
        with_env("DPPCTL_VERBOSE", "1", || {
            Config::init();
            assert!(Config::get().verbose);
        });
    }

    #[test]
    #[serial]
    fn verbose_false_when_unset_or_not_1() {
        Config::reset();
        without_env(&["DPPCTL_VERBOSE"], || {
            Config::init();
            assert!(!Config::get().verbose);
        });

        Config::reset();
        with_env("DPPCTL_VERBOSE", "0", || {
            Config::init();
            assert!(!Config::get().verbose);
        });
    }

    #[test]
    #[serial]
    fn try_get_none_before_init() {
        Config::reset();
        assert!(Config::try_get().is_none());
        Config::init();
        assert!(Config::try_get().is_some());
    }

    #[test]
    #[serial]
    fn reset_allows_reinit() {
        Config::reset();
        with_env("DPPCTL_CTRL_DIR", "/first", || {
            Config::init();
            assert_eq!(Config::get().ctrl_dir, PathBuf::from("/first"));
        });

        Config::reset();
        with_env("DPPCTL_CTRL_DIR", "/second", || {
            Config::init();
            assert_eq!(Config::get().ctrl_dir, PathBuf::from("/second"));
        });
    }
}
