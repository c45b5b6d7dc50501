// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry-lifetime configuration.
//
// Everything that used to be ambient process state (bus naming, well-known
// directories, call timeouts) is carried explicitly by a `FrontendConfig`
// passed at registry construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Well-known bus name owned by print dialogs.
pub const DIALOG_BUS_NAME: &str = "org.openprinting.PrintFrontend";

/// Service-name prefix shared by all print backends; a backend's descriptor
/// file carries this prefix plus the backend name.
pub const BACKEND_PREFIX: &str = "org.openprinting.Backend.";

/// File holding the last-saved print settings, in the user config dir.
pub const PRINT_SETTINGS_FILE: &str = "print-settings";

/// File listing default printers, one `printer_id#backend_name` per line.
pub const DEFAULT_PRINTERS_FILE: &str = "default-printers";

/// Subdirectory of the config roots used by this protocol.
const CONFIG_SUBDIR: &str = "platen";

/// Default location of backend descriptor files.
const DEFAULT_BACKEND_INFO_DIR: &str = "/usr/share/print-backends";

/// Configuration for one frontend (registry) instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Optional suffix appended to [`DIALOG_BUS_NAME`], so several dialogs
    /// can own distinct bus names at once.
    pub instance_name: Option<String>,
    /// Directory scanned for backend descriptor files.
    pub backend_info_dir: PathBuf,
    /// Override for the per-user config directory; resolved from
    /// `XDG_CONFIG_HOME`/`HOME` when unset.
    pub user_config_dir: Option<PathBuf>,
    /// Override for the system config directory; resolved from
    /// `XDG_CONFIG_DIRS`/`/etc` when unset.
    pub system_config_dir: Option<PathBuf>,
    /// Timeout hint for blocking transport calls. The transport
    /// implementation enforces it; the library itself never retries.
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            instance_name: None,
            backend_info_dir: PathBuf::from(DEFAULT_BACKEND_INFO_DIR),
            user_config_dir: None,
            system_config_dir: None,
            call_timeout: Duration::from_secs(15),
        }
    }
}

impl FrontendConfig {
    /// Default configuration with a generated instance name, for dialogs
    /// that may run several times concurrently.
    pub fn unique_instance() -> Self {
        Self {
            instance_name: Some(uuid::Uuid::new_v4().simple().to_string()),
            ..Self::default()
        }
    }

    /// The bus name this frontend instance owns.
    pub fn bus_name(&self) -> String {
        match &self.instance_name {
            Some(instance) => format!("{DIALOG_BUS_NAME}{instance}"),
            None => DIALOG_BUS_NAME.to_string(),
        }
    }

    /// Resolve (and create if needed) the per-user config directory.
    ///
    /// Honors the explicit override first, then `XDG_CONFIG_HOME`, then
    /// `$HOME/.config`. Returns `None` when no candidate can be created.
    pub fn user_config_dir(&self) -> Option<PathBuf> {
        let candidate = match &self.user_config_dir {
            Some(dir) => dir.clone(),
            None => {
                if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                    PathBuf::from(xdg).join(CONFIG_SUBDIR)
                } else if let Ok(home) = std::env::var("HOME") {
                    PathBuf::from(home).join(".config").join(CONFIG_SUBDIR)
                } else {
                    return None;
                }
            }
        };
        ensure_dir(&candidate)
    }

    /// Resolve (and create if needed) the system config directory.
    ///
    /// Honors the explicit override first, then each entry of
    /// `XDG_CONFIG_DIRS`, then `/etc`.
    pub fn system_config_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.system_config_dir {
            return ensure_dir(dir);
        }
        if let Ok(xdg_dirs) = std::env::var("XDG_CONFIG_DIRS") {
            for root in xdg_dirs.split(':').filter(|r| !r.is_empty()) {
                if let Some(dir) = ensure_dir(&Path::new(root).join(CONFIG_SUBDIR)) {
                    return Some(dir);
                }
            }
        }
        ensure_dir(&Path::new("/etc").join(CONFIG_SUBDIR))
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Return the directory if it exists or could be created, else `None`.
fn ensure_dir(dir: &Path) -> Option<PathBuf> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Some(dir.to_path_buf()),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "config directory unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_name_appends_instance_suffix() {
        let config = FrontendConfig::default();
        assert_eq!(config.bus_name(), DIALOG_BUS_NAME);

        let config = FrontendConfig {
            instance_name: Some("A1".into()),
            ..FrontendConfig::default()
        };
        assert_eq!(config.bus_name(), "org.openprinting.PrintFrontendA1");
    }

    #[test]
    fn unique_instance_names_differ() {
        let a = FrontendConfig::unique_instance();
        let b = FrontendConfig::unique_instance();
        assert_ne!(a.bus_name(), b.bus_name());
    }

    #[test]
    fn explicit_dir_overrides_win() {
        let dir = tempfile::tempdir().expect("tempdir");
        let user = dir.path().join("user");
        let system = dir.path().join("system");
        let config = FrontendConfig {
            user_config_dir: Some(user.clone()),
            system_config_dir: Some(system.clone()),
            ..FrontendConfig::default()
        };
        assert_eq!(config.user_config_dir(), Some(user.clone()));
        assert_eq!(config.system_config_dir(), Some(system.clone()));
        assert!(user.is_dir());
        assert!(system.is_dir());
    }

    #[test]
    fn config_json_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frontend.json");

        let config = FrontendConfig {
            instance_name: Some("X".into()),
            call_timeout: Duration::from_secs(30),
            ..FrontendConfig::default()
        };
        config.save(&path).expect("save");

        let loaded = FrontendConfig::load(&path).expect("load");
        assert_eq!(loaded.instance_name.as_deref(), Some("X"));
        assert_eq!(loaded.call_timeout, Duration::from_secs(30));
    }
}
