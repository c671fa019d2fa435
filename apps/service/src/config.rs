use std::{env, fmt, fs, io, path};

use async_trait::async_trait;
use checkup::{CheckerOptions, MonitorCheckConfig, OptionsError, Settings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("Invalid [checker] options: {0}")]
    InvalidChecker(#[from] OptionsError),
    #[error("Neither XDG_CONFIG_HOME nor a home directory is available")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Last-status file, relative paths resolve against the config directory
    #[serde(default = "default_state_file")]
    pub state_file: path::PathBuf,
    #[serde(default)]
    pub checker: CheckerOptions,
    #[serde(default)]
    pub proxy: Proxy,
    #[serde(default)]
    pub notifier: Notifier,
    #[serde(default)]
    pub monitors: Vec<MonitorCheckConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(default)]
    pub enabled: bool,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifier {
    /// Reminders are only logged when unset
    pub webhook_url: Option<String>,
}

fn default_state_file() -> path::PathBuf {
    path::PathBuf::from("state.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            checker: CheckerOptions::default(),
            proxy: Proxy::default(),
            notifier: Notifier::default(),
            monitors: Vec::new(),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().is_none_or(|ext| ext != "toml") {
        path.set_extension("toml");
    }
    path
}

/// Resolve the config path: the given one, or $XDG_CONFIG_HOME/checkup/config.toml
/// falling back to $HOME/.config/checkup/config.toml
pub fn config_path(optional_path: Option<&path::Path>) -> Result<path::PathBuf, Error> {
    if let Some(path) = optional_path {
        return Ok(normalize_toml_path(path));
    }

    let base = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(base.join("checkup/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };
        let unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Checkup Configuration:")?;
        write_title_1(f, "Checker")?;
        write_1(f, "Request Timeout (s)", &self.checker.request_timeout_secs)?;
        write_1(f, "Certificate Timeout (s)", &self.checker.certificate_timeout_secs)?;
        write_1(
            f,
            "Reminder Window",
            &format!(
                "{:02}:00 + {} min",
                self.checker.reminder_hour, self.checker.reminder_window_minutes
            ),
        )?;
        write_1(f, "Keyword Certificate Pre-check", &self.checker.keyword_certificate_precheck)?;
        write_title_1(f, "Proxy")?;
        write_1(f, "Enabled", &self.proxy.enabled)?;
        write_1(f, "URL", &unset(&self.proxy.url))?;
        write_title_1(f, "Notifier")?;
        write_1(f, "Webhook", &unset(&self.notifier.webhook_url))?;
        write_title_1(f, "State")?;
        write_1(f, "File", &self.state_file.display())?;
        write_title_1(f, &format!("Monitors ({})", self.monitors.len()))?;
        for monitor in &self.monitors {
            write_1(f, &monitor_label(monitor), &monitor.url)?;
            write_2(f, "Type", &format!("{:?}", monitor.check_type))?;
            write_2(f, "Accepted Status", &monitor.accepted_status_range)?;
        }

        Ok(())
    }
}

/// Human-facing monitor label: name, then id, then url
pub fn monitor_label(monitor: &MonitorCheckConfig) -> String {
    monitor
        .monitor_name
        .clone()
        .or_else(|| monitor.monitor_id.clone())
        .unwrap_or_else(|| monitor.url.clone())
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config at `path` if one does not exist
    ///
    /// ```rust,ignore
    /// let path = config::config_path(None)?;
    /// let cfg = config::Config::from_path(&path)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_path(config_path: &path::Path) -> Result<Self, Error> {
        if config_path.exists() {
            let raw_string = fs::read_to_string(config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.to_path_buf(), source })?;
            let config: Self = toml::from_str(raw_string.as_str())?;
            config.checker.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.write_config(config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;
        let write_failed = |source| Error::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        fs::write(path, config_str).map_err(write_failed)
    }

    /// State file location for a config loaded from `config_path`
    pub fn state_path(&self, config_path: &path::Path) -> path::PathBuf {
        if self.state_file.is_absolute() {
            return self.state_file.clone();
        }
        config_path.parent().unwrap_or_else(|| path::Path::new(".")).join(&self.state_file)
    }

    /// Monitors matching `selector` by name or id, all of them without one
    pub fn select_monitors(&self, selector: Option<&str>) -> Vec<&MonitorCheckConfig> {
        self.monitors
            .iter()
            .filter(|monitor| {
                selector.is_none_or(|wanted| {
                    monitor.monitor_name.as_deref() == Some(wanted)
                        || monitor.monitor_id.as_deref() == Some(wanted)
                })
            })
            .collect()
    }
}

/// Proxy flag read from the loaded configuration
pub struct ConfigSettings {
    proxy_enabled: bool,
}

impl ConfigSettings {
    pub fn new(proxy: &Proxy) -> Self {
        Self { proxy_enabled: proxy.enabled }
    }
}

#[async_trait]
impl Settings for ConfigSettings {
    async fn is_proxy_enabled(&self) -> checkup::Result<bool> {
        Ok(self.proxy_enabled)
    }
}
