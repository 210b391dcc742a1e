//! Configuration management for the bridge.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{DEFAULT_PORT, PASSWORD_LENGTH};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Appliance connection.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Keep-alive and watchdog timing.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let gateway = &self.gateway;

        if gateway.host.trim().is_empty() {
            return Err(Error::InvalidConfig("gateway.host is empty".into()));
        }

        if gateway.password.trim().is_empty() {
            return Err(Error::InvalidConfig("gateway.password is empty".into()));
        }

        if gateway.password.len() > PASSWORD_LENGTH {
            return Err(Error::InvalidConfig(format!(
                "gateway.password exceeds {PASSWORD_LENGTH} bytes"
            )));
        }

        match (&gateway.certificate, &gateway.issuer) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfig(
                    "gateway.certificate and gateway.issuer are mutually exclusive".into(),
                ))
            }
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "gateway.certificate or gateway.issuer is required".into(),
                ))
            }
            _ => {}
        }

        if self.heartbeat.interval.is_zero() {
            return Err(Error::InvalidConfig("heartbeat.interval must be non-zero".into()));
        }

        Ok(())
    }

    /// Get default config path.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "klf200", "klf200-bridge").map_or_else(
            || PathBuf::from("klf200-bridge.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Create example configuration.
    pub fn example() -> Self {
        Self {
            gateway: GatewayConfig {
                host: "192.168.0.20".into(),
                password: "velux123".into(),
                certificate: Some(PathBuf::from("/etc/klf200-bridge/klf200.pem")),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Appliance connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host name or IP address of the appliance.
    #[serde(default)]
    pub host: String,

    /// TLS port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Appliance password (the WiFi password printed on the device).
    #[serde(default)]
    pub password: String,

    /// Pinned certificate (PEM or DER); its issuer is trusted.
    pub certificate: Option<PathBuf>,

    /// Pinned issuer, e.g. `"CN=KLF200, O=VELUX A/S, C=DK"`.
    pub issuer: Option<String>,

    /// TCP connect and TLS handshake timeout.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Time to wait for the password confirmation.
    #[serde(default = "default_auth_timeout", with = "humantime_serde")]
    pub auth_timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_auth_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            password: String::new(),
            certificate: None,
            issuer: None,
            connect_timeout: default_connect_timeout(),
            auth_timeout: default_auth_timeout(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("certificate", &self.certificate)
            .field("issuer", &self.issuer)
            .field("connect_timeout", &self.connect_timeout)
            .field("auth_timeout", &self.auth_timeout)
            .finish()
    }
}

/// Keep-alive configuration.
///
/// The appliance drops idle connections after about 15 minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Keep-alive period.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Extra time before a silent connection is considered dead, also the
    /// delay before reconnecting after a reboot.
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(7 * 60)
}
fn default_grace_period() -> Duration {
    Duration::from_secs(60)
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            grace_period: default_grace_period(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text or json).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable colored output.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_color(),
        }
    }
}

/// Initialize logging.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(config.color).with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::example()
    }

    #[test]
    fn test_example_is_valid() {
        valid().validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("[gateway]\nhost = \"klf\"\n").unwrap();
        assert_eq!(config.gateway.port, 51200);
        assert_eq!(config.gateway.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.heartbeat.interval, Duration::from_secs(420));
        assert_eq!(config.heartbeat.grace_period, Duration::from_secs(60));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_humantime_durations() {
        let config: Config = toml::from_str(
            "[heartbeat]\ninterval = \"5m\"\ngrace_period = \"30s\"\n",
        )
        .unwrap();
        assert_eq!(config.heartbeat.interval, Duration::from_secs(300));
        assert_eq!(config.heartbeat.grace_period, Duration::from_secs(30));
    }

    #[test]
    fn test_validation() {
        let mut config = valid();
        config.gateway.host = " ".into();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = valid();
        config.gateway.password = "x".repeat(33);
        assert!(config.validate().is_err());

        let mut config = valid();
        config.gateway.password = "x".repeat(32);
        config.validate().unwrap();

        let mut config = valid();
        config.gateway.issuer = Some("CN=KLF200".into());
        assert!(config.validate().is_err());

        let mut config = valid();
        config.gateway.certificate = None;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.heartbeat.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let text = format!("{:?}", valid().gateway);
        assert!(!text.contains("velux123"));
        assert!(text.contains("<redacted>"));
    }
}
