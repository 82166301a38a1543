use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ticketwatch_core::TicketDate;

/// Errors raised while loading or validating configuration. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for the watcher, parsed from `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Calendar days to watch. Deduplicated and sorted during loading.
    pub target_dates: Vec<TicketDate>,

    #[serde(default)]
    pub polling: PollingConfig,

    pub webhook: WebhookConfig,

    #[serde(default)]
    pub website: WebsiteConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ── Section configs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds to sleep between ticks.
    #[serde(default = "default_poll_interval")]
    pub interval_seconds: u64,

    /// Cap on a single availability check.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint URL. May contain `${VAR}` references resolved at startup.
    pub url: String,

    /// Informational event name (maker-style webhooks embed it in the URL).
    #[serde(default = "default_event_name")]
    pub event_name: String,

    /// Cap on a single delivery attempt.
    #[serde(default = "default_webhook_timeout")]
    pub timeout_seconds: u64,

    /// Hours between heartbeats. Zero disables them.
    #[serde(default = "default_heartbeat_hours")]
    pub heartbeat_interval_hours: u64,

    /// Minimum gap between availability notifications.
    #[serde(default = "default_min_notification_interval")]
    pub min_notification_interval_seconds: u64,
}

fn default_event_name() -> String {
    "ticket_available".into()
}

fn default_webhook_timeout() -> u64 {
    30
}

fn default_heartbeat_hours() -> u64 {
    24
}

fn default_min_notification_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteConfig {
    /// Calendar page to poll; also the link sent with availability alerts.
    #[serde(default = "default_website_url")]
    pub url: String,

    /// CSS class marking a day as on sale.
    #[serde(default = "default_availability_class")]
    pub availability_class: String,
}

fn default_website_url() -> String {
    "https://museum-tickets.nintendo.com/en/calendar".into()
}

fn default_availability_class() -> String {
    "sale".into()
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            url: default_website_url(),
            availability_class: default_availability_class(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of DEBUG, INFO, WARNING, ERROR, CRITICAL (case-insensitive).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "INFO".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// The equivalent `tracing` filter directive.
    pub fn tracing_directive(&self) -> &'static str {
        match self.level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }

    pub fn is_debug(&self) -> bool {
        self.level.eq_ignore_ascii_case("DEBUG")
    }
}

// ── Loading ─────────────────────────────────────────────────────────

impl WatchConfig {
    /// Parse, apply environment overrides, normalize and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_with(yaml, |key| std::env::var(key).ok())
    }

    /// Like [`from_yaml`](Self::from_yaml) with an explicit variable lookup.
    pub fn from_yaml_with(yaml: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: WatchConfig = serde_yaml::from_str(yaml)?;
        config.apply_overrides(lookup)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("TICKETWATCH_WEBHOOK_URL") {
            self.webhook.url = v;
        }
        if let Some(v) = get("TICKETWATCH_POLL_INTERVAL") {
            self.polling.interval_seconds = v.parse().map_err(|_| {
                ConfigError::Validation(format!("TICKETWATCH_POLL_INTERVAL is not a number: {v}"))
            })?;
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.target_dates.sort();
        self.target_dates.dedup();
        self.logging.level = self.logging.level.trim().to_uppercase();
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_dates.is_empty() {
            return Err(ConfigError::Validation(
                "At least one target date must be specified".into(),
            ));
        }
        if self.polling.interval_seconds < 1 {
            return Err(ConfigError::Validation(
                "Polling interval must be at least 1 second".into(),
            ));
        }
        if self.polling.request_timeout_seconds < 1 {
            return Err(ConfigError::Validation(
                "Request timeout must be at least 1 second".into(),
            ));
        }
        if self.webhook.timeout_seconds < 1 {
            return Err(ConfigError::Validation(
                "Webhook timeout must be at least 1 second".into(),
            ));
        }
        if self.webhook.url.trim().is_empty() {
            return Err(ConfigError::Validation("Webhook URL must not be empty".into()));
        }
        if self.website.availability_class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Availability class must not be empty".into(),
            ));
        }
        self.validate_website_url()?;
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_uppercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid logging level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_website_url(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.website.url).map_err(|e| {
            ConfigError::Validation(format!("Invalid website URL '{}': {e}", self.website.url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "Website URL must be http or https: {}",
                self.website.url
            )));
        }
        Ok(())
    }

    // ── Derived values ──────────────────────────────────────────────

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.request_timeout_seconds)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook.timeout_seconds)
    }

    pub fn min_notification_interval(&self) -> Duration {
        Duration::from_secs(self.webhook.min_notification_interval_seconds)
    }

    /// Heartbeat cadence in seconds. Zero when disabled.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.webhook.heartbeat_interval_hours.saturating_mul(3_600))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
target_dates: ["2025-09-26", "2025-09-25", "2025-09-26"]
polling:
  interval_seconds: 10
webhook:
  url: "https://maker.ifttt.com/trigger/test/with/key/test_key"
  event_name: "test_event"
  timeout_seconds: 30
website:
  url: "https://museum-tickets.nintendo.com/en/calendar"
  availability_class: "sale"
logging:
  level: "info"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(yaml: &str) -> Result<WatchConfig> {
        WatchConfig::from_yaml_with(yaml, no_env)
    }

    fn validation_message(result: Result<WatchConfig>) -> String {
        match result {
            Err(ConfigError::Validation(msg)) => msg,
            other => panic!("expected validation error, got: {other:?}"),
        }
    }

    #[test]
    fn parse_sample() {
        let config = parse(SAMPLE).unwrap();
        let dates: Vec<&str> = config.target_dates.iter().map(TicketDate::as_str).collect();
        assert_eq!(dates, vec!["2025-09-25", "2025-09-26"]);
        assert_eq!(config.polling.interval_seconds, 10);
        assert_eq!(config.webhook.event_name, "test_event");
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn defaults_applied() {
        let config = parse(
            r#"
target_dates: ["2025-09-25"]
webhook:
  url: "https://hooks.example.com/x"
"#,
        )
        .unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.webhook_timeout(), Duration::from_secs(30));
        assert_eq!(config.min_notification_interval(), Duration::from_secs(300));
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(24 * 3_600));
        assert_eq!(config.website.availability_class, "sale");
        assert_eq!(config.logging.tracing_directive(), "info");
    }

    #[test]
    fn heartbeat_zero_disables() {
        let config = parse(
            r#"
target_dates: ["2025-09-25"]
webhook:
  url: "https://hooks.example.com/x"
  heartbeat_interval_hours: 0
"#,
        )
        .unwrap();
        assert!(config.heartbeat_interval().is_zero());
    }

    #[test]
    fn empty_target_dates_rejected() {
        let yaml = SAMPLE.replace(
            r#"["2025-09-26", "2025-09-25", "2025-09-26"]"#,
            "[]",
        );
        assert!(validation_message(parse(&yaml)).contains("At least one target date"));
    }

    #[test]
    fn invalid_date_rejected_at_parse() {
        let yaml = SAMPLE.replace(
            r#"["2025-09-26", "2025-09-25", "2025-09-26"]"#,
            r#"["invalid-date"]"#,
        );
        match parse(&yaml) {
            Err(ConfigError::Parse(e)) => assert!(e.to_string().contains("YYYY-MM-DD")),
            other => panic!("expected parse error, got: {other:?}"),
        }
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let yaml = SAMPLE.replace("interval_seconds: 10", "interval_seconds: 0");
        assert!(validation_message(parse(&yaml)).contains("at least 1 second"));
    }

    #[test]
    fn zero_webhook_timeout_rejected() {
        let yaml = SAMPLE.replace("timeout_seconds: 30", "timeout_seconds: 0");
        assert!(validation_message(parse(&yaml)).contains("Webhook timeout"));
    }

    #[test]
    fn negative_heartbeat_rejected_at_parse() {
        let yaml = SAMPLE.replace("timeout_seconds: 30", "timeout_seconds: 30\n  heartbeat_interval_hours: -1");
        assert!(matches!(parse(&yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_log_level_rejected() {
        let yaml = SAMPLE.replace(r#"level: "info""#, r#"level: "LOUD""#);
        assert!(validation_message(parse(&yaml)).contains("Invalid logging level"));
    }

    #[test]
    fn non_http_website_rejected() {
        let yaml = SAMPLE.replace(
            "https://museum-tickets.nintendo.com/en/calendar",
            "file:///etc/passwd",
        );
        assert!(validation_message(parse(&yaml)).contains("http or https"));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LOG_LEVEL", "debug"),
            ("TICKETWATCH_WEBHOOK_URL", "https://hooks.example.com/override"),
            ("TICKETWATCH_POLL_INTERVAL", "42"),
        ]);
        let config =
            WatchConfig::from_yaml_with(SAMPLE, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.logging.level, "DEBUG");
        assert!(config.logging.is_debug());
        assert_eq!(config.logging.tracing_directive(), "debug");
        assert_eq!(config.webhook.url, "https://hooks.example.com/override");
        assert_eq!(config.polling.interval_seconds, 42);
    }

    #[test]
    fn env_override_bad_number_rejected() {
        let result = WatchConfig::from_yaml_with(SAMPLE, |k| {
            (k == "TICKETWATCH_POLL_INTERVAL").then(|| "soon".to_string())
        });
        assert!(validation_message(result).contains("TICKETWATCH_POLL_INTERVAL"));
    }

    #[test]
    fn empty_env_values_ignored() {
        let config = WatchConfig::from_yaml_with(SAMPLE, |_| Some(String::new())).unwrap();
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn warning_maps_to_warn() {
        let logging = LoggingConfig {
            level: "WARNING".into(),
        };
        assert_eq!(logging.tracing_directive(), "warn");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = WatchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target_dates.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            WatchConfig::from_file("/definitely/not/here/config.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
