//! Read-modify-write access to the watcher's `config.yaml`.
//!
//! Edits touch only `target_dates` and `webhook.url`; every other key in the
//! document is carried through unchanged.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use ticketwatch_core::TicketDate;
use ticketwatch_watcher::WatchConfig;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::validate::validate_dates;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Event name used when the config does not set `webhook.event_name`.
pub const DEFAULT_EVENT_NAME: &str = "ticket_available";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Where the previous file is parked while a new one is written.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Load the document as a YAML mapping.
    pub fn load(&self) -> Result<Mapping> {
        if !self.exists() {
            return Err(StoreError::NotFound(self.path.clone()));
        }
        let text = std::fs::read_to_string(&self.path)?;
        match serde_yaml::from_str::<Value>(&text)? {
            Value::Mapping(map) => Ok(map),
            _ => Err(StoreError::Invalid("Config file is empty or invalid".into())),
        }
    }

    /// Whether the watcher itself would accept the file as it stands.
    /// `${VAR}` references are checked unexpanded.
    pub fn watcher_accepts(&self) -> std::result::Result<(), String> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        WatchConfig::from_yaml_with(&text, |_| None)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    // ── Target dates ────────────────────────────────────────────────

    /// Current dates as written. A missing key reads as an empty list.
    pub fn target_dates(&self) -> Result<Vec<String>> {
        dates_of(&self.load()?)
    }

    /// Replace the list. Input is validated, deduplicated and sorted first.
    pub fn set_target_dates<S: AsRef<str>>(&self, dates: &[S]) -> Result<Vec<TicketDate>> {
        let valid = validate_dates(dates).map_err(StoreError::Invalid)?;
        let mut doc = self.load()?;
        doc.insert(
            Value::from("target_dates"),
            Value::Sequence(valid.iter().map(|d| Value::from(d.as_str())).collect()),
        );
        self.save(&doc)?;
        Ok(valid)
    }

    /// Merge `dates` into the current list and save.
    pub fn add_target_dates<S: AsRef<str>>(&self, dates: &[S]) -> Result<Vec<TicketDate>> {
        let mut all = self.target_dates()?;
        all.extend(dates.iter().map(|d| d.as_ref().to_string()));
        self.set_target_dates(&all)
    }

    /// Drop every listed date by exact string match. Returns what was removed
    /// and the remaining list.
    pub fn remove_target_dates<S: AsRef<str>>(
        &self,
        dates: &[S],
    ) -> Result<(Vec<String>, Vec<TicketDate>)> {
        let current = self.target_dates()?;
        let (removed, kept): (Vec<String>, Vec<String>) = current
            .into_iter()
            .partition(|d| dates.iter().any(|r| r.as_ref() == d));
        let final_dates = self.set_target_dates(&kept)?;
        Ok((removed, final_dates))
    }

    /// Empty the list. Returns how many dates were dropped.
    pub fn clear_target_dates(&self) -> Result<usize> {
        let count = self.target_dates()?.len();
        self.set_target_dates::<&str>(&[])?;
        Ok(count)
    }

    // ── Webhook ─────────────────────────────────────────────────────

    pub fn webhook_url(&self) -> Result<String> {
        Ok(webhook_field(&self.load()?, "url").unwrap_or_default())
    }

    pub fn event_name(&self) -> Result<String> {
        Ok(webhook_field(&self.load()?, "event_name")
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()))
    }

    /// Store `url` under `webhook.url`, creating the section when absent.
    pub fn set_webhook_url(&self, url: &str) -> Result<()> {
        let mut doc = self.load()?;
        let key = Value::from("webhook");
        if !matches!(doc.get(&key), Some(Value::Mapping(_))) {
            doc.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        if let Some(Value::Mapping(webhook)) = doc.get_mut(&key) {
            webhook.insert(Value::from("url"), Value::from(url));
        }
        self.save(&doc)
    }

    // ── Writing ─────────────────────────────────────────────────────

    /// Park the current file as a backup, write the new document, then drop
    /// the backup. Any failure puts the backup back in place.
    fn save(&self, doc: &Mapping) -> Result<()> {
        let text = serde_yaml::to_string(doc)?;
        let backup = self.backup_path();
        let had_file = self.exists();
        if had_file {
            std::fs::rename(&self.path, &backup)?;
        }

        if let Err(e) = std::fs::write(&self.path, text) {
            if had_file {
                if let Err(restore) = std::fs::rename(&backup, &self.path) {
                    warn!(error = %restore, path = %backup.display(), "failed to restore config backup");
                }
            }
            return Err(e.into());
        }

        if had_file {
            if let Err(e) = std::fs::remove_file(&backup) {
                warn!(error = %e, path = %backup.display(), "failed to remove config backup");
            }
        }
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

fn dates_of(doc: &Mapping) -> Result<Vec<String>> {
    match doc.get("target_dates") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => Ok(items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
            })
            .collect()),
        Some(_) => Err(StoreError::Invalid("target_dates must be a list".into())),
    }
}

fn webhook_field(doc: &Mapping, field: &str) -> Option<String> {
    doc.get("webhook")?
        .get(field)?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
target_dates:
  - "2025-09-26"
  - "2025-09-25"
polling:
  interval_seconds: 15
webhook:
  url: "https://maker.ifttt.com/trigger/ticket_available/with/key/YOUR_IFTTT_KEY"
  event_name: "museum_tickets"
"#;

    fn store_with(content: &str) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, content).unwrap();
        (dir, ConfigStore::new(path))
    }

    #[test]
    fn reads_dates_as_written() {
        let (_dir, store) = store_with(SAMPLE);
        assert_eq!(store.target_dates().unwrap(), vec!["2025-09-26", "2025-09-25"]);
    }

    #[test]
    fn missing_dates_key_is_empty() {
        let (_dir, store) = store_with("webhook:\n  url: x\n");
        assert!(store.target_dates().unwrap().is_empty());
    }

    #[test]
    fn scalar_dates_key_is_rejected() {
        let (_dir, store) = store_with("target_dates: 2025-09-25\n");
        assert!(matches!(store.target_dates(), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.yaml"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(err.to_string().starts_with("Config file not found"));
    }

    #[test]
    fn empty_file_is_invalid() {
        let (_dir, store) = store_with("");
        assert!(matches!(store.load(), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn set_dates_sorts_and_keeps_other_sections() {
        let (_dir, store) = store_with(SAMPLE);
        store
            .set_target_dates(&["2025-10-02", "2025-10-01", "2025-10-02"])
            .unwrap();

        assert_eq!(store.target_dates().unwrap(), vec!["2025-10-01", "2025-10-02"]);
        let doc = store.load().unwrap();
        assert_eq!(doc["polling"]["interval_seconds"].as_u64(), Some(15));
        assert_eq!(store.event_name().unwrap(), "museum_tickets");
    }

    #[test]
    fn successful_save_leaves_no_backup() {
        let (_dir, store) = store_with(SAMPLE);
        store.add_target_dates(&["2025-10-01"]).unwrap();
        assert!(store.exists());
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn invalid_dates_leave_file_untouched() {
        let (_dir, store) = store_with(SAMPLE);
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store.add_target_dates(&["2025-13-01"]).unwrap_err();
        assert!(err.to_string().contains("2025-13-01"));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn remove_partitions_by_exact_match() {
        let (_dir, store) = store_with(SAMPLE);
        let (removed, remaining) = store
            .remove_target_dates(&["2025-09-25", "2025-12-31"])
            .unwrap();
        assert_eq!(removed, vec!["2025-09-25"]);
        let remaining: Vec<&str> = remaining.iter().map(TicketDate::as_str).collect();
        assert_eq!(remaining, vec!["2025-09-26"]);
    }

    #[test]
    fn clear_reports_count() {
        let (_dir, store) = store_with(SAMPLE);
        assert_eq!(store.clear_target_dates().unwrap(), 2);
        assert!(store.target_dates().unwrap().is_empty());
    }

    #[test]
    fn webhook_url_creates_section_when_absent() {
        let (_dir, store) = store_with("target_dates: []\n");
        assert_eq!(store.webhook_url().unwrap(), "");
        assert_eq!(store.event_name().unwrap(), DEFAULT_EVENT_NAME);

        store
            .set_webhook_url("https://maker.ifttt.com/trigger/a/with/key/b")
            .unwrap();
        assert_eq!(
            store.webhook_url().unwrap(),
            "https://maker.ifttt.com/trigger/a/with/key/b"
        );
    }

    #[test]
    fn watcher_acceptance_follows_content() {
        let (_dir, store) = store_with(SAMPLE);
        assert!(store.watcher_accepts().is_ok());

        store.clear_target_dates().unwrap();
        let err = store.watcher_accepts().unwrap_err();
        assert!(err.contains("target date"));
    }
}
