//! Config-management tools exposed over MCP.
//!
//! Every tool answers with a JSON object carrying `success` and `error`.
//! Problems with the config file itself (missing, unreadable, invalid input
//! dates) are reported that way; only malformed arguments or unknown tool
//! names surface as protocol errors.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use ticketwatch_core::TicketDate;
use tracing::info;

use crate::error::{McpError, StoreError};
use crate::store::ConfigStore;
use crate::types::ToolInfo;
use crate::validate::{ifttt_key, is_past, key_preview, validate_ifttt_url, webhook_configured};

#[derive(Debug, Deserialize)]
struct DatesArgs {
    dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct KeyArgs {
    key: String,
}

pub struct ConfigTools {
    store: ConfigStore,
    today: Option<NaiveDate>,
}

impl ConfigTools {
    pub fn new(store: ConfigStore) -> Self {
        Self { store, today: None }
    }

    /// Pin "today" for past-date checks instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn definitions(&self) -> Vec<ToolInfo> {
        let no_args = json!({"type": "object", "properties": {}});
        let dates = json!({
            "type": "object",
            "properties": {
                "dates": {
                    "type": "array",
                    "items": {"type": "string", "pattern": "^\\d{4}-\\d{2}-\\d{2}$"},
                    "description": "Dates in YYYY-MM-DD format"
                }
            },
            "required": ["dates"]
        });
        let tool = |name: &str, description: &str, schema: &Value| ToolInfo {
            name: name.into(),
            description: description.into(),
            input_schema: schema.clone(),
        };
        vec![
            tool(
                "get_config_status",
                "Summarize the current configuration: file location, target dates and webhook state",
                &no_args,
            ),
            tool(
                "list_target_dates",
                "List the monitored target dates, split into past and future",
                &no_args,
            ),
            tool("add_target_dates", "Add dates to the monitored list", &dates),
            tool("remove_target_dates", "Remove dates from the monitored list", &dates),
            tool(
                "set_target_dates",
                "Replace the monitored list with exactly these dates",
                &dates,
            ),
            tool("clear_target_dates", "Remove every monitored date", &no_args),
            tool(
                "get_ifttt_webhook_status",
                "Report whether the IFTTT webhook is configured",
                &no_args,
            ),
            tool(
                "set_ifttt_webhook_url",
                "Set the full IFTTT webhook URL",
                &json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "https://maker.ifttt.com/trigger/{event}/with/key/{key}"
                        }
                    },
                    "required": ["url"]
                }),
            ),
            tool(
                "set_ifttt_webhook_key",
                "Set the IFTTT key; the URL is rebuilt from the configured event name",
                &json!({
                    "type": "object",
                    "properties": {
                        "key": {"type": "string", "description": "IFTTT Maker webhook key"}
                    },
                    "required": ["key"]
                }),
            ),
        ]
    }

    pub fn call(&self, name: &str, args: Value) -> Result<Value, McpError> {
        let outcome = match name {
            "get_config_status" => self.config_status(),
            "list_target_dates" => self.list_dates(),
            "add_target_dates" => self.add_dates(parse_args::<DatesArgs>(args)?.dates),
            "remove_target_dates" => self.remove_dates(parse_args::<DatesArgs>(args)?.dates),
            "set_target_dates" => self.set_dates(parse_args::<DatesArgs>(args)?.dates),
            "clear_target_dates" => self.clear_dates(),
            "get_ifttt_webhook_status" => self.webhook_status(),
            "set_ifttt_webhook_url" => self.set_webhook_url(parse_args::<UrlArgs>(args)?.url),
            "set_ifttt_webhook_key" => self.set_webhook_key(parse_args::<KeyArgs>(args)?.key),
            other => return Err(McpError::ToolNotFound(other.to_string())),
        };
        Ok(outcome.unwrap_or_else(|e| failure(&e.to_string())))
    }

    // ── Tool bodies ─────────────────────────────────────────────────

    fn config_status(&self) -> Result<Value, StoreError> {
        let path = self.store.path().display().to_string();
        if !self.store.exists() {
            return Ok(json!({
                "success": false,
                "error": StoreError::NotFound(self.store.path().to_path_buf()).to_string(),
                "config_file_exists": false,
                "config_file_path": path,
            }));
        }
        let dates = self.store.target_dates()?;
        let url = self.store.webhook_url()?;
        let (past, future) = self.split_past(&dates);
        let watcher_error = self.store.watcher_accepts().err();
        Ok(json!({
            "success": true,
            "error": null,
            "config_file_exists": true,
            "config_file_path": path,
            "target_dates": dates,
            "target_dates_count": dates.len(),
            "webhook_url": url,
            "webhook_configured": webhook_configured(&url),
            "ifttt_key_preview": key_preview(&ifttt_key(&url)),
            "past_dates": past,
            "past_dates_count": past.len(),
            "future_dates_count": future.len(),
            "watcher_config_valid": watcher_error.is_none(),
            "watcher_config_error": watcher_error,
        }))
    }

    fn list_dates(&self) -> Result<Value, StoreError> {
        let dates = self.store.target_dates()?;
        let (past, future) = self.split_past(&dates);
        Ok(json!({
            "success": true,
            "error": null,
            "dates": dates,
            "count": dates.len(),
            "past_dates": past,
            "future_dates": future,
            "past_count": past.len(),
            "future_count": future.len(),
        }))
    }

    fn add_dates(&self, dates: Vec<String>) -> Result<Value, StoreError> {
        let final_dates = self.store.add_target_dates(&dates)?;
        info!(added = dates.len(), total = final_dates.len(), "target dates added");
        let mut result = json!({
            "success": true,
            "error": null,
            "added_dates": dates,
            "final_dates": as_strings(&final_dates),
            "added_count": dates.len(),
            "total_count": final_dates.len(),
        });
        self.warn_past(&mut result, &dates);
        Ok(result)
    }

    fn remove_dates(&self, dates: Vec<String>) -> Result<Value, StoreError> {
        let (removed, final_dates) = self.store.remove_target_dates(&dates)?;
        info!(removed = removed.len(), total = final_dates.len(), "target dates removed");
        let missing: Vec<&String> = dates.iter().filter(|d| !removed.contains(d)).collect();
        let mut result = json!({
            "success": true,
            "error": null,
            "removed_dates": removed,
            "final_dates": as_strings(&final_dates),
            "removed_count": removed.len(),
            "total_count": final_dates.len(),
        });
        if !missing.is_empty() {
            let list: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            result["warning"] = json!(format!("Dates not found: {}", list.join(", ")));
        }
        Ok(result)
    }

    fn set_dates(&self, dates: Vec<String>) -> Result<Value, StoreError> {
        let final_dates = self.store.set_target_dates(&dates)?;
        info!(total = final_dates.len(), "target dates replaced");
        let final_dates = as_strings(&final_dates);
        let mut result = json!({
            "success": true,
            "error": null,
            "final_dates": final_dates,
            "total_count": final_dates.len(),
        });
        self.warn_past(&mut result, &final_dates);
        Ok(result)
    }

    fn clear_dates(&self) -> Result<Value, StoreError> {
        let cleared = self.store.clear_target_dates()?;
        info!(cleared, "target dates cleared");
        Ok(json!({
            "success": true,
            "error": null,
            "cleared_count": cleared,
            "final_dates": [],
            "total_count": 0,
        }))
    }

    fn webhook_status(&self) -> Result<Value, StoreError> {
        let url = self.store.webhook_url()?;
        Ok(json!({
            "success": true,
            "error": null,
            "configured": webhook_configured(&url),
            "url": url,
            "key_preview": key_preview(&ifttt_key(&url)),
        }))
    }

    fn set_webhook_url(&self, url: String) -> Result<Value, StoreError> {
        validate_ifttt_url(&url).map_err(StoreError::Invalid)?;
        self.store.set_webhook_url(&url)?;
        info!("webhook URL updated");
        Ok(json!({
            "success": true,
            "error": null,
            "message": "IFTTT webhook URL updated successfully",
            "configured": webhook_configured(&url),
            "key_preview": key_preview(&ifttt_key(&url)),
        }))
    }

    fn set_webhook_key(&self, key: String) -> Result<Value, StoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StoreError::Invalid("IFTTT key cannot be empty".into()));
        }
        let event = self.store.event_name()?;
        let url = format!("https://maker.ifttt.com/trigger/{event}/with/key/{key}");
        self.set_webhook_url(url)
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn split_past<'a>(&self, dates: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
        let today = self.today();
        dates
            .iter()
            .map(String::as_str)
            .partition(|d| d.parse::<TicketDate>().is_ok_and(|d| is_past(&d, today)))
    }

    fn warn_past(&self, result: &mut Value, dates: &[String]) {
        let (past, _) = self.split_past(dates);
        if !past.is_empty() {
            result["warning"] = json!(format!(
                "Some dates are in the past: {}",
                past.join(", ")
            ));
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, McpError> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn as_strings(dates: &[TicketDate]) -> Vec<String> {
    dates.iter().map(|d| d.as_str().to_string()).collect()
}

fn failure(message: &str) -> Value {
    json!({"success": false, "error": message})
}
