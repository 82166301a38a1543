//! Input checks for config edits: date lists and IFTTT webhook URLs.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use ticketwatch_core::TicketDate;

/// Placeholder left in the example config until a real key is set.
pub const KEY_PLACEHOLDER: &str = "YOUR_IFTTT_KEY";

/// Parse every date, then deduplicate and sort.
///
/// All failures are reported together as `"<input>: <reason>"` pairs.
pub fn validate_dates<S: AsRef<str>>(dates: &[S]) -> Result<Vec<TicketDate>, String> {
    let mut valid = BTreeSet::new();
    let mut invalid = Vec::new();
    for raw in dates {
        let raw = raw.as_ref();
        match TicketDate::parse(raw) {
            Ok(date) => {
                valid.insert(date);
            }
            Err(e) => invalid.push(format!("{raw}: {e}")),
        }
    }
    if !invalid.is_empty() {
        return Err(format!("Invalid dates found: {}", invalid.join("; ")));
    }
    Ok(valid.into_iter().collect())
}

/// Accepts only `https?://maker.ifttt.com/trigger/<event>/with/key/<key>`.
pub fn validate_ifttt_url(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("URL cannot be empty".into());
    }
    let url = url::Url::parse(raw).map_err(|e| format!("Invalid URL format: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("URL must include scheme (https://) and domain".into());
    }
    let host = url.host_str().unwrap_or_default();
    if host != "maker.ifttt.com" {
        return Err("URL must be an IFTTT webhook URL (maker.ifttt.com)".into());
    }
    if !url.path().starts_with("/trigger/") {
        return Err("URL must be an IFTTT trigger webhook".into());
    }
    if !url.path().contains("/with/key/") || ifttt_key(raw).is_empty() {
        return Err("URL must contain a webhook key (/with/key/YOUR_KEY)".into());
    }
    Ok(())
}

/// Path segment following `key`, or empty when there is none.
pub fn ifttt_key(raw: &str) -> String {
    let Ok(url) = url::Url::parse(raw) else {
        return String::new();
    };
    let Some(mut segments) = url.path_segments() else {
        return String::new();
    };
    segments
        .by_ref()
        .find(|s| *s == "key")
        .and_then(|_| segments.next())
        .unwrap_or_default()
        .to_string()
}

/// First and last four characters of a key; `***` for short keys.
pub fn key_preview(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".into();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// A URL counts as configured once it is set and no longer holds the placeholder.
pub fn webhook_configured(url: &str) -> bool {
    !url.trim().is_empty() && !url.contains(KEY_PLACEHOLDER)
}

pub fn is_past(date: &TicketDate, today: NaiveDate) -> bool {
    NaiveDate::parse_from_str(date.as_str(), ticketwatch_core::date::DATE_FORMAT)
        .is_ok_and(|d| d < today)
}
