//! Calendar page scraper.
//!
//! Fetches the ticket calendar and reads each target day's cell
//! (`<td data-date="YYYY-MM-DD">`). A day counts as available when any
//! element inside its cell carries the configured availability class.
//! Assumes the calendar markup is present in the served HTML.

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use ticketwatch_core::{AvailabilitySnapshot, TicketDate};
use tracing::debug;

use crate::source::{AvailabilitySource, SourceError};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Polls an HTML calendar page over HTTP.
#[derive(Debug)]
pub struct CalendarPageSource {
    url: String,
    markup: CalendarMarkup,
    client: reqwest::Client,
}

impl CalendarPageSource {
    pub fn new(
        url: impl Into<String>,
        availability_class: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            url: url.into(),
            markup: CalendarMarkup::new(availability_class)?,
            client,
        })
    }
}

#[async_trait::async_trait]
impl AvailabilitySource for CalendarPageSource {
    async fn check_availability(
        &self,
        targets: &[TicketDate],
    ) -> Result<AvailabilitySnapshot, SourceError> {
        debug!(url = %self.url, "fetching calendar page");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }
        let html = response.text().await?;
        Ok(self.markup.extract(&html, targets))
    }

    fn name(&self) -> &str {
        "calendar-page"
    }
}

/// Compiled patterns for reading day cells out of calendar HTML.
///
/// A cell runs from its `<td ...>` start tag to the first `</td>`, `<td`,
/// `</tr` or `</table`, since HTML lets the end tag be omitted.
#[derive(Debug, Clone)]
pub struct CalendarMarkup {
    cell_start: Regex,
    date_attr: Regex,
    cell_end: Regex,
    class_attr: Regex,
    availability_class: String,
}

impl CalendarMarkup {
    pub fn new(availability_class: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            cell_start: compile(r"(?is)<td\b([^>]*)>")?,
            date_attr: compile(r#"(?i)(?:^|\s)data-date\s*=\s*["']([^"']*)["']"#)?,
            cell_end: compile(r"(?i)</td\s*>|<td\b|</tr\b|</table\b")?,
            class_attr: compile(r#"(?i)(?:^|\s)class\s*=\s*["']([^"']*)["']"#)?,
            availability_class: availability_class.into(),
        })
    }

    /// Inner HTML of every dated cell, keyed by its `data-date` value.
    /// The first cell wins when a date repeats.
    pub fn cells<'h>(&self, html: &'h str) -> BTreeMap<&'h str, &'h str> {
        let mut cells = BTreeMap::new();
        for caps in self.cell_start.captures_iter(html) {
            let (Some(tag), Some(attrs)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(date) = self.date_attr.captures(attrs.as_str()).and_then(|c| c.get(1)) else {
                continue;
            };
            let rest = &html[tag.end()..];
            let end = self.cell_end.find(rest).map_or(rest.len(), |m| m.start());
            cells.entry(date.as_str()).or_insert(&rest[..end]);
        }
        cells
    }

    /// Find which `targets` are marked available in calendar `html`.
    ///
    /// Dates without a cell are simply not available.
    pub fn extract(&self, html: &str, targets: &[TicketDate]) -> AvailabilitySnapshot {
        let cells = self.cells(html);
        debug!(cells = cells.len(), "calendar cells found on page");

        let mut available = AvailabilitySnapshot::new();
        for date in targets {
            let Some(inner) = cells.get(date.as_str()) else {
                debug!(%date, "date cell not found");
                continue;
            };

            if self.has_availability_class(inner) {
                tracing::info!(%date, "availability found");
                available.insert(date.clone());
            } else {
                debug!(
                    %date,
                    class = %self.availability_class,
                    "cell found without availability class"
                );
            }
        }
        available
    }

    fn has_availability_class(&self, fragment: &str) -> bool {
        self.class_attr.captures_iter(fragment).any(|c| {
            c.get(1).is_some_and(|m| {
                m.as_str()
                    .split_whitespace()
                    .any(|cls| cls == self.availability_class)
            })
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, SourceError> {
    Regex::new(pattern).map_err(|e| SourceError::Other(format!("invalid pattern {pattern}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<table class="calendar">
  <tr>
    <td data-date="2025-09-24"><div><span></span><div><div><div><p class="soldout">24</p></div></div></div></div></td>
    <td data-date="2025-09-25"><div><span></span><div><div><div><p class="sale">25</p></div></div></div></div></td>
    <td class="weekend" data-date="2025-09-26">
      <div><span></span><div><div><div><p class="day sale highlight">26</p></div></div></div></div>
    </td>
    <td data-date="2025-09-27"><div><p class="wholesale">27</p></div></td>
  </tr>
</table>"#;

    fn targets(ds: &[&str]) -> Vec<TicketDate> {
        ds.iter().map(|d| d.parse().unwrap()).collect()
    }

    fn names(snapshot: &AvailabilitySnapshot) -> Vec<&str> {
        snapshot.iter().map(TicketDate::as_str).collect()
    }

    fn extract(html: &str, ds: &[&str]) -> AvailabilitySnapshot {
        CalendarMarkup::new("sale").unwrap().extract(html, &targets(ds))
    }

    #[test]
    fn finds_sale_cells() {
        let found = extract(PAGE, &["2025-09-24", "2025-09-25", "2025-09-26"]);
        assert_eq!(names(&found), vec!["2025-09-25", "2025-09-26"]);
    }

    #[test]
    fn class_match_is_whole_token() {
        assert!(extract(PAGE, &["2025-09-27"]).is_empty());
    }

    #[test]
    fn missing_cell_is_not_available() {
        assert!(extract(PAGE, &["2025-12-01"]).is_empty());
    }

    #[test]
    fn only_targets_are_reported() {
        let found = extract(PAGE, &["2025-09-26"]);
        assert_eq!(names(&found), vec!["2025-09-26"]);
    }

    #[test]
    fn data_class_attribute_is_not_a_class() {
        let html = r#"<td data-date="2025-09-25"><div data-class="sale"><p class="soldout">25</p></div></td>"#;
        assert!(extract(html, &["2025-09-25"]).is_empty());
    }

    #[test]
    fn cell_without_end_tag_stops_at_next_cell() {
        let html = r#"<tr><td data-date="2025-09-24"><p class="soldout">24<td data-date="2025-09-25"><p class="sale">25</td></tr>"#;
        assert!(extract(html, &["2025-09-24"]).is_empty());
        assert_eq!(names(&extract(html, &["2025-09-25"])), vec!["2025-09-25"]);
    }

    #[test]
    fn last_cell_without_end_tag_stops_at_row_end() {
        let html = r#"<table><tr><td data-date="2025-09-24"><p class="soldout">24</tr>
<tr><td data-date="2025-09-25"><p class="sale">25</td></tr></table>"#;
        assert!(extract(html, &["2025-09-24"]).is_empty());
    }

    #[test]
    fn cells_are_keyed_by_date() {
        let markup = CalendarMarkup::new("sale").unwrap();
        let cells = markup.cells(PAGE);
        assert_eq!(cells.len(), 4);
        assert!(cells["2025-09-25"].contains(r#"class="sale""#));
        assert!(!cells["2025-09-24"].contains("2025-09-25"));
    }

    #[tokio::test]
    async fn fetches_page_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/en/calendar")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .create_async()
            .await;

        let source = CalendarPageSource::new(
            format!("{}/en/calendar", server.url()),
            "sale",
            Duration::from_secs(5),
        )
        .unwrap();
        let found = source
            .check_availability(&targets(&["2025-09-25"]))
            .await
            .unwrap();
        assert_eq!(names(&found), vec!["2025-09-25"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_source_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/en/calendar")
            .with_status(503)
            .create_async()
            .await;

        let source = CalendarPageSource::new(
            format!("{}/en/calendar", server.url()),
            "sale",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(
            source.check_availability(&targets(&["2025-09-25"])).await,
            Err(SourceError::Status(s)) if s.as_u16() == 503
        ));
    }
}
