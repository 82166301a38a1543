//! HTTP webhook notifier.
//!
//! Delivers notifications as a JSON `POST` to a single configured URL.
//! Each call makes exactly one request; retries are the caller's business.

use std::time::Duration;

use crate::mask::mask_sensitive_url;
use crate::traits::{Notification, Notifier, NotifyError};

/// Posts notifications as JSON to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL are resolved
/// at construction time so keys can stay out of the config file.
#[derive(Debug)]
pub struct WebhookNotifier {
    /// Target URL (env vars already resolved).
    url: String,
    /// Same URL with secrets masked, for logging.
    display_url: String,
    /// Shared HTTP client; carries the per-request timeout.
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier with a per-request timeout.
    ///
    /// Missing env vars, a URL that does not parse, or a non-http(s)
    /// scheme produce a [`NotifyError::Config`] error.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let resolved = resolve_env_vars(url)?;

        let parsed = url::Url::parse(&resolved).map_err(|e| {
            NotifyError::Config(format!(
                "invalid webhook URL {}: {e}",
                mask_sensitive_url(&resolved)
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NotifyError::Config(format!(
                "webhook URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            display_url: mask_sensitive_url(&resolved),
            url: resolved,
            client,
        })
    }

    /// The endpoint with secrets masked.
    pub fn display_url(&self) -> &str {
        &self.display_url
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::debug!(url = %self.display_url, payload = ?notification, "posting webhook");

        let response = self.client.post(&self.url).json(notification).send().await?;
        let status = response.status();
        let body_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if !status.is_success() {
            tracing::warn!(
                url = %self.display_url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Status {
                status,
                body: body_text,
            });
        }

        tracing::debug!(
            url = %self.display_url,
            %status,
            response = %body_text,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
pub fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(
                    "unclosed env var reference in webhook URL".to_string(),
                ));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| NotifyError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
