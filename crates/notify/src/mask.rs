//! Redaction of secrets embedded in webhook URLs before they reach logs.

use url::Url;

const MASK: &str = "****";

/// Query parameters whose values are always masked.
const SECRET_PARAMS: &[&str] = &["key", "token", "secret", "api_key"];

/// Mask secrets in a URL for logging.
///
/// - the path segment following `/with/key/` (maker-style webhooks)
/// - values of `key`, `token`, `secret` and `api_key` query parameters
///
/// Input that does not parse as a URL is never echoed back.
pub fn mask_sensitive_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return "<unparseable url>".to_string();
    };

    let segments: Option<Vec<String>> = url
        .path_segments()
        .map(|s| s.map(str::to_string).collect());
    if let Some(segments) = segments {
        let mut masked = segments.clone();
        let mut changed = false;
        for i in 2..segments.len() {
            if segments[i - 2] == "with" && segments[i - 1] == "key" && !segments[i].is_empty() {
                masked[i] = MASK.to_string();
                changed = true;
            }
        }
        if changed {
            if let Ok(mut path) = url.path_segments_mut() {
                path.clear().extend(&masked);
            }
        }
    }

    if url.query().is_some() {
        let mut changed = false;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if SECRET_PARAMS.contains(&k.as_ref()) {
                    changed = true;
                    (k.into_owned(), MASK.to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        if changed {
            url.query_pairs_mut().clear().extend_pairs(&pairs);
        }
    }

    url.to_string()
}
