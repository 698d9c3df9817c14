//! Scrubbing of error messages before they are stored as measurement data.
//!
//! Connection and parse failures are reported to the server as strings.
//! Address-like and credential-like substrings are replaced with a fixed
//! placeholder so repeated failures produce comparable, diffable messages
//! and no secret ever leaves the process.

use std::sync::OnceLock;

use regex::Regex;

/// Placeholder inserted where sensitive text was removed.
const PLACEHOLDER: &str = "<redacted>";

fn url_pattern() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| {
        Regex::new(r#"[A-Za-z][A-Za-z0-9+.-]*://[^\s"'()]+"#).expect("failed to compile URL regex")
    })
}

fn host_pattern() -> &'static Regex {
    static HOST_REGEX: OnceLock<Regex> = OnceLock::new();
    HOST_REGEX.get_or_init(|| {
        Regex::new(r"\b\d{1,3}(?:\.\d{1,3}){3}(?::\d{1,5})?\b")
            .expect("failed to compile host regex")
    })
}

fn credential_pattern() -> &'static Regex {
    static CREDENTIAL_REGEX: OnceLock<Regex> = OnceLock::new();
    CREDENTIAL_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)\b(password|passwd|token|secret|api[_-]?key|authorization)\s*[=:]\s*[^\s&"']+"#)
            .expect("failed to compile credential regex")
    })
}

/// Scrub addresses and credentials from an error message.
pub fn redact(message: &str) -> String {
    let message = url_pattern().replace_all(message, PLACEHOLDER);
    let message = host_pattern().replace_all(&message, PLACEHOLDER);
    credential_pattern()
        .replace_all(&message, format!("$1={PLACEHOLDER}"))
        .into_owned()
}
