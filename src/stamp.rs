//! Timestamp tokens embedded in log and archive file names
//!
//! Log files are named `{session}_Logging_{MMddyyyy-HHmmss}.log`; archive
//! containers reuse the tokens of their first and last file.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use regex::Regex;

/// chrono format of a timestamp token
pub const TOKEN_FORMAT: &str = "%m%d%Y-%H%M%S";

fn token_regex() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"[0-9]{8}-[0-9]{6}").ok())
        .as_ref()
}

/// Byte ranges of every token-shaped run not embedded in a longer digit run
fn token_spans(name: &str) -> Vec<(usize, usize)> {
    let Some(re) = token_regex() else {
        return Vec::new();
    };
    let bytes = name.as_bytes();
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(m) = re.find_at(name, from) {
        let digit_before = m.start() > 0 && bytes[m.start() - 1].is_ascii_digit();
        let digit_after = bytes.get(m.end()).is_some_and(u8::is_ascii_digit);
        if !digit_before && !digit_after {
            spans.push((m.start(), m.end()));
            from = m.end();
        } else {
            from = m.start() + 1;
        }
    }
    spans
}

/// Format a timestamp as a file name token
pub fn format_token<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TOKEN_FORMAT).to_string()
}

/// Parse a token back into a date-time, rejecting impossible dates
pub fn parse_token(token: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(token, TOKEN_FORMAT).ok()
}

/// Find the first valid timestamp token in a file name
pub fn find_token(name: &str) -> Option<String> {
    token_spans(name)
        .into_iter()
        .map(|(start, end)| &name[start..end])
        .find(|token| parse_token(token).is_some())
        .map(str::to_string)
}

/// Remove a trailing `_{token}` (and an optional `_{n}` rotation counter) from a file stem
pub fn strip_token(stem: &str) -> &str {
    match token_spans(stem).last() {
        Some(&(start, end)) => {
            let tail = &stem[end..];
            let is_trailing = tail.is_empty()
                || (tail.starts_with('_') && tail[1..].chars().all(|c| c.is_ascii_digit()));
            if is_trailing {
                stem[..start].trim_end_matches(['_', '-'])
            } else {
                stem
            }
        }
        None => stem,
    }
}

/// Append `_{token}` to a file name unless it already carries a valid token
///
/// Names without an extension get `.log`.
pub fn with_token(name: &str, token: &str) -> String {
    if find_token(name).is_some() {
        return name.to_string();
    }
    let path = std::path::Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    format!("{}_{}.{}", stem, token, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn test_format_and_find_token() {
        let at = Local.with_ymd_and_hms(2026, 1, 2, 10, 15, 0).unwrap();
        let token = format_token(&at);
        assert_eq!(token, "01022026-101500");

        let name = format!("Broker_Logging_{}.log", token);
        assert_eq!(find_token(&name), Some(token));
    }

    #[test]
    fn test_find_token_rejects_invalid_dates() {
        // Month 13 is not a date
        assert_eq!(find_token("Broker_Logging_13012026-101500.log"), None);
        assert_eq!(find_token("Broker_Logging.log"), None);
        // Longer digit runs are not tokens
        assert_eq!(find_token("x_901022026-101500.log"), None);
    }

    #[test]
    fn test_strip_token() {
        assert_eq!(strip_token("Broker_Logging_01022026-101500"), "Broker_Logging");
        assert_eq!(strip_token("Broker_Logging_01022026-101500_2"), "Broker_Logging");
        assert_eq!(strip_token("plain"), "plain");
    }

    #[test]
    fn test_adjacent_tokens() {
        let stem = "a_01012026-000000_02012026-000000";
        assert_eq!(token_spans(stem), vec![(2, 17), (18, 33)]);
        assert_eq!(strip_token(stem), "a_01012026-000000");
        assert_eq!(find_token(stem), Some("01012026-000000".to_string()));

        // An invalid first token does not hide a valid second one
        assert_eq!(
            find_token("a_13012026-000000_02012026-000000.log"),
            Some("02012026-000000".to_string())
        );
    }

    #[test]
    fn test_with_token() {
        assert_eq!(with_token("app.txt", "01022026-101500"), "app_01022026-101500.txt");
        assert_eq!(with_token("app", "01022026-101500"), "app_01022026-101500.log");
        assert_eq!(
            with_token("app_01022026-101500.log", "02022026-000000"),
            "app_01022026-101500.log"
        );
    }
}
