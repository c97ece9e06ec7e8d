//! Built-in `format` predicates. Pure string checks; non-string instances
//! never reach these.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;
use url::Url;

fn date_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap())
}

fn time_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(?:\.\d+)?(?:[zZ]|[+-]\d{2}:\d{2})$").unwrap()
    })
}

fn duration_date_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(?:\.\d+)?S)?)?$")
            .unwrap()
    })
}

fn duration_week_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^P\d+W$").unwrap())
}

fn email_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap())
}

fn uuid_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .unwrap()
    })
}

/// Checks a string against a named format. Unknown format names validate
/// successfully, as the specification requires.
pub(crate) fn check_format(name: &str, value: &str) -> bool {
    match name {
        "date" => is_date(value),
        "date-time" => is_date_time(value),
        "time" => is_time(value),
        "duration" => is_duration(value),
        "email" => email_regex().is_match(value),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        "uri" => Url::parse(value).is_ok(),
        "uuid" => uuid_regex().is_match(value),
        _ => true,
    }
}

fn is_date(value: &str) -> bool {
    let Some(captures) = date_regex().captures(value) else {
        return false;
    };
    let year: u32 = captures[1].parse().unwrap_or(0);
    let month: u32 = captures[2].parse().unwrap_or(0);
    let day: u32 = captures[3].parse().unwrap_or(0);
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        _ => 0,
    }
}

/// The leap second `23:59:60` is accepted by substituting it with
/// `23:59:59` before the range checks. Any other `:60` second is invalid.
fn is_time(value: &str) -> bool {
    let normalized = value.replace("23:59:60", "23:59:59");
    let Some(captures) = time_regex().captures(&normalized) else {
        return false;
    };
    let hour: u32 = captures[1].parse().unwrap_or(99);
    let minute: u32 = captures[2].parse().unwrap_or(99);
    let second: u32 = captures[3].parse().unwrap_or(99);
    hour <= 23 && minute <= 59 && second <= 59 && offset_in_range(&normalized)
}

fn offset_in_range(value: &str) -> bool {
    let Some(sign) = value.rfind(['+', '-']) else {
        return true; // 'Z' form
    };
    let offset = &value[sign + 1..];
    let Some((hours, minutes)) = offset.split_once(':') else {
        return false;
    };
    hours.parse::<u32>().is_ok_and(|h| h <= 23)
        && minutes.parse::<u32>().is_ok_and(|m| m <= 59)
}

fn is_date_time(value: &str) -> bool {
    let Some((date, time)) = value.split_once(['T', 't']) else {
        return false;
    };
    is_date(date) && is_time(time)
}

fn is_duration(value: &str) -> bool {
    if value == "P" || value.ends_with('T') {
        return false;
    }
    if duration_week_regex().is_match(value) {
        return true;
    }
    duration_date_regex().is_match(value) && value.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_checks_the_calendar() {
        assert!(check_format("date", "2024-02-29"));
        assert!(!check_format("date", "2023-02-29"));
        assert!(!check_format("date", "2024-13-01"));
        assert!(!check_format("date", "2024-04-31"));
        assert!(!check_format("date", "not-a-date"));
    }

    #[test]
    fn time_accepts_the_leap_second_only_at_midnight() {
        assert!(check_format("time", "23:59:60Z"));
        assert!(check_format("time", "12:34:56+02:00"));
        assert!(!check_format("time", "12:34:60Z"));
        assert!(!check_format("time", "24:00:00Z"));
        assert!(!check_format("time", "12:34:56"));
    }

    #[test]
    fn date_time_combines_both_parts() {
        assert!(check_format("date-time", "2024-06-01T12:00:00Z"));
        assert!(check_format("date-time", "2024-06-01t23:59:60z"));
        assert!(!check_format("date-time", "2024-06-01 12:00:00Z"));
    }

    #[test]
    fn duration_forms() {
        assert!(check_format("duration", "P1Y2M3DT4H5M6S"));
        assert!(check_format("duration", "PT30M"));
        assert!(check_format("duration", "P6W"));
        assert!(!check_format("duration", "P"));
        assert!(!check_format("duration", "P1YT"));
    }

    #[test]
    fn network_formats() {
        assert!(check_format("ipv4", "192.168.0.1"));
        assert!(!check_format("ipv4", "192.168.0.256"));
        assert!(check_format("ipv6", "::1"));
        assert!(!check_format("ipv6", "not:an:address"));
    }

    #[test]
    fn uri_uuid_email() {
        assert!(check_format("uri", "https://example.org/a?b=c"));
        assert!(!check_format("uri", "not a uri"));
        assert!(check_format("uuid", "f81d4fae-7dec-11d0-a765-00a0c91e6bf6"));
        assert!(!check_format("uuid", "f81d4fae"));
        assert!(check_format("email", "joe@example.org"));
        assert!(!check_format("email", "joe at example"));
    }

    #[test]
    fn unknown_formats_validate() {
        assert!(check_format("hostname-or-whatever", "anything"));
    }
}
