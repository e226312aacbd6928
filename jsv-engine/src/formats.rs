//! String formats: the registry value type and the built-in draft-07
//! format table.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::Url;

/// A registered format: a compiled pattern or an arbitrary predicate.
///
/// Formats apply to strings only; other data types pass unchecked.
#[derive(Clone)]
pub enum Format {
    /// Anchored match against a compiled pattern.
    Pattern(Regex),
    /// Caller-supplied predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Format {
    /// Build a predicate format from a function.
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Format::Predicate(Arc::new(f))
    }

    /// Whether `value` conforms to this format.
    #[must_use]
    pub fn validate(&self, value: &str) -> bool {
        match self {
            Format::Pattern(re) => re.is_match(value),
            Format::Predicate(f) => f(value),
        }
    }
}

impl From<Regex> for Format {
    fn from(re: Regex) -> Self {
        Format::Pattern(re)
    }
}

fn pattern(source: &str) -> Format {
    Format::Pattern(Regex::new(source).expect("built-in format pattern compiles"))
}

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<h>\d{2}):(?P<m>\d{2}):(?P<s>\d{2})(?:\.\d+)?(?:[Zz]|[+-]\d{2}:\d{2})$")
        .expect("time pattern compiles")
});

fn is_time(value: &str) -> bool {
    let Some(caps) = TIME.captures(value) else {
        return false;
    };
    let field = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
    match (field("h"), field("m"), field("s")) {
        // 60 seconds admitted for leap seconds, as RFC 3339 does.
        (Some(h), Some(m), Some(s)) => h < 24 && m < 60 && s <= 60,
        _ => false,
    }
}

fn is_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_uri(value: &str) -> bool {
    Url::parse(value).is_ok()
}

fn is_uri_reference(value: &str) -> bool {
    static BASE: Lazy<Url> =
        Lazy::new(|| Url::parse("jsv://uri-reference/").expect("base URL parses"));
    Url::parse(value).is_ok() || BASE.join(value).is_ok()
}

fn is_regex(value: &str) -> bool {
    Regex::new(value).is_ok()
}

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.?$")
        .expect("hostname pattern compiles")
});

fn is_hostname(value: &str) -> bool {
    value.len() <= 254 && HOSTNAME.is_match(value)
}

/// The built-in draft-07 format table.
pub(crate) fn builtin_formats() -> Vec<(&'static str, Format)> {
    vec![
        ("date", Format::predicate(is_date)),
        ("time", Format::predicate(is_time)),
        ("date-time", Format::predicate(is_date_time)),
        // Pragmatic (not fully RFC 5322) pattern, same trade-off most
        // validators make.
        (
            "email",
            pattern(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"),
        ),
        ("hostname", Format::predicate(is_hostname)),
        ("ipv4", Format::predicate(|s| s.parse::<Ipv4Addr>().is_ok())),
        ("ipv6", Format::predicate(|s| s.parse::<Ipv6Addr>().is_ok())),
        ("uri", Format::predicate(is_uri)),
        ("uri-reference", Format::predicate(is_uri_reference)),
        ("regex", Format::predicate(is_regex)),
        ("json-pointer", pattern(r"^(?:/(?:[^~/]|~0|~1)*)*$")),
        (
            "relative-json-pointer",
            pattern(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)$"),
        ),
        (
            "uuid",
            pattern(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str) -> Format {
        builtin_formats()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| f)
            .expect("format exists")
    }

    #[test]
    fn dates_must_exist_on_the_calendar() {
        let date = find("date");
        assert!(date.validate("2020-02-29"));
        assert!(!date.validate("2021-02-29"));
        assert!(!date.validate("2021-13-01"));
    }

    #[test]
    fn times_check_component_ranges() {
        let time = find("time");
        assert!(time.validate("23:59:60Z"));
        assert!(time.validate("08:30:06.283185+02:00"));
        assert!(!time.validate("24:00:00Z"));
        assert!(!time.validate("12:00:00"));
    }

    #[test]
    fn uri_requires_a_scheme_but_reference_does_not() {
        assert!(find("uri").validate("https://example.com/a?b=c"));
        assert!(!find("uri").validate("/relative/path"));
        assert!(find("uri-reference").validate("/relative/path"));
    }

    #[test]
    fn ip_addresses_use_std_parsing() {
        assert!(find("ipv4").validate("192.168.0.1"));
        assert!(!find("ipv4").validate("256.0.0.1"));
        assert!(find("ipv6").validate("::1"));
        assert!(!find("ipv6").validate("12345::"));
    }
}
