//! Grafana-style durations held as signed seconds
//!
//! Rule and policy documents accept either integer seconds or duration
//! strings such as `"90s"`, `"5m"`, `"1h30m"`, `"1d"` or `"-5m"`. Values are
//! kept signed so that the validator, not the parser, reports negative
//! durations. Serialization always writes the string form.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

/// Parse a duration string into seconds.
///
/// Returns `None` for empty input, unknown units, or overflow.
pub fn parse(input: &str) -> Option<i64> {
    let s = input.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if body.is_empty() {
        return None;
    }

    // Bare digits are seconds
    if body.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = body.parse().ok()?;
        return Some(if negative { -secs } else { secs });
    }

    let mut total: i64 = 0;
    let mut number = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        if number.is_empty() {
            return None;
        }
        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            'w' => 604_800,
            _ => return None,
        };
        let value: i64 = number.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        number.clear();
    }
    if !number.is_empty() {
        return None;
    }

    Some(if negative { -total } else { total })
}

/// Format seconds as the shortest duration string, e.g. `5400` → `"1h30m"`.
pub fn format(seconds: i64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if seconds < 0 {
        out.push('-');
    }
    let mut rest = seconds.unsigned_abs();
    for (unit, suffix) in [(86_400u64, 'd'), (3_600, 'h'), (60, 'm'), (1, 's')] {
        let count = rest / unit;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push(suffix);
            rest -= count * unit;
        }
    }
    out
}

pub fn serialize<S>(seconds: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(*seconds))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("integer seconds or a duration string such as \"5m\"")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::custom(format!("duration {v} is out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse(v).ok_or_else(|| E::custom(format!("invalid duration {v:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("90", 90)]
    #[case("90s", 90)]
    #[case("5m", 300)]
    #[case("1h30m", 5_400)]
    #[case("1d", 86_400)]
    #[case("2w", 1_209_600)]
    #[case("-5m", -300)]
    #[case(" 10m ", 600)]
    fn test_parse_valid(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse(input), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("m")]
    #[case("5x")]
    #[case("5m3")]
    #[case("1.5m")]
    fn test_parse_invalid(#[case] input: &str) {
        assert_eq!(parse(input), None, "{input:?} should not parse");
    }

    #[test]
    fn test_format_compacts_units() {
        assert_eq!(format(0), "0s");
        assert_eq!(format(45), "45s");
        assert_eq!(format(300), "5m");
        assert_eq!(format(5_400), "1h30m");
        assert_eq!(format(90_061), "1d1h1m1s");
        assert_eq!(format(-300), "-5m");
    }

    #[test]
    fn test_format_parse_agree() {
        for secs in [1, 59, 60, 61, 3_599, 3_600, 86_399, 86_400, -42] {
            assert_eq!(parse(&format(secs)), Some(secs));
        }
    }

    #[test]
    fn test_parse_overflow_is_rejected() {
        assert_eq!(parse("99999999999999999999w"), None);
    }
}
