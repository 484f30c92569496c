//! Temporal string semantics
//!
//! Temporal values are strings: a leading `@` is optional, times carry a `T`
//! prefix, and dates may have partial precision (`2023`, `2023-05`). The
//! comparison rules are deliberate: times normalize to `THH:MM:SS.mmm` and
//! compare lexicographically, fully-offset datetimes compare by absolute
//! instant, and everything else compares segment-wise where equality on the
//! common prefix counts as equal.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    DateTime,
    Time,
}

/// A recognized temporal string, with the `@` stripped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temporal<'a> {
    pub kind: TemporalKind,
    pub text: &'a str,
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\d{4}(-\d{2}(-\d{2}(T\d{2}(:\d{2}(:\d{2}(\.\d+)?)?)?(Z|[+-]\d{2}:\d{2})?)?)?)?$",
        )
        .expect("date pattern")
    })
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^T\d{2}(:\d{2}(:\d{2}(\.\d+)?)?)?$").expect("time pattern")
    })
}

/// Classify a string as date, datetime, or time. Returns `None` for
/// anything that is not a temporal value.
pub fn parse_temporal(s: &str) -> Option<Temporal<'_>> {
    let text = s.strip_prefix('@').unwrap_or(s);
    if time_pattern().is_match(text) {
        return Some(Temporal {
            kind: TemporalKind::Time,
            text,
        });
    }
    if date_pattern().is_match(text) {
        let kind = if text.contains('T') {
            TemporalKind::DateTime
        } else {
            TemporalKind::Date
        };
        return Some(Temporal { kind, text });
    }
    None
}

pub fn is_temporal(s: &str) -> bool {
    parse_temporal(s).is_some()
}

/// Pad a time to `THH:MM:SS.mmm` so lexicographic order is temporal order.
fn normalize_time(text: &str) -> String {
    let body = text.strip_prefix('T').unwrap_or(text);
    let mut parts = body.split(':');
    let hours = parts.next().unwrap_or("00");
    let minutes = parts.next().unwrap_or("00");
    let seconds = parts.next().unwrap_or("00");
    let (whole, frac) = match seconds.split_once('.') {
        Some((w, f)) => (w, f),
        None => (seconds, ""),
    };
    format!("T{hours}:{minutes}:{whole}.{frac:0<3}")
}

/// Numeric segments of a date or datetime, most significant first, ignoring
/// any offset: year, month, day, hour, minute, second, millisecond.
fn segments(text: &str) -> Vec<i64> {
    let (date_part, time_part) = match text.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (text, None),
    };

    let mut out: Vec<i64> = date_part
        .split('-')
        .filter_map(|s| s.parse().ok())
        .collect();

    if let Some(time_part) = time_part {
        let clock = time_part
            .split_once(['Z', '+'])
            .map(|(c, _)| c)
            // A '-' after the T part can only start a negative offset.
            .or_else(|| time_part.split_once('-').map(|(c, _)| c))
            .unwrap_or(time_part);
        for (i, piece) in clock.split(':').enumerate() {
            match piece.split_once('.') {
                Some((whole, frac)) => {
                    if let Ok(n) = whole.parse() {
                        out.push(n);
                    }
                    let millis = format!("{frac:0<3}");
                    if let Ok(n) = millis[..3].parse() {
                        out.push(n);
                    }
                }
                None => {
                    if let Ok(n) = piece.parse() {
                        out.push(n);
                    }
                }
            }
            if i >= 2 {
                break;
            }
        }
    }

    out
}

/// Parse a fully-specified datetime with an explicit offset into an instant.
fn to_instant(text: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if !(text.contains('Z') || text.rfind(['+']).is_some() || has_negative_offset(text)) {
        return None;
    }
    // Pad missing seconds so the RFC 3339 parser accepts reduced precision.
    let padded = pad_datetime(text)?;
    DateTime::parse_from_rfc3339(&padded).ok()
}

fn has_negative_offset(text: &str) -> bool {
    match text.split_once('T') {
        Some((_, time)) => time.contains('-'),
        None => false,
    }
}

fn pad_datetime(text: &str) -> Option<String> {
    let (date, rest) = text.split_once('T')?;
    if date.len() != 10 {
        return None;
    }
    let (clock, offset) = if let Some(stripped) = rest.strip_suffix('Z') {
        (stripped, "Z".to_string())
    } else if let Some(pos) = rest.rfind(['+', '-']) {
        (&rest[..pos], rest[pos..].to_string())
    } else {
        return None;
    };
    let mut parts = clock.split(':');
    let hours = parts.next()?;
    let minutes = parts.next().unwrap_or("00");
    let seconds = parts.next().unwrap_or("00");
    Some(format!("{date}T{hours}:{minutes}:{seconds}{offset}"))
}

/// Compare two temporal strings. `None` means the values are not comparable
/// (a time against a date). Differing precision on a shared prefix compares
/// equal.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let ta = parse_temporal(a)?;
    let tb = parse_temporal(b)?;

    match (ta.kind, tb.kind) {
        (TemporalKind::Time, TemporalKind::Time) => {
            Some(normalize_time(ta.text).cmp(&normalize_time(tb.text)))
        }
        (TemporalKind::Time, _) | (_, TemporalKind::Time) => None,
        _ => {
            if let (Some(ia), Some(ib)) = (to_instant(ta.text), to_instant(tb.text)) {
                return Some(ia.cmp(&ib));
            }
            let sa = segments(ta.text);
            let sb = segments(tb.text);
            for (x, y) in sa.iter().zip(sb.iter()) {
                match x.cmp(y) {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            // Equal on the common prefix: treated as equal regardless of
            // the extra precision on one side.
            Some(Ordering::Equal)
        }
    }
}

/// Whole days between two date/datetime strings, used by `-` on temporal
/// operands. Partial dates snap to the first day of the period.
pub fn days_between(a: &str, b: &str) -> Option<i64> {
    let da = to_naive(a)?;
    let db = to_naive(b)?;
    Some((da - db).num_days())
}

fn to_naive(s: &str) -> Option<NaiveDateTime> {
    let t = parse_temporal(s)?;
    if t.kind == TemporalKind::Time {
        return None;
    }
    let segs = segments(t.text);
    let year = *segs.first()? as i32;
    let month = segs.get(1).copied().unwrap_or(1) as u32;
    let day = segs.get(2).copied().unwrap_or(1) as u32;
    let hour = segs.get(3).copied().unwrap_or(0) as u32;
    let minute = segs.get(4).copied().unwrap_or(0) as u32;
    let second = segs.get(5).copied().unwrap_or(0) as u32;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(parse_temporal("2023").unwrap().kind, TemporalKind::Date);
        assert_eq!(parse_temporal("2023-05").unwrap().kind, TemporalKind::Date);
        assert_eq!(
            parse_temporal("@2023-05-01").unwrap().kind,
            TemporalKind::Date
        );
        assert_eq!(
            parse_temporal("2023-05-01T14:30:00Z").unwrap().kind,
            TemporalKind::DateTime
        );
        assert_eq!(parse_temporal("T14:30").unwrap().kind, TemporalKind::Time);
        assert!(parse_temporal("hello").is_none());
        assert!(parse_temporal("2023-5-1").is_none());
        assert!(parse_temporal("12345").is_none());
    }

    #[test]
    fn time_comparison_pads_missing_components() {
        assert_eq!(compare("T14:30", "T14:30:00.000"), Some(Ordering::Equal));
        assert_eq!(compare("T14:30", "T14:31"), Some(Ordering::Less));
        assert_eq!(compare("T14:30:00.5", "T14:30:00.050"), Some(Ordering::Greater));
    }

    #[test]
    fn date_partial_precision_compares_equal_on_prefix() {
        assert_eq!(compare("2023", "2023-05-01"), Some(Ordering::Equal));
        assert_eq!(compare("2023-04", "2023-05-01"), Some(Ordering::Less));
        assert_eq!(compare("2024", "2023-12-31"), Some(Ordering::Greater));
    }

    #[test]
    fn datetime_instants_respect_offsets() {
        // 14:30+02:00 is 12:30Z.
        assert_eq!(
            compare("2023-05-01T14:30:00+02:00", "2023-05-01T13:00:00Z"),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare("2023-05-01T12:00:00Z", "2023-05-01T14:00:00+02:00"),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn date_vs_datetime_uses_segments() {
        assert_eq!(
            compare("2023-05-01", "2023-05-01T14:30:00Z"),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare("2023-05-02", "2023-05-01T14:30:00Z"),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn time_and_date_are_incomparable() {
        assert_eq!(compare("T14:30", "2023-05-01"), None);
    }

    #[test]
    fn day_differences() {
        assert_eq!(days_between("2023-05-10", "2023-05-01"), Some(9));
        assert_eq!(days_between("2023-05-01", "2023-05-10"), Some(-9));
        // Partial precision snaps to the start of the period.
        assert_eq!(days_between("2023-02", "2023-01"), Some(31));
        assert_eq!(days_between("T14:30", "2023-01-01"), None);
    }
}
