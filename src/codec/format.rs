//! Rendering helpers for the wire format.
//!
//! Names are normalized to hyphen-case, values and flags get their wire
//! spelling, and object sets are compressed into ascending ranges.

use std::collections::BTreeSet;

use crate::protocol::Value;

/// Normalize a key, flag name, type or subtype to its wire spelling.
///
/// Lowercases, turns `_` into `-` and drops everything outside `[a-z-]`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c == '_' { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || *c == '-')
        .collect()
}

/// Render a value: `on`/`off`, a decimal, or a comma-joined list.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "on".to_string(),
        Value::Bool(false) => "off".to_string(),
        Value::Int(n) => n.to_string(),
        Value::List(items) => items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Render a flag with its polarity sigil.
pub fn format_flag(name: &str, polarity: bool) -> String {
    let sigil = if polarity { '&' } else { '!' };
    format!("{sigil}{}", normalize_name(name))
}

/// Compress an object set into `a-b,c,...` runs.
///
/// Returns an empty string for an empty set. The ` #` introducer is added by
/// the message serializer.
pub fn format_ranges(objects: &BTreeSet<u32>) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut iter = objects.iter().copied();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    for n in iter {
        if n == end + 1 {
            end = n;
        } else {
            runs.push(format_run(start, end));
            start = n;
            end = n;
        }
    }
    runs.push(format_run(start, end));
    runs.join(",")
}

fn format_run(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Join items in prose: `a`, `a and b`, `a, b, and c`.
///
/// `conjunction` is the bare word, e.g. `"and"` or `"or"`. Empty input
/// renders as `nothing`.
pub fn join_natural<S: AsRef<str>>(items: &[S], conjunction: &str) -> String {
    match items {
        [] => "nothing".to_string(),
        [only] => only.as_ref().to_string(),
        [a, b] => format!("{} {conjunction} {}", a.as_ref(), b.as_ref()),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(AsRef::as_ref).collect();
            format!("{}, {conjunction} {}", head.join(", "), last.as_ref())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("keep_alive"), "keep-alive");
        assert_eq!(normalize_name("Fade-In"), "fade-in");
        assert_eq!(normalize_name("r2d2"), "rd");
        assert_eq!(normalize_name("&blink"), "blink");
        assert_eq!(normalize_name("123"), "");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Bool(true)), "on");
        assert_eq!(format_value(&Value::Bool(false)), "off");
        assert_eq!(format_value(&Value::Int(255)), "255");
        assert_eq!(format_value(&Value::List(vec![1, 20, 300])), "1,20,300");
    }

    #[test]
    fn test_format_flag() {
        assert_eq!(format_flag("blink", true), "&blink");
        assert_eq!(format_flag("keep_alive", false), "!keep-alive");
    }

    #[test]
    fn test_format_ranges() {
        let objects: BTreeSet<u32> = [9, 1, 3, 2, 5, 8, 7].into_iter().collect();
        assert_eq!(format_ranges(&objects), "1-3,5,7-9");

        assert_eq!(format_ranges(&BTreeSet::new()), "");
        assert_eq!(format_ranges(&[4].into_iter().collect()), "4");
        assert_eq!(format_ranges(&[4, 6].into_iter().collect()), "4,6");
    }

    #[test]
    fn test_join_natural() {
        let empty: [&str; 0] = [];
        assert_eq!(join_natural(&empty, "and"), "nothing");
        assert_eq!(join_natural(&["a"], "and"), "a");
        assert_eq!(join_natural(&["a", "b"], "or"), "a or b");
        assert_eq!(join_natural(&["a", "b", "c"], "and"), "a, b, and c");
    }
}
