use crate::value::Value;
use regex::Regex;
use std::sync::OnceLock;

/// Flatten an array of strings and arrays of strings
///
/// The outermost array counts as depth 1. Returns `None` for non-arrays, non-string elements and
/// arrays nested deeper than `max_depth`.
pub(crate) fn flatten_strings(value: &Value, max_depth: usize) -> Option<Vec<String>> {
    fn flatten(array: &[Value], depth: usize, max_depth: usize, out: &mut Vec<String>) -> bool {
        if depth > max_depth {
            return false;
        }

        array.iter().all(|element| match element {
            Value::String(s) => {
                out.push(s.clone());
                true
            }
            Value::Array(nested) => flatten(nested, depth + 1, max_depth, out),
            _ => false,
        })
    }

    let array = value.as_array()?;
    let mut out = Vec::new();
    flatten(array, 1, max_depth, &mut out).then_some(out)
}

/// Flatten an array of values and arrays of values
///
/// Like [flatten_strings] but any non-array element is accepted.
pub(crate) fn flatten_values(value: &Value, max_depth: usize) -> Option<Vec<Value>> {
    fn flatten(array: &[Value], depth: usize, max_depth: usize, out: &mut Vec<Value>) -> bool {
        if depth > max_depth {
            return false;
        }

        array.iter().all(|element| match element {
            Value::Array(nested) => flatten(nested, depth + 1, max_depth, out),
            other => {
                out.push(other.clone());
                true
            }
        })
    }

    let array = value.as_array()?;
    let mut out = Vec::new();
    flatten(array, 1, max_depth, &mut out).then_some(out)
}

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 31_557_600;

fn unit_seconds(unit: &str) -> Option<u64> {
    let seconds = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "wk" | "wks" | "week" | "weeks" => WEEK,
        "mo" | "mos" | "month" | "months" => MONTH,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return None,
    };
    Some(seconds)
}

/// Parse a human readable duration (`"1h 30m"`, `"1 week"`, `"90"`) into seconds
pub fn parse_duration(input: &str) -> Option<u64> {
    static PART: OnceLock<Regex> = OnceLock::new();
    let part = PART.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*([a-z]*)").expect("duration pattern is valid")
    });

    let input = input.trim().to_lowercase();
    let mut total = 0f64;
    let mut matched = false;
    let mut last_end = 0;

    for captures in part.captures_iter(&input) {
        let whole = captures.get(0)?;
        if !is_separator(&input[last_end..whole.start()]) {
            return None;
        }
        last_end = whole.end();

        let amount: f64 = captures[1].parse().ok()?;
        let unit = unit_seconds(&captures[2])?;
        total += amount * unit as f64;
        matched = true;
    }

    if !matched || !is_separator(&input[last_end..]) {
        return None;
    }

    Some(total.round() as u64)
}

fn is_separator(text: &str) -> bool {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .all(|word| word.is_empty() || word == "and")
}

/// Decode percent-encoded dots and slashes (`%2E`, `%2F`), leaving everything else untouched
pub(crate) fn decode_dots_and_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(index) = rest.find('%') {
        out.push_str(&rest[..index]);
        let encoded = rest.get(index..index + 3).map(str::to_ascii_lowercase);
        match encoded.as_deref() {
            Some("%2e") => {
                out.push('.');
                rest = &rest[index + 3..];
            }
            Some("%2f") => {
                out.push('/');
                rest = &rest[index + 3..];
            }
            _ => {
                out.push('%');
                rest = &rest[index + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    #[test]
    fn flatten_nested_strings() {
        assert_eq!(
            flatten_strings(&config!("[a, [b, c], d]"), 10),
            Some(vec!["a".into(), "b".into(), "c".into(), "d".into()])
        );
        assert_eq!(flatten_strings(&config!("[a, [b, [c]]]"), 2), None);
        assert_eq!(flatten_strings(&config!("[a, 1]"), 10), None);
        assert_eq!(flatten_strings(&config!("a"), 10), None);

        let mut nested = config!("[a]");
        for _ in 0..9 {
            nested = Value::Array(vec![nested]);
        }
        assert_eq!(flatten_strings(&nested, 10), Some(vec!["a".into()]));
        assert_eq!(flatten_strings(&Value::Array(vec![nested]), 10), None);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1m 1s"), Some(61));
        assert_eq!(parse_duration("1 week"), Some(WEEK));
        assert_eq!(parse_duration("8 days"), Some(8 * DAY));
        assert_eq!(parse_duration("1h and 30 minutes"), Some(HOUR + 30 * MINUTE));
        assert_eq!(parse_duration("3600"), Some(3600));
        assert_eq!(parse_duration("3 months"), Some(3 * MONTH));
        assert_eq!(parse_duration("test"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("1 fortnight"), None);
    }

    #[test]
    fn decoding() {
        assert_eq!(decode_dots_and_slashes("a%2Fb"), "a/b");
        assert_eq!(decode_dots_and_slashes("%2e%2E"), "..");
        assert_eq!(decode_dots_and_slashes("100%"), "100%");
        assert_eq!(decode_dots_and_slashes("%41"), "%41");
    }
}
