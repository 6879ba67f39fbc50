//! Stripping of the leading date-time prefix of a log line.
//!
//! The prefix is a run of digits and hyphens, a whitespace character, a run of digits, colons
//! and periods, and another whitespace character, e.g. `2024-01-01 10:00:00.123 `. It is matched
//! with a direct byte scan rather than a regular expression.

/// Whitespace as understood by the prefix matcher: space, tab, newline, form feed and
/// carriage return.
#[inline]
const fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

#[inline]
const fn is_date(b: u8) -> bool {
    b.is_ascii_digit() || b == b'-'
}

#[inline]
const fn is_time(b: u8) -> bool {
    b.is_ascii_digit() || b == b':' || b == b'.'
}

/// Returns the length in bytes of the timestamp prefix of `line`, if it has one.
#[inline]
pub fn prefix_len(line: &[u8]) -> Option<usize> {
    let date = line.iter().take_while(|b| is_date(**b)).count();
    if date == 0 {
        return None;
    }

    let mut cursor = date;
    if !is_space(*line.get(cursor)?) {
        return None;
    }
    cursor += 1;

    let time = line[cursor..].iter().take_while(|b| is_time(**b)).count();
    if time == 0 {
        return None;
    }

    cursor += time;
    if !is_space(*line.get(cursor)?) {
        return None;
    }

    Some(cursor + 1)
}

/// Strips the leading timestamp prefix of `line`. Lines without one are returned unchanged.
///
/// Only a single prefix is removed:
///
/// ```
/// use linerate_wire::strip_timestamp;
///
/// assert_eq!(strip_timestamp("2024-01-01 10:00:00.123 hello-1"), "hello-1");
/// assert_eq!(strip_timestamp("hello-1"), "hello-1");
/// ```
#[inline]
pub fn strip_timestamp(line: &str) -> &str {
    match prefix_len(line.as_bytes()) {
        // The prefix is all ASCII, so `len` is on a char boundary.
        Some(len) => &line[len..],
        None => line,
    }
}
