use std::borrow::Cow;

pub const DEFAULT_LINE_DELIMITER: &str = "\n";
pub const DEFAULT_FIELD_DELIMITER: &str = ",";

/// Split `buffer` into lines on `delim`.
///
/// Only a trailing empty line (a buffer ending in the delimiter) is dropped.
/// Blank lines elsewhere are kept, and `\r` stays attached to line content.
pub fn split_lines<'a>(buffer: &'a str, delim: &str) -> Vec<&'a str> {
    if buffer.is_empty() {
        return Vec::new();
    }
    let delim = if delim.is_empty() {
        DEFAULT_LINE_DELIMITER
    } else {
        delim
    };
    let mut lines: Vec<&str> = buffer.split(delim).collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// Remove every double quote from `line`.
pub fn strip_quotes(line: &str) -> Cow<'_, str> {
    if line.contains('"') {
        Cow::Owned(line.replace('"', ""))
    } else {
        Cow::Borrowed(line)
    }
}

/// Split one line into fields on `delim`, after stripping all quotes.
///
/// Quoted fields are not treated specially: `"Smith, J."` becomes the two
/// fields `Smith` and ` J.`.
pub fn split_fields(line: &str, delim: &str) -> Vec<String> {
    let delim = if delim.is_empty() {
        DEFAULT_FIELD_DELIMITER
    } else {
        delim
    };
    strip_quotes(line)
        .split(delim)
        .map(str::to_string)
        .collect()
}
