//! TEXT value escaping and content-line folding (RFC 5545 3.1, 3.3.11).

/// Content lines longer than this many octets are folded.
const MAX_LINE_OCTETS: usize = 75;

/// Escape a TEXT property value: backslash, semicolon, comma and line breaks.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }

    escaped
}

/// Append `line` to `out` followed by CRLF, folding it into continuation
/// lines (CRLF + space) so no physical line exceeds 75 octets.
pub(crate) fn push_folded(out: &mut String, line: &str) {
    let mut rest = line;
    let mut limit = MAX_LINE_OCTETS;

    while rest.len() > limit {
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }

        out.push_str(&rest[..split]);
        out.push_str("\r\n ");
        rest = &rest[split..];

        // The leading space of a continuation line counts towards the limit
        limit = MAX_LINE_OCTETS - 1;
    }

    out.push_str(rest);
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved_characters() {
        assert_eq!(
            escape_text("Exam 1; sorting, recursion"),
            "Exam 1\\; sorting\\, recursion"
        );
        assert_eq!(escape_text("C:\\temp"), "C:\\\\temp");
    }

    #[test]
    fn test_escape_line_breaks() {
        assert_eq!(escape_text("line one\nline two"), "line one\\nline two");
        assert_eq!(escape_text("crlf\r\nbreak"), "crlf\\nbreak");
        assert_eq!(escape_text("lone\rcr"), "lone\\ncr");
    }

    #[test]
    fn test_escape_leaves_plain_text_alone() {
        assert_eq!(escape_text("CS 320 Midterm: Room A201"), "CS 320 Midterm: Room A201");
    }

    #[test]
    fn test_short_line_is_not_folded() {
        let mut out = String::new();
        push_folded(&mut out, "SUMMARY:short");
        assert_eq!(out, "SUMMARY:short\r\n");
    }

    #[test]
    fn test_long_line_is_folded_at_75_octets() {
        let line = format!("DESCRIPTION:{}", "x".repeat(200));
        let mut out = String::new();
        push_folded(&mut out, &line);

        let physical: Vec<&str> = out.trim_end_matches("\r\n").split("\r\n").collect();
        assert!(physical.len() > 1);
        assert!(physical.iter().all(|l| l.len() <= 75));
        assert!(physical[1..].iter().all(|l| l.starts_with(' ')));

        let unfolded = out.trim_end_matches("\r\n").replace("\r\n ", "");
        assert_eq!(unfolded, line);
    }

    #[test]
    fn test_folding_never_splits_multibyte_characters() {
        let line = format!("SUMMARY:{}", "é".repeat(60));
        let mut out = String::new();
        push_folded(&mut out, &line);

        for physical in out.trim_end_matches("\r\n").split("\r\n") {
            assert!(physical.len() <= 75);
        }
        assert_eq!(out.trim_end_matches("\r\n").replace("\r\n ", ""), line);
    }
}
