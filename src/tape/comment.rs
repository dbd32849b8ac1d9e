//! Line-level tape syntax: comments and `Source` directives.

use std::sync::LazyLock;

use regex::Regex;

/// `Source <path>` with an optionally quoted path, case-insensitive.
static SOURCE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*Source\s+['"`]?(?P<path>.*?)['"`]?\s*$"#)
        .unwrap_or_else(|e| unreachable!("invalid Source pattern: {e}"))
});

/// A `Source` directive recognised on a raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDirective<'a> {
    /// The whole matched directive.
    pub text: &'a str,
    /// The referenced path with surrounding quotes removed.
    pub path: &'a str,
}

/// Recognise a `Source` directive.
///
/// Runs on the raw line: the directive is not a comment and is matched before
/// comment stripping.
pub fn source_directive(line: &str) -> Option<SourceDirective<'_>> {
    let caps = SOURCE_DIRECTIVE.captures(line)?;
    let text = caps.get(0)?.as_str();
    let path = caps.name("path")?.as_str();
    Some(SourceDirective { text, path })
}

/// Strip a trailing comment and surrounding whitespace.
///
/// Quoted spans (`"`, `'`, `` ` ``) are kept verbatim even if they contain
/// `#`. Scanning stops at the first unquoted `#` or at a quote that is never
/// closed. Returns `None` when nothing but whitespace remains.
pub fn strip_comment(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        match bytes[end] {
            b'#' => break,
            quote @ (b'"' | b'\'' | b'`') => match line[end + 1..].find(quote as char) {
                Some(offset) => end += offset + 2,
                None => break,
            },
            _ => end += 1,
        }
    }

    let kept = line[..end].trim();
    (!kept.is_empty()).then_some(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quoted_hash_preserved() {
        assert_eq!(
            strip_comment(r#"type "a # b" # real comment"#),
            Some(r#"type "a # b""#)
        );
    }

    #[test]
    fn test_strip_full_line_comment() {
        assert_eq!(strip_comment("# a comment"), None);
        assert_eq!(strip_comment("   "), None);
        assert_eq!(strip_comment(""), None);
    }

    #[test]
    fn test_strip_trailing_whitespace() {
        assert_eq!(strip_comment("Sleep 1s   "), Some("Sleep 1s"));
        assert_eq!(strip_comment("  Enter\t# go"), Some("Enter"));
    }

    #[test]
    fn test_strip_mixed_quotes() {
        assert_eq!(
            strip_comment(r#"Type 'it"s' `#x` # done"#),
            Some(r#"Type 'it"s' `#x`"#)
        );
    }

    #[test]
    fn test_strip_unterminated_quote_truncates() {
        assert_eq!(strip_comment(r#"Type "open"#), Some("Type"));
    }

    #[test]
    fn test_strip_non_ascii() {
        assert_eq!(strip_comment("Type \"héllo\" # ünïcode"), Some("Type \"héllo\""));
    }

    #[test]
    fn test_source_directive_forms() {
        let d = source_directive("Source common.tape").unwrap();
        assert_eq!(d.path, "common.tape");

        let d = source_directive("  source \"dir/with space.tape\"  ").unwrap();
        assert_eq!(d.path, "dir/with space.tape");

        let d = source_directive("SOURCE `x.tape`").unwrap();
        assert_eq!(d.path, "x.tape");
    }

    #[test]
    fn test_source_directive_rejects_other_commands() {
        assert!(source_directive("Type Source a.tape").is_none());
        assert!(source_directive("Sourcefile").is_none());
        assert!(source_directive("# Source a.tape").is_none());
    }
}
