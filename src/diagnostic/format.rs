//! Terminal colouring for progress lines and diagnostics.

use std::io::IsTerminal;

// ============================================================================
// Coloring
// ============================================================================

#[cfg(feature = "colored-diagnostics")]
fn colorize_bold(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.bold().to_string()
}

#[cfg(feature = "colored-diagnostics")]
fn colorize_accent(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.cyan().to_string()
}

#[cfg(feature = "colored-diagnostics")]
fn colorize_warning(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.yellow().to_string()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_bold(text: &str) -> String {
    text.to_owned()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_accent(text: &str) -> String {
    text.to_owned()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_warning(text: &str) -> String {
    text.to_owned()
}

// ============================================================================
// Paint
// ============================================================================

/// Applies ANSI styles when enabled, passes text through otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paint {
    /// Whether to emit ANSI escapes.
    pub colored: bool,
}

impl Paint {
    /// Colour output when stderr is a terminal.
    pub fn detect() -> Self {
        Self {
            colored: std::io::stderr().is_terminal(),
        }
    }

    /// Never colour output.
    pub const fn plain() -> Self {
        Self { colored: false }
    }

    /// Bold text (headings such as "rendering VHS tapes...").
    pub fn bold(&self, text: &str) -> String {
        self.apply(text, colorize_bold)
    }

    /// Accent colour for file names.
    pub fn accent(&self, text: &str) -> String {
        self.apply(text, colorize_accent)
    }

    /// Warning colour for advisory hints.
    pub fn warning(&self, text: &str) -> String {
        self.apply(text, colorize_warning)
    }

    fn apply(&self, text: &str, color: fn(&str) -> String) -> String {
        if self.colored {
            color(text)
        } else {
            text.to_owned()
        }
    }
}

impl Default for Paint {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_passes_through() {
        let paint = Paint::plain();
        assert_eq!(paint.bold("rendering"), "rendering");
        assert_eq!(paint.accent("a.tape"), "a.tape");
        assert_eq!(paint.warning("hint"), "hint");
    }

    #[cfg(feature = "colored-diagnostics")]
    #[test]
    fn test_colored_adds_escapes() {
        owo_colors::set_override(true);
        let paint = Paint { colored: true };
        let out = paint.accent("a.tape");
        assert!(out.contains("a.tape"));
        assert!(out.contains('\x1b'));
    }
}
