//! Precompiled format patterns for format validation.
//!
//! The validation layer only needs a "does this text match that format"
//! capability; the patterns themselves live here, compiled once.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-zA-Z.][-\w+.]*@([0-9a-zA-Z_][-\w]*[0-9a-zA-Z]*\.)+[a-zA-Z]{2,9}$")
        .expect("email pattern compiles")
});

// Two letters, five alphanumerics, five digits.
static CODE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]{2}[a-zA-Z0-9]{5}[0-9]{5}$").expect("code pattern compiles")
});

static HEX_COLOR_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#([A-F0-9]{3}|[A-F0-9]{6})$").expect("hex color pattern compiles")
});

/// A well-known input format.
///
/// # Examples
///
/// ```
/// use intake_core::Format;
///
/// assert!(Format::Email.matches("sean@example.com"));
/// assert!(!Format::Email.matches("not-an-email"));
/// assert!(Format::HexColor.matches("#A1B2C3"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// An email address.
    Email,
    /// A twelve-character alphanumeric code.
    Code,
    /// A three- or six-digit hex color, `#`-prefixed.
    HexColor,
}

impl Format {
    /// Whether `value` matches this format.
    pub fn matches(&self, value: &str) -> bool {
        self.regex().is_match(value)
    }

    /// The compiled pattern backing this format.
    pub fn regex(&self) -> &'static Regex {
        match self {
            Format::Email => &EMAIL_FORMAT,
            Format::Code => &CODE_FORMAT,
            Format::HexColor => &HEX_COLOR_FORMAT,
        }
    }
}
