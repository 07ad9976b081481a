//! Minimal script stripping. Not a general-purpose sanitizer.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script pattern is valid")
});

/// Remove `<script>…</script>` elements.
pub fn strip_scripts(html: &str) -> Cow<'_, str> {
    SCRIPT_RE.replace_all(html, "")
}
