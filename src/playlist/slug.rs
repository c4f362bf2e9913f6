use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]").unwrap());

/// Derives a channel id from its display name
///
/// Lower-cases the name, collapses whitespace runs into a single `-` and strips
/// every character outside `[a-z0-9-]`. Applying it to its own output is a no-op.
#[must_use]
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let hyphenated = WHITESPACE_REGEX.replace_all(&lowered, "-");
    NON_SLUG_REGEX.replace_all(&hyphenated, "").into_owned()
}
