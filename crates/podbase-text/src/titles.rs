//! Episode-title normalization.
//!
//! One canonical spelling is shared by the relational store, stage3, and
//! stage4, so joins across all three keep matching. `normalize_title` is a
//! pure function and idempotent; the coordinated pass that applies it across
//! stores lives with the stage tooling.

use regex::Regex;
use std::sync::LazyLock;

/// Matches episode markers like `Ep.2`, `ep_2`, `EP 2` (after whitespace has
/// become underscores) when not preceded by an ASCII letter or digit, so
/// words like "Deep6" are left alone.
static EP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^|[^a-z0-9])ep[._]*(\d+)").unwrap());

/// Produce the canonical spelling of an episode title.
///
/// Rules, in order:
/// 1. every whitespace run becomes a single underscore
/// 2. episode markers canonicalize to `EP<digits>` with no separator
/// 3. characters other than letters, digits, `_`, `-`, `.` are stripped,
///    then rule 2 runs again: stripping can uncover a marker (`Ep#2` ->
///    `Ep2`) and the first pass must already land on the canonical form
/// 4. repeated underscores collapse to one; leading/trailing underscores go
pub fn normalize_title(raw_title: &str) -> String {
    // 1. whitespace runs -> "_"
    let mut underscored = String::with_capacity(raw_title.len());
    let mut in_whitespace = false;
    for c in raw_title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                underscored.push('_');
            }
            in_whitespace = true;
        } else {
            underscored.push(c);
            in_whitespace = false;
        }
    }

    // 2. Ep. / ep_ / EP markers -> EP<digits>
    let marked = EP_MARKER.replace_all(&underscored, "${1}EP${2}");

    // 3. strip everything outside letters, digits, '_', '-', '.'
    let stripped: String = marked
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();

    // stripping can uncover a marker ("Ep#2" became "Ep2"), so rule 2 runs
    // once more on the stripped text
    let remarked = EP_MARKER.replace_all(&stripped, "${1}EP${2}");

    // 4. collapse '__' runs and trim the ends
    let mut collapsed = String::with_capacity(remarked.len());
    let mut last_was_underscore = false;
    for c in remarked.chars() {
        if c == '_' {
            if !last_was_underscore {
                collapsed.push('_');
            }
            last_was_underscore = true;
        } else {
            collapsed.push(c);
            last_was_underscore = false;
        }
    }
    collapsed.trim_matches('_').to_string()
}
