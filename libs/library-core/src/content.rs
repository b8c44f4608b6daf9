//! Rich-text file reference scanning and rewriting.
//!
//! # Format
//! Rich text embeds files by a `/file/<id>` path segment, e.g.
//! ```html
//! <img src="/api/file/55">
//! <a href="/file/56">handout</a>
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::types::LocalizedText;

fn file_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/file/(\d+)").expect("file reference pattern is valid"))
}

/// Collect the distinct file ids referenced anywhere in the text.
pub fn extract_ids_from_str(text: &str) -> BTreeSet<i64> {
    file_reference()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i64>().ok())
        .collect()
}

/// Union of file ids referenced across every language variant.
pub fn extract_file_ids(content: &LocalizedText) -> BTreeSet<i64> {
    content
        .values()
        .flat_map(|text| extract_ids_from_str(text))
        .collect()
}

/// Replace each referenced id that has a mapping; unmapped ids stay as they are.
///
/// Substitution happens in a single pass so a new id can never be
/// rewritten again by a later mapping.
pub fn rewrite_str(text: &str, mapping: &BTreeMap<i64, i64>) -> String {
    file_reference()
        .replace_all(text, |caps: &Captures| {
            let original = &caps[0];
            match caps[1].parse::<i64>().ok().and_then(|id| mapping.get(&id)) {
                Some(local) => format!("/file/{}", local),
                None => original.to_string(),
            }
        })
        .into_owned()
}

/// Rewrite every language variant with the same mapping.
pub fn rewrite_file_ids(content: &LocalizedText, mapping: &BTreeMap<i64, i64>) -> LocalizedText {
    content
        .iter()
        .map(|(lang, text)| (lang.clone(), rewrite_str(text, mapping)))
        .collect()
}
