//! Header → column identifier normalization.
//!
//! Every header list goes through [`unique_column_names`] both when a table is
//! created and when rows are inserted; the two phases only line up because the
//! naming pass is deterministic.

use std::collections::HashSet;

/// Identity column created alongside every destination table.
pub const IDENTITY_COLUMN: &str = "id";

/// Used when the header cell is absent or an empty string.
pub const MISSING_HEADER_NAME: &str = "unknown_column";

/// Used when a header strips down to nothing (e.g. `"#"` or `"   "`).
pub const FALLBACK_COLUMN_NAME: &str = "col";

/// Normalize one raw header into a lowercase `[a-z0-9_]` token.
///
/// - absent/empty input → [`MISSING_HEADER_NAME`]
/// - trim, collapse whitespace runs to `_`, drop anything outside `[A-Za-z0-9_]`, lowercase
/// - empty after stripping → [`FALLBACK_COLUMN_NAME`]
pub fn sanitize(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(r) if !r.is_empty() => r,
        _ => return MISSING_HEADER_NAME.to_string(),
    };

    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch.to_ascii_lowercase());
        }
    }

    if out.is_empty() {
        FALLBACK_COLUMN_NAME.to_string()
    } else {
        out
    }
}

/// Stateful uniqueness pass over a single header list.
#[derive(Debug, Clone)]
pub struct ColumnNamer {
    used: HashSet<String>,
}

impl Default for ColumnNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnNamer {
    /// Fresh name set. The identity column is pre-reserved so a header named
    /// `ID` cannot shadow it.
    pub fn new() -> Self {
        let mut used = HashSet::new();
        used.insert(IDENTITY_COLUMN.to_string());
        Self { used }
    }

    /// Sanitize `raw` and suffix `_1`, `_2`, … until the name is unused.
    pub fn assign(&mut self, raw: Option<&str>) -> String {
        let base = sanitize(raw);
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Column names for an ordered header list, in header order.
pub fn unique_column_names<'a, I>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut namer = ColumnNamer::new();
    headers
        .into_iter()
        .map(|h| namer.assign(Some(h)))
        .collect()
}
