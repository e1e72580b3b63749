use indexmap::IndexMap;
use serde::Serialize;

/// Scalar cell content after decoding. Everything is persisted as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty) || matches!(self, CellValue::Text(s) if s.is_empty())
    }

    /// Trimmed text form used for storage and key comparison.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Shortest round-trip text, in the same shape a spreadsheet export would
/// print it: plain digits for ordinary magnitudes, `1e+21` / `1.5e-7` style
/// exponents outside `[1e-6, 1e21)`.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        // normalizes -0
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = n.abs();
    if !(1e-6..1e21).contains(&abs) && abs.is_finite() {
        let exp = format!("{n:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    n.to_string()
}

/// One parsed spreadsheet row: raw header → value, in header order.
pub type SheetRow = IndexMap<String, CellValue>;

/// True when no cell in the row carries any content at all.
///
/// Whitespace-only text counts as content here; it only becomes empty after
/// trimming in the loader.
pub fn row_is_blank(row: &SheetRow) -> bool {
    row.values().all(CellValue::is_empty)
}
