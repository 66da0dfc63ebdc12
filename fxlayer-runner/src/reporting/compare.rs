//! Day-over-day comparison of one layer.

use super::table::Table;
use super::{wanted_codes, LayerRow, LayerTable};
use fxlayer_core::format::{fmt_decimal, fmt_pct, RATE_PLACES};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Percent change between two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PctChange {
    Defined(f64),
    /// The earlier value was zero or the ratio is not finite.
    Undefined,
}

impl PctChange {
    pub fn between(v1: f64, v2: f64) -> Self {
        if v1 == 0.0 {
            return PctChange::Undefined;
        }
        let pct = (v2 - v1) / v1 * 100.0;
        if pct.is_finite() {
            PctChange::Defined(pct)
        } else {
            PctChange::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            PctChange::Defined(p) => Some(p),
            PctChange::Undefined => None,
        }
    }

    /// `+10,00%`, or `N/A` when undefined.
    pub fn render(self) -> String {
        match self {
            PctChange::Defined(p) => fmt_pct(p),
            PctChange::Undefined => "N/A".into(),
        }
    }

    /// Larger magnitude first; undefined after every defined change.
    fn magnitude_desc(a: &Self, b: &Self) -> Ordering {
        match (a.value(), b.value()) {
            (Some(x), Some(y)) => y.abs().total_cmp(&x.abs()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRow {
    pub currency: String,
    pub v1: f64,
    pub v2: f64,
    pub delta: f64,
    pub pct: PctChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub rows: Vec<CompareRow>,
    /// Requested codes absent from the joined set.
    pub missing: Vec<String>,
}

/// Inner join of two days on currency code.
///
/// Filtering happens before sorting by `|pct|` and `top` is applied last;
/// a `top` of zero keeps every row.
/// A currency listed twice in one day joins on its first occurrence.
pub fn compare_rows(
    day1: &[LayerRow],
    day2: &[LayerRow],
    codes: Option<&[String]>,
    top: Option<usize>,
) -> Comparison {
    let mut later: HashMap<&str, f64> = HashMap::with_capacity(day2.len());
    for row in day2 {
        later.entry(row.currency.as_str()).or_insert(row.value);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(day1.len());
    let mut rows: Vec<CompareRow> = Vec::new();
    for row in day1 {
        if !seen.insert(row.currency.as_str()) {
            continue;
        }
        if let Some(&v2) = later.get(row.currency.as_str()) {
            rows.push(CompareRow {
                currency: row.currency.clone(),
                v1: row.value,
                v2,
                delta: v2 - row.value,
                pct: PctChange::between(row.value, v2),
            });
        }
    }

    let mut missing = Vec::new();
    if let Some(codes) = codes {
        let wanted = wanted_codes(codes);
        missing = wanted
            .iter()
            .filter(|w| !rows.iter().any(|r| r.currency.eq_ignore_ascii_case(w)))
            .cloned()
            .collect();
        rows.retain(|r| wanted.iter().any(|w| w.eq_ignore_ascii_case(&r.currency)));
    }

    rows.sort_by(|a, b| PctChange::magnitude_desc(&a.pct, &b.pct));
    if let Some(n) = top.filter(|&n| n > 0) {
        rows.truncate(n);
    }

    Comparison { rows, missing }
}

pub fn render_comparison(first: &LayerTable, second: &LayerTable, cmp: &Comparison) -> String {
    let mut out = String::new();
    if !cmp.missing.is_empty() {
        out.push_str(&format!(
            "Currencies not found in both files: {}\n",
            cmp.missing.join(", ")
        ));
    }

    let header = match first.layer {
        super::Layer::Gold => format!("GOLD ({})", first.base),
        super::Layer::Silver => format!("SILVER (base {})", first.base),
    };
    out.push_str(&format!(
        "\nComparison {header}\n  {}  ->  {}\n",
        first.file_name(),
        second.file_name()
    ));

    let col1 = format!("value_{}", first.date);
    let col2 = format!("value_{}", second.date);
    let mut grid = Table::new(["currency", col1.as_str(), col2.as_str(), "delta", "pct"]);
    for row in &cmp.rows {
        grid.push_row(vec![
            row.currency.clone(),
            fmt_decimal(row.v1, RATE_PLACES),
            fmt_decimal(row.v2, RATE_PLACES),
            fmt_decimal(row.delta, RATE_PLACES),
            row.pct.render(),
        ]);
    }
    out.push_str(&grid.render());
    out.push('\n');
    out
}
