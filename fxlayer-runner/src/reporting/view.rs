//! Single-day table of one layer.

use super::table::Table;
use super::{wanted_codes, Layer, LayerRow, LayerTable};
use fxlayer_core::format::{fmt_decimal, RATE_PLACES};

/// Rows selected for display plus the requested codes that were not found.
#[derive(Debug, Clone, PartialEq)]
pub struct DayView {
    pub rows: Vec<LayerRow>,
    pub missing: Vec<String>,
}

/// Filter by `codes` (case-insensitive), keep the `top` highest values, and
/// order the result by currency code. A `top` of zero means no limit.
pub fn select_rows(rows: &[LayerRow], codes: Option<&[String]>, top: Option<usize>) -> DayView {
    let mut selected: Vec<LayerRow> = rows.to_vec();
    let mut missing = Vec::new();

    if let Some(codes) = codes {
        let wanted = wanted_codes(codes);
        missing = wanted
            .iter()
            .filter(|w| !rows.iter().any(|r| r.currency.eq_ignore_ascii_case(w)))
            .cloned()
            .collect();
        selected.retain(|r| wanted.iter().any(|w| w.eq_ignore_ascii_case(&r.currency)));
    }

    if let Some(n) = top.filter(|&n| n > 0) {
        selected.sort_by(|a, b| b.value.total_cmp(&a.value));
        selected.truncate(n);
    }

    selected.sort_by(|a, b| a.currency.cmp(&b.currency));
    DayView {
        rows: selected,
        missing,
    }
}

/// Render the header, the not-found notice (if any) and the table.
pub fn render_view(table: &LayerTable, view: &DayView) -> String {
    let mut out = String::new();
    if !view.missing.is_empty() {
        out.push_str(&format!(
            "Currencies not found in {}: {}\n",
            table.file_name(),
            view.missing.join(", ")
        ));
    }

    match table.layer {
        Layer::Gold => out.push_str(&format!(
            "\n[GOLD/{}] File: {}\n",
            table.base,
            table.path.display()
        )),
        Layer::Silver => out.push_str(&format!(
            "\n[SILVER/base={base}] File: {} (rate = {base}->currency)\n",
            table.path.display(),
            base = table.base
        )),
    }

    let mut grid = Table::new(["currency", table.value_column.as_str(), "last_update_utc"]);
    for row in &view.rows {
        grid.push_row(vec![
            row.currency.clone(),
            fmt_decimal(row.value, RATE_PLACES),
            row.last_update_utc.clone(),
        ]);
    }
    out.push_str(&grid.render());
    out.push('\n');
    out
}
