//! One currency's value across the most recent available days.

use super::compare::PctChange;
use super::table::Table;
use super::{load_layer, Layer};
use crate::pipeline::StageError;
use chrono::NaiveDate;
use fxlayer_core::data::ArtifactStore;
use fxlayer_core::format::{fmt_decimal, RATE_PLACES};

pub const DEFAULT_HISTORY_DAYS: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// Change from the previous point; `None` for the first one.
    pub change: Option<PctChange>,
}

/// Values of `currency` in the last `days` available files of `layer`,
/// oldest first. Days whose file lacks the currency are skipped.
pub fn currency_history(
    store: &ArtifactStore,
    layer: Layer,
    currency: &str,
    days: usize,
) -> Result<Vec<HistoryPoint>, StageError> {
    let dates = store.available_dates(layer.kind());
    if dates.is_empty() {
        return Err(StageError::MissingArtifact {
            kind: layer.kind(),
            date: None,
        });
    }
    let start = dates.len().saturating_sub(days);

    let mut points: Vec<HistoryPoint> = Vec::new();
    for &date in &dates[start..] {
        let table = load_layer(store, layer, Some(date))?;
        let Some(row) = table
            .rows
            .iter()
            .find(|r| r.currency.eq_ignore_ascii_case(currency))
        else {
            continue;
        };
        let change = points.last().map(|prev| PctChange::between(prev.value, row.value));
        points.push(HistoryPoint {
            date,
            value: row.value,
            change,
        });
    }
    Ok(points)
}

pub fn render_history(currency: &str, layer: Layer, points: &[HistoryPoint]) -> String {
    let mut out = format!("\nHistory {} ({layer}, {} days)\n", currency.to_uppercase(), points.len());
    let mut grid = Table::new(["date", "value", "change"]);
    for p in points {
        grid.push_row(vec![
            p.date.to_string(),
            fmt_decimal(p.value, RATE_PLACES),
            p.change.map(PctChange::render).unwrap_or_else(|| "-".into()),
        ]);
    }
    out.push_str(&grid.render());
    out.push('\n');
    out
}
