//! Read-side reporting over persisted silver and gold artifacts.

pub mod compare;
pub mod export;
pub mod history;
pub mod status;
pub mod summary;
pub mod table;
pub mod view;

pub use compare::{compare_rows, render_comparison, CompareRow, Comparison, PctChange};
pub use export::write_layer_csv;
pub use history::{currency_history, render_history, HistoryPoint};
pub use status::{render_status, store_status, KindStatus};
pub use summary::{day_summary, render_summary, DaySummary};
pub use table::Table;
pub use view::{render_view, select_rows, DayView};

use crate::pipeline::StageError;
use chrono::NaiveDate;
use fxlayer_core::data::{ArtifactKind, ArtifactStore};
use std::path::PathBuf;

/// Which persisted layer a report reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layer {
    #[default]
    Gold,
    Silver,
}

impl Layer {
    pub fn kind(self) -> ArtifactKind {
        match self {
            Layer::Gold => ArtifactKind::Gold,
            Layer::Silver => ArtifactKind::Silver,
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Layer::Gold => "gold",
            Layer::Silver => "silver",
        })
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gold" => Ok(Layer::Gold),
            "silver" => Ok(Layer::Silver),
            other => Err(format!("unknown layer '{other}' (expected gold or silver)")),
        }
    }
}

/// One currency's value in a layer: the gold value in pivot units, or the
/// silver rate per fetch-base unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub currency: String,
    pub value: f64,
    pub last_update_utc: String,
}

/// A layer file loaded for reporting.
#[derive(Debug, Clone)]
pub struct LayerTable {
    pub layer: Layer,
    pub date: NaiveDate,
    pub path: PathBuf,
    /// Pivot for gold; the file's fetch base for silver.
    pub base: String,
    /// Column name of `LayerRow::value` in the file.
    pub value_column: String,
    pub rows: Vec<LayerRow>,
}

impl LayerTable {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Load the layer file for `day`, or the latest one when `day` is `None`.
pub fn load_layer(
    store: &ArtifactStore,
    layer: Layer,
    day: Option<NaiveDate>,
) -> Result<LayerTable, StageError> {
    let kind = layer.kind();
    let missing = || StageError::MissingArtifact { kind, date: day };

    let date = match day {
        Some(d) => d,
        None => *store.available_dates(kind).last().ok_or_else(missing)?,
    };
    let path = store.resolve(kind, Some(date)).ok_or_else(missing)?;

    match layer {
        Layer::Gold => {
            let rows = store
                .read_gold(&path)?
                .into_iter()
                .map(|r| LayerRow {
                    currency: r.currency,
                    value: r.value_in_pivot,
                    last_update_utc: r.last_update_utc,
                })
                .collect();
            Ok(LayerTable {
                layer,
                date,
                path,
                base: store.pivot().to_string(),
                value_column: store.gold_schema().value_column().to_string(),
                rows,
            })
        }
        Layer::Silver => {
            let silver = store.read_silver(&path)?;
            let base = silver
                .first()
                .map(|r| r.base_currency.clone())
                .unwrap_or_default();
            let rows = silver
                .into_iter()
                .map(|r| LayerRow {
                    currency: r.target_currency,
                    value: r.rate,
                    last_update_utc: r.last_update_utc,
                })
                .collect();
            Ok(LayerTable {
                layer,
                date,
                path,
                base,
                value_column: "rate".into(),
                rows,
            })
        }
    }
}

/// Uppercased, de-duplicated request codes in request order.
pub(crate) fn wanted_codes(codes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim().to_uppercase();
        if !code.is_empty() && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}
