//! Available dates per artifact kind.

use super::table::Table;
use chrono::NaiveDate;
use fxlayer_core::data::{ArtifactKind, ArtifactStore};

#[derive(Debug, Clone, PartialEq)]
pub struct KindStatus {
    pub kind: ArtifactKind,
    pub dates: Vec<NaiveDate>,
}

impl KindStatus {
    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

pub fn store_status(store: &ArtifactStore) -> Vec<KindStatus> {
    ArtifactKind::ALL
        .iter()
        .map(|&kind| KindStatus {
            kind,
            dates: store.available_dates(kind),
        })
        .collect()
}

pub fn render_status(store: &ArtifactStore, status: &[KindStatus]) -> String {
    let mut out = format!("\nStore: {} (pivot {})\n", store.root().display(), store.pivot());
    let mut grid = Table::new(["kind", "files", "first", "last"]);
    let date_or_dash = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
    for s in status {
        grid.push_row(vec![
            s.kind.to_string(),
            s.dates.len().to_string(),
            date_or_dash(s.first()),
            date_or_dash(s.last()),
        ]);
    }
    out.push_str(&grid.render());
    out.push('\n');
    out
}
