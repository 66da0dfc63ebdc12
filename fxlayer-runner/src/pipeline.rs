//! Pipeline stages: ingest, transform, load, and the per-day backfill.
//!
//! Each stage reads its input artifact from the store, writes its output
//! artifact atomically, and returns a small report. A failing day never
//! touches artifacts of other days.

use chrono::{Days, NaiveDate};
use fxlayer_core::config::{ConfigError, PipelineConfig};
use fxlayer_core::data::{
    normalize, rebase, ArtifactKind, ArtifactStore, FetchMode, ProviderError, RateProvider,
    RawSnapshot, RebaseError, SnapshotError, StoreError,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("no {kind} artifact for {}", date_label(.date))]
    MissingArtifact {
        kind: ArtifactKind,
        date: Option<NaiveDate>,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Rebase(#[from] RebaseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

fn date_label(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.to_string(),
        None => "any date".into(),
    }
}

impl StageError {
    /// Lookup misses are reported as notices rather than failures.
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, StageError::MissingArtifact { .. })
    }
}

/// Outcome of the silver stage for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformReport {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub kept: usize,
    pub dropped: usize,
}

/// Outcome of the gold stage for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub currencies: usize,
}

/// Everything written for one backfilled day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub raw: PathBuf,
    pub silver: TransformReport,
    pub gold: LoadReport,
    pub placeholder_summary: Option<PathBuf>,
}

/// Stage runner bound to one configuration.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    store: ArtifactStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            store: config.store(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fetch the latest rates and persist them as the raw artifact for `today`.
    pub fn ingest(&self, provider: &dyn RateProvider, today: NaiveDate) -> Result<PathBuf, StageError> {
        info!(provider = provider.name(), base = %self.config.fetch_base, "fetching latest rates");
        let payload = provider.fetch(&self.config.fetch_base, FetchMode::Latest)?;
        // Reject payloads the adapter cannot read before they reach disk.
        RawSnapshot::from_fetch(&payload, &self.config.fetch_base, today)?;

        let path = self.store.write_raw(today, &payload)?;
        info!(path = %path.display(), "raw snapshot saved");
        Ok(path)
    }

    /// Raw → silver for `day`.
    pub fn transform(&self, day: NaiveDate) -> Result<TransformReport, StageError> {
        let raw_path = self.require(ArtifactKind::Raw, day)?;
        info!(path = %raw_path.display(), "loading raw snapshot");

        let payload = self.store.read_raw(&raw_path)?;
        let snapshot = RawSnapshot::from_fetch(&payload, &self.config.fetch_base, day)?;
        let normalized = normalize(&snapshot)?;

        let path = self.store.write_silver(day, &normalized.records)?;
        info!(
            path = %path.display(),
            kept = normalized.records.len(),
            "silver saved"
        );
        Ok(TransformReport {
            date: day,
            path,
            kept: normalized.records.len(),
            dropped: normalized.dropped_count(),
        })
    }

    /// Silver → gold for `day`. Nothing is written when the pivot is missing.
    pub fn load(&self, day: NaiveDate) -> Result<LoadReport, StageError> {
        let silver_path = self.require(ArtifactKind::Silver, day)?;
        info!(path = %silver_path.display(), "loading silver");

        let silver = self.store.read_silver(&silver_path)?;
        let gold = rebase(&silver, self.store.pivot()).map_err(|e| {
            error!(pivot = self.store.pivot(), "{e}; gold not written");
            e
        })?;

        let path = self.store.write_gold(day, &gold)?;
        info!(path = %path.display(), currencies = gold.len(), "gold saved");
        Ok(LoadReport {
            date: day,
            path,
            currencies: gold.len(),
        })
    }

    /// Historical fetch → raw → silver → gold for one day, plus a
    /// placeholder summary when the day has none.
    pub fn process_day(&self, provider: &dyn RateProvider, day: NaiveDate) -> Result<DayReport, StageError> {
        let payload = provider.fetch(&self.config.fetch_base, FetchMode::History(day))?;
        RawSnapshot::from_fetch(&payload, &self.config.fetch_base, day)?;
        let raw = self.store.write_raw(day, &payload)?;

        let silver = self.transform(day)?;
        let gold = self.load(day)?;

        let placeholder_summary = if self.store.resolve(ArtifactKind::Summary, Some(day)).is_none() {
            Some(self.store.write_summary_markdown(day, &placeholder_summary(day))?)
        } else {
            None
        };

        Ok(DayReport {
            raw,
            silver,
            gold,
            placeholder_summary,
        })
    }

    /// Process every day of `start..=end` in order, one day at a time.
    ///
    /// A failed day is recorded and the loop moves on.
    pub fn backfill(
        &self,
        provider: &dyn RateProvider,
        start: NaiveDate,
        end: NaiveDate,
        progress: &dyn BackfillProgress,
    ) -> Result<BackfillSummary, StageError> {
        let days = date_range(start, end)?;
        let total = days.len();
        let mut summary = BackfillSummary {
            total,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for (i, day) in days.into_iter().enumerate() {
            progress.on_start(day, i, total);
            let result = self.process_day(provider, day).map(|_| ());
            progress.on_complete(day, i, total, &result);

            match result {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!(date = %day, "backfill day failed: {e}");
                    summary.errors.push((day, e));
                    summary.failed += 1;
                }
            }
        }

        progress.on_batch_complete(summary.succeeded, summary.failed, total);
        Ok(summary)
    }

    fn require(&self, kind: ArtifactKind, day: NaiveDate) -> Result<PathBuf, StageError> {
        self.store
            .resolve(kind, Some(day))
            .ok_or(StageError::MissingArtifact {
                kind,
                date: Some(day),
            })
    }
}

/// Inclusive list of days from `start` to `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, StageError> {
    if start > end {
        return Err(StageError::InvalidRange { start, end });
    }
    let mut days = Vec::new();
    let mut cur = start;
    while cur <= end {
        days.push(cur);
        match cur.checked_add_days(Days::new(1)) {
            Some(next) => cur = next,
            None => break,
        }
    }
    Ok(days)
}

/// Title used for stored summaries of `day`.
pub fn summary_title(day: NaiveDate) -> String {
    format!("Resumo Cambial - {}", day.format("%d/%m/%Y"))
}

fn placeholder_summary(day: NaiveDate) -> String {
    format!(
        "{}\n\n(run `fxlayer enrich --date {}` to generate)",
        summary_title(day),
        day
    )
}

/// Summary of a backfill run.
#[derive(Debug)]
pub struct BackfillSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(NaiveDate, StageError)>,
}

impl BackfillSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Progress callbacks for a backfill.
pub trait BackfillProgress {
    fn on_start(&self, day: NaiveDate, index: usize, total: usize);

    fn on_complete(&self, day: NaiveDate, index: usize, total: usize, result: &Result<(), StageError>);

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl BackfillProgress for StdoutProgress {
    fn on_start(&self, day: NaiveDate, index: usize, total: usize) {
        println!("[{}/{}] Processing {day}...", index + 1, total);
    }

    fn on_complete(&self, day: NaiveDate, _index: usize, _total: usize, result: &Result<(), StageError>) {
        match result {
            Ok(()) => println!("  OK: {day}"),
            Err(e) => println!("  FAIL: {day}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nBackfill complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that prints nothing.
pub struct SilentProgress;

impl BackfillProgress for SilentProgress {
    fn on_start(&self, _day: NaiveDate, _index: usize, _total: usize) {}

    fn on_complete(&self, _day: NaiveDate, _index: usize, _total: usize, _result: &Result<(), StageError>) {}

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn date_range_is_inclusive() {
        let days = date_range(day("2024-02-27"), day("2024-03-01")).unwrap();
        assert_eq!(
            days,
            vec![day("2024-02-27"), day("2024-02-28"), day("2024-02-29"), day("2024-03-01")]
        );
        assert_eq!(date_range(day("2024-01-01"), day("2024-01-01")).unwrap().len(), 1);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = date_range(day("2024-01-02"), day("2024-01-01")).unwrap_err();
        assert!(matches!(err, StageError::InvalidRange { .. }));
    }

    #[test]
    fn placeholder_names_the_day() {
        let text = placeholder_summary(day("2024-01-02"));
        assert!(text.starts_with("Resumo Cambial - 02/01/2024\n\n"));
        assert!(text.contains("--date 2024-01-02"));
    }

    #[test]
    fn missing_artifact_message() {
        let err = StageError::MissingArtifact {
            kind: ArtifactKind::Gold,
            date: None,
        };
        assert_eq!(err.to_string(), "no gold artifact for any date");
        assert!(err.is_missing_artifact());
    }
}
