//! fxlayer runner: pipeline stages, summary enrichment, and reporting.
//!
//! This crate builds on `fxlayer-core` to provide:
//! - ingest / transform / load stages and the sequential backfill
//! - daily summary generation through a `TextGenerator`
//! - view, compare, history, export, and status reports

pub mod enrich;
pub mod pipeline;
pub mod reporting;

pub use enrich::{EnrichOutcome, Enricher, SkipReason};
pub use pipeline::{
    date_range, BackfillProgress, BackfillSummary, DayReport, LoadReport, Pipeline, SilentProgress,
    StageError, StdoutProgress, TransformReport,
};
pub use reporting::{load_layer, Layer, LayerRow, LayerTable};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn reports_are_send_sync() {
        assert_send::<TransformReport>();
        assert_sync::<TransformReport>();
        assert_send::<LoadReport>();
        assert_sync::<LoadReport>();
        assert_send::<LayerTable>();
        assert_sync::<LayerTable>();
    }
}
