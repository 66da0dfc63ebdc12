//! Daily summary display: the structured JSON when present, else the
//! cleaned Markdown, else a notice.

use crate::pipeline::StageError;
use chrono::NaiveDate;
use fxlayer_core::data::{ArtifactKind, ArtifactStore};
use fxlayer_core::summary::SummaryAttachment;

#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub attachment: Option<SummaryAttachment>,
}

/// Read the summary for `day`, or for the most recent summarized day when
/// `day` is `None`.
pub fn day_summary(store: &ArtifactStore, day: Option<NaiveDate>) -> Result<DaySummary, StageError> {
    let date = match day {
        Some(d) => d,
        None => *store
            .available_dates(ArtifactKind::Summary)
            .last()
            .ok_or(StageError::MissingArtifact {
                kind: ArtifactKind::Summary,
                date: None,
            })?,
    };
    let attachment = store.read_summary(date)?;
    Ok(DaySummary { date, attachment })
}

pub fn render_summary(summary: &DaySummary) -> String {
    let Some(attachment) = &summary.attachment else {
        return format!("No summary available for {}.\n", summary.date);
    };

    let mut blocks: Vec<String> = Vec::new();
    if let Some(title) = attachment.title().filter(|t| !t.is_empty()) {
        blocks.push(title.to_string());
    }
    blocks.extend(attachment.paragraphs());

    let mut out = format!("\n[SUMMARY] {}\n\n", summary.date);
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');
    out
}
