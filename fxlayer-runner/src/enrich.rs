//! Daily summary generation from gold data.
//!
//! Enrichment never aborts a range: each day ends in an [`EnrichOutcome`]
//! and the range reports success when any day produced a summary.

use crate::pipeline::{date_range, summary_title, StageError};
use chrono::NaiveDate;
use fxlayer_core::config::PipelineConfig;
use fxlayer_core::data::{ArtifactKind, ArtifactStore, RebasedRecord};
use fxlayer_core::format::fmt_money;
use fxlayer_core::summary::{clean_text, extract_summary, DailySummary, SummaryParse};
use fxlayer_core::textgen::TextGenerator;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Quoted currencies when none of the configured ones are in the file.
const FALLBACK_QUOTES: usize = 5;

const SYSTEM_PROMPT: &str = "You are a helpful and concise senior financial analyst in Brazil.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingGold,
    MissingTextGenerator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichOutcome {
    /// Parsed summary written as `.json` and `.md`.
    Structured { json: PathBuf, markdown: PathBuf },
    /// Unparseable reply written as cleaned `.md`.
    Fallback { markdown: PathBuf },
    Skipped(SkipReason),
    Failed(String),
}

impl EnrichOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EnrichOutcome::Structured { .. } | EnrichOutcome::Fallback { .. })
    }
}

pub struct Enricher<'a> {
    config: &'a PipelineConfig,
    store: ArtifactStore,
    generator: Option<&'a dyn TextGenerator>,
}

impl<'a> Enricher<'a> {
    /// `generator` is `None` when no text-generation key is configured;
    /// every day is then skipped.
    pub fn new(config: &'a PipelineConfig, generator: Option<&'a dyn TextGenerator>) -> Self {
        Self {
            config,
            store: config.store(),
            generator,
        }
    }

    pub fn enrich_day(&self, day: NaiveDate) -> EnrichOutcome {
        let Some(generator) = self.generator else {
            error!(date = %day, "no text generator configured; summary skipped");
            return EnrichOutcome::Skipped(SkipReason::MissingTextGenerator);
        };
        let Some(gold_path) = self.store.resolve(ArtifactKind::Gold, Some(day)) else {
            warn!(date = %day, "gold missing; summary skipped");
            return EnrichOutcome::Skipped(SkipReason::MissingGold);
        };

        match self.generate(generator, day, &gold_path) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(date = %day, "summary generation failed: {e}");
                EnrichOutcome::Failed(e)
            }
        }
    }

    /// Enrich every day of `start..=end`; `true` when any day succeeded.
    pub fn enrich_range(&self, start: NaiveDate, end: NaiveDate) -> Result<bool, StageError> {
        let mut any = false;
        for day in date_range(start, end)? {
            any |= self.enrich_day(day).is_success();
        }
        Ok(any)
    }

    fn generate(
        &self,
        generator: &dyn TextGenerator,
        day: NaiveDate,
        gold_path: &std::path::Path,
    ) -> Result<EnrichOutcome, String> {
        let gold = self.store.read_gold(gold_path).map_err(|e| e.to_string())?;
        let lines = quote_lines(&select_quotes(&gold, &self.config.summary_currencies), self.store.pivot());
        let prompt = build_prompt(day, self.store.pivot(), &lines);

        info!(date = %day, "generating summary");
        let reply = generator
            .generate(SYSTEM_PROMPT, &prompt)
            .map_err(|e| e.to_string())?;

        let summary = match extract_summary(&reply) {
            SummaryParse::Strict(s) => s,
            SummaryParse::Repaired(s) => {
                info!(date = %day, "summary JSON needed repair");
                s
            }
            SummaryParse::Failed => {
                warn!(date = %day, "reply has no valid summary JSON; saving cleaned Markdown");
                let markdown = self
                    .store
                    .write_summary_markdown(day, &clean_text(&reply))
                    .map_err(|e| e.to_string())?;
                return Ok(EnrichOutcome::Fallback { markdown });
            }
        };

        let summary = self.finish(summary, day);
        let json = self
            .store
            .write_summary_json(day, &summary)
            .map_err(|e| e.to_string())?;
        let markdown = self
            .store
            .write_summary_markdown(day, &summary.to_markdown())
            .map_err(|e| e.to_string())?;
        info!(json = %json.display(), markdown = %markdown.display(), "summary saved");
        Ok(EnrichOutcome::Structured { json, markdown })
    }

    /// Clean and cap paragraphs; an empty title falls back to the default.
    fn finish(&self, summary: DailySummary, day: NaiveDate) -> DailySummary {
        let title = if summary.title.is_empty() {
            summary_title(day)
        } else {
            summary.title
        };
        let paragraphs = summary
            .paragraphs
            .iter()
            .map(|p| clean_text(p))
            .filter(|p| !p.is_empty())
            .take(self.config.max_paragraphs)
            .collect();
        DailySummary { title, paragraphs }
    }
}

/// Gold rows for the configured currencies in file order, or the
/// highest-valued rows when none of them are present.
pub fn select_quotes<'r>(gold: &'r [RebasedRecord], wanted: &[String]) -> Vec<&'r RebasedRecord> {
    let picked: Vec<&RebasedRecord> = gold
        .iter()
        .filter(|r| wanted.iter().any(|w| w.eq_ignore_ascii_case(&r.currency)))
        .collect();
    if !picked.is_empty() {
        return picked;
    }

    let mut by_value: Vec<&RebasedRecord> = gold.iter().collect();
    by_value.sort_by(|a, b| b.value_in_pivot.total_cmp(&a.value_in_pivot));
    by_value.truncate(FALLBACK_QUOTES);
    by_value
}

/// `1 USD = R$ 5,0000` lines.
pub fn quote_lines(quotes: &[&RebasedRecord], pivot: &str) -> Vec<String> {
    quotes
        .iter()
        .map(|r| format!("1 {} = {}", r.currency, fmt_money(pivot, r.value_in_pivot)))
        .collect()
}

fn build_prompt(day: NaiveDate, pivot: &str, lines: &[String]) -> String {
    let date_br = day.format("%d/%m/%Y");
    format!(
        "Write an executive summary of today's exchange market from the data below, in Brazilian Portuguese.\n\
Data for {date_br}, values in {pivot} for 1 unit of each currency:\n\
{data}\n\n\
Answer ONLY with valid JSON, no Markdown, in the format:\n\
{{\n  \"title\": \"{title}\",\n  \"paragraphs\": [\n    \"Short paragraph 1.\",\n    \"Short paragraph 2.\",\n    \"Short paragraph 3.\"\n  ]\n}}\n\
Rules: short sentences; highlight USD and EUR; mention South American currencies when relevant; \
no italics or bold; no invisible characters; no emojis; no broken words. Do not include anything outside the JSON.",
        data = lines.join("\n"),
        title = summary_title(day),
    )
}
