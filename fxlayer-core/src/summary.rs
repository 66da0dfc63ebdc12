//! Daily summary attachment: parsing free text from a text generator into a
//! `{title, paragraphs}` document, and cleaning text for display.
//!
//! Generators are asked for JSON but often wrap it in prose or break strings
//! across lines. Parsing is a three-step ladder with a tagged outcome:
//!
//! 1. strict: the first `{` .. last `}` span parses as-is
//! 2. repaired: the same span parses after control characters become spaces
//! 3. failed: the caller falls back to storing cleaned text as Markdown

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Structured summary as persisted in `daily_summary_{date}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
}

impl DailySummary {
    /// Markdown rendering: title, blank line, paragraphs separated by blank lines.
    pub fn to_markdown(&self) -> String {
        let mut out = self.title.clone();
        for p in &self.paragraphs {
            out.push_str("\n\n");
            out.push_str(p);
        }
        out
    }
}

/// A summary read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryAttachment {
    Structured(DailySummary),
    Markdown(String),
}

impl SummaryAttachment {
    pub fn title(&self) -> Option<&str> {
        match self {
            SummaryAttachment::Structured(s) => Some(&s.title),
            SummaryAttachment::Markdown(_) => None,
        }
    }

    /// Display paragraphs; Markdown summaries are sanitized first.
    pub fn paragraphs(&self) -> Vec<String> {
        match self {
            SummaryAttachment::Structured(s) => s.paragraphs.clone(),
            SummaryAttachment::Markdown(text) => clean_text(text)
                .split("\n\n")
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Outcome of [`extract_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryParse {
    Strict(DailySummary),
    Repaired(DailySummary),
    Failed,
}

impl SummaryParse {
    pub fn summary(self) -> Option<DailySummary> {
        match self {
            SummaryParse::Strict(s) | SummaryParse::Repaired(s) => Some(s),
            SummaryParse::Failed => None,
        }
    }
}

/// Extract a summary object from free text.
pub fn extract_summary(text: &str) -> SummaryParse {
    let Some(span) = json_span(text) else {
        return SummaryParse::Failed;
    };

    if let Some(summary) = parse_summary(span) {
        return SummaryParse::Strict(summary);
    }

    let repaired: String = span
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    match parse_summary(&repaired) {
        Some(summary) => SummaryParse::Repaired(summary),
        None => SummaryParse::Failed,
    }
}

/// The widest `{ ... }` span: first opening brace to last closing brace.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_summary(span: &str) -> Option<DailySummary> {
    let value: Value = serde_json::from_str(span).ok()?;
    let obj = value.as_object()?;

    let title = match obj.get("title")? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    let paragraphs = obj
        .get("paragraphs")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .collect();

    Some(DailySummary { title, paragraphs })
}

const INVISIBLE: [char; 5] = ['\u{200b}', '\u{200c}', '\u{200d}', '\u{feff}', '\u{2060}'];

/// Runs of word characters; interior underscores become spaces.
static WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w{3,}").expect("Invalid regex"));

/// A comma followed by whitespace and a digit.
static SPLIT_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s+(\d)").expect("Invalid regex"));

/// `R`, whitespace, `$`.
static SPLIT_REAL_SIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\s+\$").expect("Invalid regex"));

/// A blank line, possibly holding whitespace.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid regex"));

/// Clean generated or hand-written summary text for display.
///
/// - NFKC normalization (fullwidth forms become ASCII)
/// - drops zero-width characters and turns non-breaking spaces into spaces
/// - `word_word` becomes `word word`
/// - `, 5` becomes `,5` (decimal commas split by the generator)
/// - `R $` becomes `R$ `
/// - whitespace inside a paragraph collapses to single spaces; paragraphs
///   are separated by exactly one blank line
pub fn clean_text(text: &str) -> String {
    let normalized: String = text
        .nfkc()
        .filter(|c| !INVISIBLE.contains(c))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();

    let t = WORD_RUN.replace_all(&normalized, |caps: &Captures| join_underscored(&caps[0]));
    let t = SPLIT_DECIMAL.replace_all(&t, ",$1");
    let t = SPLIT_REAL_SIGN.replace_all(&t, "R$ ");

    PARAGRAPH_BREAK
        .split(t.trim())
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Underscores with a word character on both sides become spaces.
fn join_underscored(run: &str) -> String {
    let last = run.chars().count() - 1;
    run.chars()
        .enumerate()
        .map(|(i, c)| if c == '_' && i > 0 && i < last { ' ' } else { c })
        .collect()
}
