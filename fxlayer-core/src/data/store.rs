//! On-disk artifact store and date-indexed file resolution.
//!
//! Layout under the store root (default `data/`):
//!
//! | kind    | path                                                  |
//! |---------|-------------------------------------------------------|
//! | raw     | `raw/{date}.json`                                     |
//! | silver  | `silver/{date}.parquet`                               |
//! | gold    | `gold/exchange_rates_{pivot}_base_{date}.parquet`     |
//! | summary | `gold/daily_summary_{date}.json` or `.md`             |
//!
//! `{date}` is always `YYYY-MM-DD`, so lexicographic order of file names is
//! chronological order. Writes are atomic (write to `.tmp`, rename into place).

use super::normalize::NormalizedRecord;
use super::rebase::RebasedRecord;
use super::schema::{GoldSchema, SchemaError, SilverSchema};
use crate::summary::{DailySummary, SummaryAttachment};
use chrono::NaiveDate;
use polars::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet I/O error on {path}: {reason}")]
    Parquet { path: PathBuf, reason: String },

    #[error("invalid JSON in {path}: {reason}")]
    Json { path: PathBuf, reason: String },

    #[error("schema error in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("refusing to write empty {kind} artifact for {date}")]
    EmptyArtifact { kind: ArtifactKind, date: NaiveDate },
}

/// The persisted layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Raw,
    Silver,
    Gold,
    Summary,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Raw,
        ArtifactKind::Silver,
        ArtifactKind::Gold,
        ArtifactKind::Summary,
    ];
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::Raw => "raw",
            ArtifactKind::Silver => "silver",
            ArtifactKind::Gold => "gold",
            ArtifactKind::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// Serialization of a daily summary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Json,
    Markdown,
}

/// A file name pattern: `{prefix}{date}{suffix}`.
#[derive(Debug, Clone)]
struct NamePattern {
    prefix: String,
    suffix: &'static str,
}

impl NamePattern {
    fn name_for(&self, day: NaiveDate) -> String {
        format!("{}{}{}", self.prefix, day.format(DATE_FORMAT), self.suffix)
    }

    /// Extract the date from a matching file name.
    fn date_of(&self, file_name: &str) -> Option<NaiveDate> {
        let middle = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix)?;
        if middle.len() != 10 {
            return None;
        }
        NaiveDate::parse_from_str(middle, DATE_FORMAT).ok()
    }
}

/// The artifact store rooted at one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    pivot: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, pivot: &str) -> Self {
        Self {
            root: root.into(),
            pivot: pivot.trim().to_uppercase(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pivot currency of the gold layer.
    pub fn pivot(&self) -> &str {
        &self.pivot
    }

    pub fn gold_schema(&self) -> GoldSchema {
        GoldSchema::for_pivot(&self.pivot)
    }

    /// Directory holding artifacts of `kind`.
    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Raw => self.root.join("raw"),
            ArtifactKind::Silver => self.root.join("silver"),
            ArtifactKind::Gold | ArtifactKind::Summary => self.root.join("gold"),
        }
    }

    fn patterns(&self, kind: ArtifactKind) -> Vec<NamePattern> {
        match kind {
            ArtifactKind::Raw => vec![NamePattern {
                prefix: String::new(),
                suffix: ".json",
            }],
            ArtifactKind::Silver => vec![NamePattern {
                prefix: String::new(),
                suffix: ".parquet",
            }],
            ArtifactKind::Gold => vec![NamePattern {
                prefix: format!("exchange_rates_{}_base_", self.pivot.to_lowercase()),
                suffix: ".parquet",
            }],
            ArtifactKind::Summary => vec![
                Self::summary_pattern(SummaryFormat::Json),
                Self::summary_pattern(SummaryFormat::Markdown),
            ],
        }
    }

    fn summary_pattern(format: SummaryFormat) -> NamePattern {
        NamePattern {
            prefix: "daily_summary_".into(),
            suffix: match format {
                SummaryFormat::Json => ".json",
                SummaryFormat::Markdown => ".md",
            },
        }
    }

    /// Expected path of an artifact for `day`.
    ///
    /// For summaries this is the preferred JSON form; see [`Self::summary_path`].
    pub fn path_for(&self, kind: ArtifactKind, day: NaiveDate) -> PathBuf {
        let pattern = &self.patterns(kind)[0];
        self.dir(kind).join(pattern.name_for(day))
    }

    pub fn summary_path(&self, day: NaiveDate, format: SummaryFormat) -> PathBuf {
        self.dir(ArtifactKind::Summary)
            .join(Self::summary_pattern(format).name_for(day))
    }

    /// Resolve the artifact to read for `day`, or the most recent one when
    /// `day` is `None`. A miss is `None`, never an error.
    pub fn resolve(&self, kind: ArtifactKind, day: Option<NaiveDate>) -> Option<PathBuf> {
        let day = match day {
            Some(d) => d,
            None => *self.available_dates(kind).last()?,
        };
        self.patterns(kind)
            .iter()
            .map(|p| self.dir(kind).join(p.name_for(day)))
            .find(|path| path.is_file())
    }

    /// Dates with an artifact of `kind`, ascending, without duplicates.
    pub fn available_dates(&self, kind: ArtifactKind) -> Vec<NaiveDate> {
        let patterns = self.patterns(kind);
        let Ok(entries) = fs::read_dir(self.dir(kind)) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| patterns.iter().any(|p| p.date_of(name).is_some()))
            .collect();
        names.sort();

        let mut dates: Vec<NaiveDate> = names
            .iter()
            .filter_map(|name| patterns.iter().find_map(|p| p.date_of(name)))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    // ── Writers ────────────────────────────────────────────────────

    /// Persist a provider payload verbatim.
    pub fn write_raw(&self, day: NaiveDate, payload: &Value) -> Result<PathBuf, StoreError> {
        let path = self.path_for(ArtifactKind::Raw, day);
        let json = serde_json::to_vec_pretty(payload).map_err(|e| StoreError::Json {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&path, &json)?;
        Ok(path)
    }

    pub fn write_silver(&self, day: NaiveDate, records: &[NormalizedRecord]) -> Result<PathBuf, StoreError> {
        if records.is_empty() {
            return Err(StoreError::EmptyArtifact {
                kind: ArtifactKind::Silver,
                date: day,
            });
        }
        let path = self.path_for(ArtifactKind::Silver, day);
        let mut df = SilverSchema::to_frame(records).map_err(|source| StoreError::Schema {
            path: path.clone(),
            source,
        })?;
        write_parquet_atomic(&mut df, &path)?;
        Ok(path)
    }

    pub fn write_gold(&self, day: NaiveDate, records: &[RebasedRecord]) -> Result<PathBuf, StoreError> {
        if records.is_empty() {
            return Err(StoreError::EmptyArtifact {
                kind: ArtifactKind::Gold,
                date: day,
            });
        }
        let path = self.path_for(ArtifactKind::Gold, day);
        let mut df = self
            .gold_schema()
            .to_frame(records)
            .map_err(|source| StoreError::Schema {
                path: path.clone(),
                source,
            })?;
        write_parquet_atomic(&mut df, &path)?;
        Ok(path)
    }

    pub fn write_summary_json(&self, day: NaiveDate, summary: &DailySummary) -> Result<PathBuf, StoreError> {
        let path = self.summary_path(day, SummaryFormat::Json);
        let json = serde_json::to_vec_pretty(summary).map_err(|e| StoreError::Json {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&path, &json)?;
        Ok(path)
    }

    pub fn write_summary_markdown(&self, day: NaiveDate, text: &str) -> Result<PathBuf, StoreError> {
        let path = self.summary_path(day, SummaryFormat::Markdown);
        write_atomic(&path, text.as_bytes())?;
        Ok(path)
    }

    // ── Readers ────────────────────────────────────────────────────

    pub fn read_raw(&self, path: &Path) -> Result<Value, StoreError> {
        let bytes = fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Json {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn read_silver(&self, path: &Path) -> Result<Vec<NormalizedRecord>, StoreError> {
        let df = read_parquet(path)?;
        SilverSchema::from_frame(&df).map_err(|source| StoreError::Schema {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_gold(&self, path: &Path) -> Result<Vec<RebasedRecord>, StoreError> {
        let df = read_parquet(path)?;
        self.gold_schema()
            .from_frame(&df)
            .map_err(|source| StoreError::Schema {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read the summary for `day`: structured JSON if present, else Markdown.
    pub fn read_summary(&self, day: NaiveDate) -> Result<Option<SummaryAttachment>, StoreError> {
        let json_path = self.summary_path(day, SummaryFormat::Json);
        if json_path.is_file() {
            let text = read_text(&json_path)?;
            let summary: DailySummary =
                serde_json::from_str(&text).map_err(|e| StoreError::Json {
                    path: json_path.clone(),
                    reason: e.to_string(),
                })?;
            return Ok(Some(SummaryAttachment::Structured(summary)));
        }

        let md_path = self.summary_path(day, SummaryFormat::Markdown);
        if md_path.is_file() {
            return Ok(Some(SummaryAttachment::Markdown(read_text(&md_path)?)));
        }
        Ok(None)
    }
}

// ── File I/O helpers ────────────────────────────────────────────────

fn read_text(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write bytes to `path` via a temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, bytes).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    rename_into_place(&tmp_path, path)
}

fn write_parquet_atomic(df: &mut DataFrame, path: &Path) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let tmp_path = tmp_path_for(path);
    let file = fs::File::create(&tmp_path).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| StoreError::Parquet {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    rename_into_place(&tmp_path, path)
}

fn read_parquet(path: &Path) -> Result<DataFrame, StoreError> {
    let file = fs::File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<(), StoreError> {
    fs::rename(tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(tmp_path);
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(path = %path.display(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store() -> ArtifactStore {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("fxlayer_store_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        ArtifactStore::new(dir, "BRL")
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn gold_rows() -> Vec<RebasedRecord> {
        vec![
            RebasedRecord {
                currency: "USD".into(),
                value_in_pivot: 5.0,
                last_update_utc: "2024-01-02 00:00:01".into(),
            },
            RebasedRecord {
                currency: "BRL".into(),
                value_in_pivot: 1.0,
                last_update_utc: "2024-01-02 00:00:01".into(),
            },
        ]
    }

    #[test]
    fn layout_matches_documented_paths() {
        let store = temp_store();
        let d = day("2024-01-02");
        assert!(store
            .path_for(ArtifactKind::Raw, d)
            .ends_with("raw/2024-01-02.json"));
        assert!(store
            .path_for(ArtifactKind::Silver, d)
            .ends_with("silver/2024-01-02.parquet"));
        assert!(store
            .path_for(ArtifactKind::Gold, d)
            .ends_with("gold/exchange_rates_brl_base_2024-01-02.parquet"));
        assert!(store
            .summary_path(d, SummaryFormat::Markdown)
            .ends_with("gold/daily_summary_2024-01-02.md"));
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn resolve_exact_date_only_if_present() {
        let store = temp_store();
        touch(&store.path_for(ArtifactKind::Silver, day("2024-01-02")));

        assert!(store
            .resolve(ArtifactKind::Silver, Some(day("2024-01-02")))
            .is_some());
        assert!(store
            .resolve(ArtifactKind::Silver, Some(day("2024-01-03")))
            .is_none());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn resolve_latest_picks_greatest_date() {
        let store = temp_store();
        for d in ["2023-12-31", "2024-01-10", "2024-01-02"] {
            touch(&store.path_for(ArtifactKind::Gold, day(d)));
        }
        // Files that do not match the gold pattern are ignored.
        touch(&store.dir(ArtifactKind::Gold).join("exchange_rates_brl_base_latest.parquet"));
        touch(&store.summary_path(day("2025-01-01"), SummaryFormat::Json));

        let latest = store.resolve(ArtifactKind::Gold, None).unwrap();
        assert!(latest.ends_with("exchange_rates_brl_base_2024-01-10.parquet"));
        assert_eq!(store.available_dates(ArtifactKind::Gold).len(), 3);
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn resolve_on_missing_dir_is_none() {
        let store = temp_store();
        assert!(store.resolve(ArtifactKind::Raw, None).is_none());
        assert!(store.available_dates(ArtifactKind::Raw).is_empty());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn summary_prefers_json_over_markdown() {
        let store = temp_store();
        let d = day("2024-02-01");
        store.write_summary_markdown(d, "fallback").unwrap();
        let summary = DailySummary {
            title: "FX".into(),
            paragraphs: vec!["p1".into()],
        };
        store.write_summary_json(d, &summary).unwrap();

        let resolved = store.resolve(ArtifactKind::Summary, Some(d)).unwrap();
        assert!(resolved.ends_with("daily_summary_2024-02-01.json"));
        assert_eq!(
            store.read_summary(d).unwrap(),
            Some(SummaryAttachment::Structured(summary))
        );
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn summary_dates_merge_both_formats() {
        let store = temp_store();
        store.write_summary_markdown(day("2024-02-01"), "a").unwrap();
        store.write_summary_markdown(day("2024-02-02"), "b").unwrap();
        store
            .write_summary_json(
                day("2024-02-02"),
                &DailySummary {
                    title: "t".into(),
                    paragraphs: vec![],
                },
            )
            .unwrap();
        assert_eq!(store.available_dates(ArtifactKind::Summary).len(), 2);
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn gold_roundtrip_and_no_tmp_left_behind() {
        let store = temp_store();
        let d = day("2024-01-02");
        let path = store.write_gold(d, &gold_rows()).unwrap();

        assert_eq!(store.read_gold(&path).unwrap(), gold_rows());
        let leftovers: Vec<_> = fs::read_dir(store.dir(ArtifactKind::Gold))
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn empty_silver_is_refused() {
        let store = temp_store();
        let err = store.write_silver(day("2024-01-02"), &[]).unwrap_err();
        assert!(matches!(err, StoreError::EmptyArtifact { .. }));
        assert!(store.resolve(ArtifactKind::Silver, None).is_none());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn raw_payload_is_kept_verbatim() {
        let store = temp_store();
        let payload = serde_json::json!({"result": "success", "conversion_rates": {"USD": 1}});
        let path = store.write_raw(day("2024-01-02"), &payload).unwrap();
        assert_eq!(store.read_raw(&path).unwrap(), payload);
        let _ = fs::remove_dir_all(store.root());
    }
}
