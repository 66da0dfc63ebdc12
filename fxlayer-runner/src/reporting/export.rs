//! CSV export of a loaded layer.

use super::{Layer, LayerRow, LayerTable};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write `rows` of `table` to `path` as CSV, replacing any existing file.
///
/// Columns follow the parquet layout of the layer.
pub fn write_layer_csv(path: &Path, table: &LayerTable, rows: &[LayerRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV {}", path.display()))?;
    write_csv(file, table, rows)
        .with_context(|| format!("Failed to write CSV {}", path.display()))
}

fn write_csv<W: Write>(out: W, table: &LayerTable, rows: &[LayerRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    match table.layer {
        Layer::Gold => {
            writer.write_record(["currency", table.value_column.as_str(), "last_update_utc"])?;
            for row in rows {
                writer.write_record([
                    row.currency.as_str(),
                    row.value.to_string().as_str(),
                    row.last_update_utc.as_str(),
                ])?;
            }
        }
        Layer::Silver => {
            writer.write_record(["base_currency", "target_currency", "rate", "last_update_utc"])?;
            for row in rows {
                writer.write_record([
                    table.base.as_str(),
                    row.currency.as_str(),
                    row.value.to_string().as_str(),
                    row.last_update_utc.as_str(),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
