use crate::session::{
    baseline::{BaselineEntry, PARAMETER_COLUMN, VALUE_COLUMN},
    records::{MergedRecord, RecordKind, Row, MERGED_COLUMNS},
    FileMarkers, SessionFileKind, SessionStore,
};
use ::csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

fn row_from_record(headers: &StringRecord, record: &StringRecord) -> Option<Row> {
    if record.iter().all(|cell| cell.is_empty()) {
        return None;
    }
    Some(
        headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect(),
    )
}

pub fn parse_rows<R: Read>(source: R) -> Result<Vec<Row>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(source);
    let headers = reader.headers().context("reading CSV header")?.clone();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("parsing CSV row {}", idx + 1))?;
        rows.extend(row_from_record(&headers, &record));
    }
    Ok(rows)
}

pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_rows(file).with_context(|| format!("parsing {}", path.display()))
}

pub fn write_merged_csv<W: Write>(records: &[MergedRecord], sink: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(sink);
    writer.write_record(MERGED_COLUMNS)?;
    for rec in records {
        writer.write_record(rec.to_cells())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_merged_json<W: Write>(records: &[MergedRecord], sink: W) -> Result<()> {
    serde_json::to_writer_pretty(sink, records)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergedFormat {
    Csv,
    Json,
}

pub fn export_merged(records: &[MergedRecord], path: &Path, format: MergedFormat) -> Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    match format {
        MergedFormat::Csv => write_merged_csv(records, file),
        MergedFormat::Json => write_merged_json(records, file),
    }
    .with_context(|| format!("writing {}", path.display()))?;
    debug!("exported {} merged row(s) to {}", records.len(), path.display());
    Ok(())
}

pub fn read_baseline_results(path: &Path) -> Result<Vec<BaselineEntry>> {
    Ok(read_rows(path)?
        .iter()
        .filter_map(BaselineEntry::from_row)
        .collect())
}

pub fn write_baseline_results(entries: &[BaselineEntry], path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record([PARAMETER_COLUMN, VALUE_COLUMN])?;
    for entry in entries {
        writer.write_record([entry.parameter.as_str(), entry.value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub hrv_files: Vec<PathBuf>,
    pub affect_files: Vec<PathBuf>,
    pub baseline_files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub fn load_session_files(
    paths: &[PathBuf],
    markers: &FileMarkers,
    store: &mut SessionStore,
) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    for path in paths {
        match markers.classify_path(path) {
            SessionFileKind::Hrv => {
                store.load_rows(RecordKind::Hrv, &read_rows(path)?);
                summary.hrv_files.push(path.clone());
            }
            SessionFileKind::Affect => {
                store.load_rows(RecordKind::Affect, &read_rows(path)?);
                summary.affect_files.push(path.clone());
            }
            SessionFileKind::Baseline => summary.baseline_files.push(path.clone()),
            SessionFileKind::Unknown => {
                warn!("skipping unrecognised session file {}", path.display());
                summary.skipped.push(path.clone());
            }
        }
    }
    Ok(summary)
}
