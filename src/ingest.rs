use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Defaults;
use crate::error::LoaderError;
use crate::samples::{MAX_COLUMNS, MIN_COLUMNS, RowProcessor};
use crate::store::ChadoStore;

pub type SampleMap = BTreeMap<String, i64>;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub column_count: usize,
    pub rows: usize,
    pub samples: SampleMap,
    pub warnings: Vec<String>,
    pub finished_at: String,
}

pub fn header_columns(header: &str) -> Result<usize, LoaderError> {
    let header = header.trim_end_matches(['\r', '\n']);
    if header.trim().is_empty() {
        return Err(LoaderError::MalformedFile(
            "the header line is empty".to_string(),
        ));
    }
    let count = header.split('\t').count();
    if count < MIN_COLUMNS {
        return Err(LoaderError::MalformedFile(format!(
            "the header has {count} columns but at least {MIN_COLUMNS} are required"
        )));
    }
    Ok(count)
}

fn read_error(line: usize, err: io::Error) -> LoaderError {
    if err.kind() == io::ErrorKind::InvalidData {
        LoaderError::MalformedFile(format!("line {line}: not valid UTF-8 text"))
    } else {
        LoaderError::Filesystem(format!("line {line}: {err}"))
    }
}

pub fn ingest<S, R>(
    store: &S,
    reader: R,
    defaults: &Defaults,
    sink: &dyn ProgressSink,
) -> Result<SampleMap, LoaderError>
where
    S: ChadoStore + ?Sized,
    R: BufRead,
{
    Ok(ingest_report(store, reader, defaults, sink)?.samples)
}

pub fn ingest_report<S, R>(
    store: &S,
    reader: R,
    defaults: &Defaults,
    sink: &dyn ProgressSink,
) -> Result<IngestReport, LoaderError>
where
    S: ChadoStore + ?Sized,
    R: BufRead,
{
    let start = Instant::now();
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()
        .map_err(|err| read_error(1, err))?
        .ok_or_else(|| LoaderError::MalformedFile("the file has no header line".to_string()))?;
    let column_count = header_columns(&header)?;
    let mut warnings = Vec::new();
    if column_count > MAX_COLUMNS {
        warn!(
            columns = column_count,
            "samples file has more than {MAX_COLUMNS} columns; the extra columns are ignored"
        );
        warnings.push(format!(
            "header has {column_count} columns; columns after {MAX_COLUMNS} are ignored"
        ));
    }
    sink.event(ProgressEvent {
        message: format!("phase=Header; {column_count} columns"),
        elapsed: None,
    });

    let mut processor = RowProcessor::new(store, defaults);
    let mut samples = SampleMap::new();
    let mut rows = 0;
    for (index, line) in lines.enumerate() {
        let line_number = index + 2;
        let line = line.map_err(|err| read_error(line_number, err))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields = line.split('\t').collect::<Vec<_>>();
        let processed = processor
            .process_row(line_number, &fields, column_count)
            .inspect_err(|err| warn!(line = line_number, error = %err, "sample row failed"))?;
        rows += 1;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; line {line_number} {} -> stock {}",
                processed.source_name, processed.sample_id
            ),
            elapsed: None,
        });
        if let Some(previous) = samples.insert(processed.source_name.clone(), processed.sample_id) {
            warn!(
                source = %processed.source_name,
                previous,
                current = processed.sample_id,
                "duplicate source name; keeping the later sample"
            );
            warnings.push(format!(
                "line {line_number}: source name {} replaces stock {previous} with stock {}",
                processed.source_name, processed.sample_id
            ));
        }
    }

    let elapsed = start.elapsed();
    info!(
        rows,
        samples = samples.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "samples file processed"
    );
    sink.event(ProgressEvent {
        message: format!("phase=Done; {rows} rows, {} samples", samples.len()),
        elapsed: Some(elapsed),
    });

    Ok(IngestReport {
        column_count,
        rows,
        samples,
        warnings,
        finished_at: chrono::Utc::now().to_rfc3339(),
    })
}
