use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::error::LoaderError;
use crate::ingest::{IngestReport, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Verbose,
    Quiet,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &IngestReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn write_report(path: &Utf8Path, report: &IngestReport) -> Result<(), LoaderError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        std::fs::create_dir_all(parent.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("genoload-report")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(report)
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextProgress;

impl ProgressSink for TextProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SampleMap;

    #[test]
    fn report_is_written_atomically() {
        let temp = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(temp.path().join("out/samples.json")).unwrap();
        let report = IngestReport {
            column_count: 5,
            rows: 1,
            samples: SampleMap::from([("Ross".to_string(), 1)]),
            warnings: Vec::new(),
            finished_at: "2024-01-01T00:00:00+00:00".to_string(),
        };

        JsonOutput::write_report(&path, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path.as_std_path()).unwrap()).unwrap();
        assert_eq!(written["samples"]["Ross"], 1);
        assert_eq!(written["rows"], 1);
    }
}
