use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::domain::{Defaults, InputFileType};
use crate::error::LoaderError;
use crate::ingest::{IngestReport, ProgressSink, SampleMap, ingest_report};
use crate::resolver::pkey_column;
use crate::store::ChadoStore;

pub struct GenotypesLoader<S: ChadoStore> {
    store: S,
    config: ResolvedConfig,
    organism_id: Option<i64>,
    project_id: Option<i64>,
    variant_subtype_id: Option<i64>,
    marker_subtype_id: Option<i64>,
    input_file_type: Option<InputFileType>,
    input_path: Option<Utf8PathBuf>,
    samples_path: Option<Utf8PathBuf>,
}

impl<S: ChadoStore> GenotypesLoader<S> {
    pub fn new(store: S, config: ResolvedConfig) -> Self {
        Self {
            store,
            config,
            organism_id: None,
            project_id: None,
            variant_subtype_id: None,
            marker_subtype_id: None,
            input_file_type: None,
            input_path: None,
            samples_path: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn set_organism_id(&mut self, organism_id: i64) -> Result<(), LoaderError> {
        self.require("organism", organism_id)?;
        self.organism_id = Some(organism_id);
        Ok(())
    }

    pub fn set_project_id(&mut self, project_id: i64) -> Result<(), LoaderError> {
        self.require("project", project_id)?;
        self.project_id = Some(project_id);
        Ok(())
    }

    pub fn set_variant_subtype_id(&mut self, cvterm_id: i64) -> Result<(), LoaderError> {
        self.require("cvterm", cvterm_id)?;
        self.variant_subtype_id = Some(cvterm_id);
        Ok(())
    }

    pub fn set_marker_subtype_id(&mut self, cvterm_id: i64) -> Result<(), LoaderError> {
        self.require("cvterm", cvterm_id)?;
        self.marker_subtype_id = Some(cvterm_id);
        Ok(())
    }

    pub fn set_input_file_type(&mut self, file_type: InputFileType) {
        self.input_file_type = Some(file_type);
    }

    pub fn set_input_path(&mut self, path: impl Into<Utf8PathBuf>) {
        self.input_path = Some(path.into());
    }

    pub fn set_samples_path(&mut self, path: impl Into<Utf8PathBuf>) {
        self.samples_path = Some(path.into());
    }

    pub fn organism_id(&self) -> Option<i64> {
        self.organism_id
    }

    pub fn project_id(&self) -> Option<i64> {
        self.project_id
    }

    pub fn variant_subtype_id(&self) -> Option<i64> {
        self.variant_subtype_id
    }

    pub fn marker_subtype_id(&self) -> Option<i64> {
        self.marker_subtype_id
    }

    pub fn input_file_type(&self) -> Option<InputFileType> {
        self.input_file_type
    }

    pub fn input_path(&self) -> Option<&Utf8Path> {
        self.input_path.as_deref()
    }

    pub fn samples_path(&self) -> Option<&Utf8Path> {
        self.samples_path.as_deref()
    }

    pub fn defaults(&self) -> Result<Defaults, LoaderError> {
        let defaults = self.config.defaults(&self.store)?;
        Ok(match self.organism_id {
            Some(organism_id) => defaults.with_organism(organism_id),
            None => defaults,
        })
    }

    pub fn process_samples(&self, sink: &dyn ProgressSink) -> Result<SampleMap, LoaderError> {
        Ok(self.process_samples_report(sink)?.samples)
    }

    pub fn process_samples_report(
        &self,
        sink: &dyn ProgressSink,
    ) -> Result<IngestReport, LoaderError> {
        let path = self
            .samples_path
            .as_deref()
            .ok_or(LoaderError::MissingParameter("samples file"))?;
        let defaults = self.defaults()?;
        info!(
            path = %path,
            samples_mode = %defaults.samples_mode,
            germplasm_mode = %defaults.germplasm_mode,
            "processing samples file"
        );
        let reader = open_samples(path)?;
        ingest_report(&self.store, reader, &defaults, sink)
    }

    fn require(&self, record_type: &'static str, id: i64) -> Result<(), LoaderError> {
        if self.store.record_exists(record_type, &pkey_column(record_type), id)? {
            Ok(())
        } else {
            Err(LoaderError::ParameterNotFound { record_type, id })
        }
    }
}

pub fn open_samples(path: &Utf8Path) -> Result<Box<dyn BufRead>, LoaderError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| LoaderError::Filesystem(format!("open {path}: {err}")))?;
    if path.extension() == Some("gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
