use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("invalid resolution mode: {0} (expected 0 select-only, 1 insert-only or 2 select-or-insert)")]
    InvalidMode(String),

    #[error("{record_type} not found in {table} but the mode does not allow inserting it")]
    RecordNotFound { record_type: String, table: String },

    #[error("{record_type} already exists in {table} but the mode only allows inserting it")]
    RecordAlreadyExists { record_type: String, table: String },

    #[error("{record_type} matched {count} records in {table}; the select values must be unique")]
    AmbiguousRecord {
        record_type: String,
        table: String,
        count: usize,
    },

    #[error("insert of {record_type} into {table} did not return a primary key")]
    InsertFailed { record_type: String, table: String },

    #[error("invalid vocabulary token {0:?}: expected DB:ACCESSION")]
    MalformedVocabularyToken(String),

    #[error("no vocabulary term found for {0}")]
    VocabularyTermNotFound(String),

    #[error("vocabulary term {token} matched {count} terms")]
    AmbiguousVocabularyTerm { token: String, count: usize },

    #[error("organism not found: {0}")]
    OrganismNotFound(String),

    #[error("organism name {name:?} matched {count} organisms")]
    AmbiguousOrganism { name: String, count: usize },

    #[error("malformed samples file: {0}")]
    MalformedFile(String),

    #[error("line {line}: expected at least 5 tab-separated fields, found {found}")]
    MalformedRow { line: usize, found: usize },

    #[error("line {line}: the {column} column is blank")]
    BlankField { line: usize, column: &'static str },

    #[error("sample and germplasm of {source_name} resolved to the same stock {stock_id}")]
    SampleIsGermplasm { source_name: String, stock_id: i64 },

    #[error("no default {0} configured")]
    MissingDefault(&'static str),

    #[error("invalid resolve request: {0}")]
    InvalidResolveRequest(String),

    #[error("the {record_type} must already exist but {id} was provided")]
    ParameterNotFound { record_type: &'static str, id: i64 },

    #[error("invalid input file type: {0} (expected vcf, matrix or legacy)")]
    InvalidInputFileType(String),

    #[error("loader parameter not set: {0}")]
    MissingParameter(&'static str),

    #[error("database error: {0}")]
    Database(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("missing config file genoload.json in current directory or user config directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl From<rusqlite::Error> for LoaderError {
    fn from(err: rusqlite::Error) -> Self {
        LoaderError::Database(err.to_string())
    }
}
