use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

use crate::error::LoaderError;

static VOCABULARY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:\s]+):(\S+)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ResolveMode {
    SelectOnly,
    InsertOnly,
    SelectOrInsert,
}

impl ResolveMode {
    pub fn code(self) -> i64 {
        match self {
            ResolveMode::SelectOnly => 0,
            ResolveMode::InsertOnly => 1,
            ResolveMode::SelectOrInsert => 2,
        }
    }

    pub fn allows_insert(self) -> bool {
        match self {
            ResolveMode::SelectOnly => false,
            ResolveMode::InsertOnly | ResolveMode::SelectOrInsert => true,
        }
    }
}

impl TryFrom<i64> for ResolveMode {
    type Error = LoaderError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResolveMode::SelectOnly),
            1 => Ok(ResolveMode::InsertOnly),
            2 => Ok(ResolveMode::SelectOrInsert),
            other => Err(LoaderError::InvalidMode(other.to_string())),
        }
    }
}

impl FromStr for ResolveMode {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "0" | "select-only" => Ok(ResolveMode::SelectOnly),
            "1" | "insert-only" => Ok(ResolveMode::InsertOnly),
            "2" | "select-or-insert" => Ok(ResolveMode::SelectOrInsert),
            _ => Err(LoaderError::InvalidMode(value.to_string())),
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveMode::SelectOnly => write!(f, "select-only"),
            ResolveMode::InsertOnly => write!(f, "insert-only"),
            ResolveMode::SelectOrInsert => write!(f, "select-or-insert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Int(value) => value.to_sql(),
            Value::Text(value) => value.to_sql(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn merged(&self, other: &Fields) -> Fields {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Fields(merged)
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .iter()
            .map(|(column, value)| format!("{column}={value}"))
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VocabularyToken {
    db: String,
    accession: String,
}

impl VocabularyToken {
    pub fn new(db: &str, accession: &str) -> Self {
        Self {
            db: db.to_string(),
            accession: accession.to_string(),
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn accession(&self) -> &str {
        &self.accession
    }
}

impl fmt::Display for VocabularyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.db, self.accession)
    }
}

impl FromStr for VocabularyToken {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let captures = VOCABULARY_TOKEN
            .captures(value.trim())
            .ok_or_else(|| LoaderError::MalformedVocabularyToken(value.to_string()))?;
        Ok(Self::new(&captures[1], &captures[2]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFileType {
    Vcf,
    Matrix,
    Legacy,
}

impl fmt::Display for InputFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFileType::Vcf => write!(f, "vcf"),
            InputFileType::Matrix => write!(f, "matrix"),
            InputFileType::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for InputFileType {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vcf" => Ok(InputFileType::Vcf),
            "matrix" => Ok(InputFileType::Matrix),
            "legacy" => Ok(InputFileType::Legacy),
            _ => Err(LoaderError::InvalidInputFileType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub sample_type: i64,
    pub germplasm_type: i64,
    pub relationship_type: i64,
    pub samples_mode: ResolveMode,
    pub germplasm_mode: ResolveMode,
    pub organism: Option<i64>,
}

impl Defaults {
    pub fn with_organism(mut self, organism_id: i64) -> Self {
        self.organism = Some(organism_id);
        self
    }
}
