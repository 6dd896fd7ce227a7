use tracing::debug;

use crate::domain::{Defaults, Fields, ResolveMode};
use crate::error::LoaderError;
use crate::resolver::resolve;
use crate::store::ChadoStore;
use crate::vocabulary::VocabularyCache;

pub const MIN_COLUMNS: usize = 5;
pub const MAX_COLUMNS: usize = 7;

const GERMPLASM_TYPE_COLUMN: usize = 6;
const ORGANISM_COLUMN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    pub source_name: String,
    pub sample_name: String,
    pub sample_accession: String,
    pub germplasm_name: String,
    pub germplasm_accession: String,
    pub germplasm_type: Option<String>,
    pub organism: Option<String>,
}

impl SampleRow {
    pub fn parse(line: usize, fields: &[&str], column_count: usize) -> Result<Self, LoaderError> {
        if fields.len() < MIN_COLUMNS {
            return Err(LoaderError::MalformedRow {
                line,
                found: fields.len(),
            });
        }
        let optional = |column: usize| {
            if column_count < column {
                return None;
            }
            fields
                .get(column - 1)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let required = |index: usize, column: &'static str| {
            let value = fields[index].trim();
            if value.is_empty() {
                Err(LoaderError::BlankField { line, column })
            } else {
                Ok(value.to_string())
            }
        };

        Ok(Self {
            source_name: required(0, "source name")?,
            sample_name: fields[1].trim().to_string(),
            sample_accession: required(2, "sample accession")?,
            germplasm_name: fields[3].trim().to_string(),
            germplasm_accession: required(4, "germplasm accession")?,
            germplasm_type: optional(GERMPLASM_TYPE_COLUMN),
            organism: optional(ORGANISM_COLUMN),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedSample {
    pub source_name: String,
    pub sample_id: i64,
    pub germplasm_id: i64,
    pub link_id: i64,
}

pub struct RowProcessor<'a, S: ChadoStore + ?Sized> {
    store: &'a S,
    defaults: &'a Defaults,
    cache: VocabularyCache,
}

impl<'a, S: ChadoStore + ?Sized> RowProcessor<'a, S> {
    pub fn new(store: &'a S, defaults: &'a Defaults) -> Self {
        Self {
            store,
            defaults,
            cache: VocabularyCache::new(),
        }
    }

    pub fn process_row(
        &mut self,
        line: usize,
        fields: &[&str],
        column_count: usize,
    ) -> Result<ProcessedSample, LoaderError> {
        let row = SampleRow::parse(line, fields, column_count)?;
        self.process(row)
    }

    pub fn process(&mut self, row: SampleRow) -> Result<ProcessedSample, LoaderError> {
        let germplasm_type = match &row.germplasm_type {
            Some(token) => self.cache.term(self.store, token)?,
            None => self.defaults.germplasm_type,
        };
        let organism = match &row.organism {
            Some(name) => self.cache.organism(self.store, name)?,
            None => self
                .defaults
                .organism
                .ok_or(LoaderError::MissingDefault("organism"))?,
        };

        let sample_id = resolve(
            self.store,
            "Sample",
            "stock",
            self.defaults.samples_mode,
            &Fields::new()
                .with("uniquename", row.sample_accession.as_str())
                .with("organism_id", organism)
                .with("type_id", self.defaults.sample_type),
            &Fields::new().with("name", row.sample_name.as_str()),
        )?;

        let germplasm_id = resolve(
            self.store,
            "Germplasm",
            "stock",
            self.defaults.germplasm_mode,
            &Fields::new()
                .with("uniquename", row.germplasm_accession.as_str())
                .with("organism_id", organism)
                .with("type_id", germplasm_type),
            &Fields::new().with("name", row.germplasm_name.as_str()),
        )?;

        if sample_id == germplasm_id {
            return Err(LoaderError::SampleIsGermplasm {
                source_name: row.source_name,
                stock_id: sample_id,
            });
        }

        let link_id = resolve(
            self.store,
            "Sample-Germplasm Link",
            "stock_relationship",
            ResolveMode::SelectOrInsert,
            &Fields::new()
                .with("subject_id", sample_id)
                .with("type_id", self.defaults.relationship_type)
                .with("object_id", germplasm_id),
            &Fields::new(),
        )?;

        debug!(
            source = %row.source_name,
            sample_id, germplasm_id, link_id, "processed sample row"
        );
        Ok(ProcessedSample {
            source_name: row.source_name,
            sample_id,
            germplasm_id,
            link_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_minimal_row() {
        let row = SampleRow::parse(
            2,
            &["Ross", "Ross_110201", "Ross_110201", "Ross", "Ross"],
            5,
        )
        .unwrap();
        assert_eq!(row.source_name, "Ross");
        assert_eq!(row.germplasm_type, None);
        assert_eq!(row.organism, None);
    }

    #[test]
    fn optional_columns_follow_header() {
        let fields = [
            "Ash",
            "Ash_110203",
            "Ash_110203",
            "Ash",
            "Ash",
            "CO_010:0000044",
            "Felis silvestris",
        ];
        let full = SampleRow::parse(4, &fields, 7).unwrap();
        assert_eq!(full.germplasm_type.as_deref(), Some("CO_010:0000044"));
        assert_eq!(full.organism.as_deref(), Some("Felis silvestris"));

        // a six column header never reads the organism
        let six = SampleRow::parse(4, &fields, 6).unwrap();
        assert_eq!(six.organism, None);
    }

    #[test]
    fn blank_optional_columns_are_absent() {
        let row = SampleRow::parse(3, &["Prado", "P1", "P1", "Prado", "Prado", " ", ""], 7).unwrap();
        assert_eq!(row.germplasm_type, None);
        assert_eq!(row.organism, None);
    }

    #[test]
    fn short_row_is_malformed() {
        let err = SampleRow::parse(9, &["Tai", "Tai_1", "Tai_1"], 5).unwrap_err();
        assert_matches!(err, LoaderError::MalformedRow { line: 9, found: 3 });
    }

    #[test]
    fn blank_required_column_is_rejected() {
        let err = SampleRow::parse(5, &["Tai", "Tai_1", " ", "Tai", "Tai"], 5).unwrap_err();
        assert_matches!(
            err,
            LoaderError::BlankField { line: 5, column: "sample accession" }
        );
    }
}
