#![allow(dead_code)]

use std::cell::Cell;

use genotypes_loader::domain::{Defaults, Fields, ResolveMode, VocabularyToken};
use genotypes_loader::error::LoaderError;
use genotypes_loader::store::{ChadoStore, SqliteStore};

pub const CONFIG: &str = r#"{
    "terms": {
        "sample_type": "local:sample",
        "germplasm_type": "local:germplasm",
        "sample_germplasm_relationship_type": "local:is_extracted_from"
    },
    "modes": {"samples_mode": 2, "germplasm_mode": 2}
}"#;

pub fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

pub struct Terms {
    pub sample: i64,
    pub germplasm: i64,
    pub relationship: i64,
    pub co_010_accession: i64,
}

/// In-memory store holding the terms the cat fixtures refer to.
pub fn cats_store() -> (SqliteStore, Terms) {
    let store = SqliteStore::open_in_memory().unwrap();
    let terms = Terms {
        sample: store
            .add_term("stock_type", &VocabularyToken::new("local", "sample"), "sample")
            .unwrap(),
        germplasm: store
            .add_term(
                "stock_type",
                &VocabularyToken::new("local", "germplasm"),
                "germplasm",
            )
            .unwrap(),
        relationship: store
            .add_term(
                "stock_relationship",
                &VocabularyToken::new("local", "is_extracted_from"),
                "is_extracted_from",
            )
            .unwrap(),
        co_010_accession: store
            .add_term(
                "germplasmType",
                &VocabularyToken::new("CO_010", "0000044"),
                "accession",
            )
            .unwrap(),
    };
    (store, terms)
}

pub fn defaults(terms: &Terms, mode: ResolveMode) -> Defaults {
    Defaults {
        sample_type: terms.sample,
        germplasm_type: terms.germplasm,
        relationship_type: terms.relationship,
        samples_mode: mode,
        germplasm_mode: mode,
        organism: None,
    }
}

pub fn count_rows(store: &SqliteStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

pub fn stock_column(store: &SqliteStore, stock_id: i64, column: &str) -> i64 {
    store
        .connection()
        .query_row(
            &format!("SELECT {column} FROM stock WHERE stock_id = ?1"),
            [stock_id],
            |row| row.get(0),
        )
        .unwrap()
}

/// Delegates to a store while counting the calls made through it.
pub struct CountingStore<'a> {
    pub inner: &'a SqliteStore,
    pub selects: Cell<usize>,
    pub inserts: Cell<usize>,
    pub term_lookups: Cell<usize>,
    pub organism_lookups: Cell<usize>,
}

impl<'a> CountingStore<'a> {
    pub fn new(inner: &'a SqliteStore) -> Self {
        Self {
            inner,
            selects: Cell::new(0),
            inserts: Cell::new(0),
            term_lookups: Cell::new(0),
            organism_lookups: Cell::new(0),
        }
    }
}

impl ChadoStore for CountingStore<'_> {
    fn select_keys(
        &self,
        table: &str,
        pkey: &str,
        conditions: &Fields,
    ) -> Result<Vec<i64>, LoaderError> {
        self.selects.set(self.selects.get() + 1);
        self.inner.select_keys(table, pkey, conditions)
    }

    fn insert(
        &self,
        table: &str,
        pkey: &str,
        values: &Fields,
    ) -> Result<Option<i64>, LoaderError> {
        self.inserts.set(self.inserts.get() + 1);
        self.inner.insert(table, pkey, values)
    }

    fn term_ids_by_accession(&self, token: &VocabularyToken) -> Result<Vec<i64>, LoaderError> {
        self.term_lookups.set(self.term_lookups.get() + 1);
        self.inner.term_ids_by_accession(token)
    }

    fn organism_ids_by_name(&self, name: &str) -> Result<Vec<i64>, LoaderError> {
        self.organism_lookups.set(self.organism_lookups.get() + 1);
        self.inner.organism_ids_by_name(name)
    }

    fn record_exists(&self, table: &str, pkey: &str, id: i64) -> Result<bool, LoaderError> {
        self.inner.record_exists(table, pkey, id)
    }
}
