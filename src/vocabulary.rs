use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::VocabularyToken;
use crate::error::LoaderError;
use crate::store::ChadoStore;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn resolve_term<S: ChadoStore + ?Sized>(
    store: &S,
    token: &VocabularyToken,
) -> Result<i64, LoaderError> {
    let ids = store.term_ids_by_accession(token)?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(LoaderError::VocabularyTermNotFound(token.to_string())),
        many => Err(LoaderError::AmbiguousVocabularyTerm {
            token: token.to_string(),
            count: many.len(),
        }),
    }
}

pub fn resolve_term_token<S: ChadoStore + ?Sized>(
    store: &S,
    raw: &str,
) -> Result<i64, LoaderError> {
    let token: VocabularyToken = raw.parse()?;
    resolve_term(store, &token)
}

pub fn normalize_organism_name(name: &str) -> String {
    WHITESPACE.replace_all(name.trim(), " ").into_owned()
}

pub fn resolve_organism<S: ChadoStore + ?Sized>(
    store: &S,
    name: &str,
) -> Result<i64, LoaderError> {
    let normalized = normalize_organism_name(name);
    let ids = store.organism_ids_by_name(&normalized)?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(LoaderError::OrganismNotFound(normalized)),
        many => Err(LoaderError::AmbiguousOrganism {
            name: normalized,
            count: many.len(),
        }),
    }
}

#[derive(Debug, Default)]
pub struct VocabularyCache {
    terms: HashMap<VocabularyToken, i64>,
    organisms: HashMap<String, i64>,
}

impl VocabularyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term<S: ChadoStore + ?Sized>(
        &mut self,
        store: &S,
        raw: &str,
    ) -> Result<i64, LoaderError> {
        let token: VocabularyToken = raw.parse()?;
        if let Some(id) = self.terms.get(&token) {
            return Ok(*id);
        }
        let id = resolve_term(store, &token)?;
        debug!(token = %token, id, "resolved vocabulary term");
        self.terms.insert(token, id);
        Ok(id)
    }

    pub fn organism<S: ChadoStore + ?Sized>(
        &mut self,
        store: &S,
        name: &str,
    ) -> Result<i64, LoaderError> {
        let normalized = normalize_organism_name(name);
        if let Some(id) = self.organisms.get(&normalized) {
            return Ok(*id);
        }
        let id = resolve_organism(store, &normalized)?;
        debug!(organism = %normalized, id, "resolved organism");
        self.organisms.insert(normalized, id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.terms.len() + self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organism_name_whitespace() {
        assert_eq!(normalize_organism_name("  Felis \t catus "), "Felis catus");
    }
}
