use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{Defaults, ResolveMode, VocabularyToken};
use crate::error::LoaderError;
use crate::store::ChadoStore;
use crate::vocabulary::resolve_term;

pub const CONFIG_FILE: &str = "genoload.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub terms: TermsConfig,
    #[serde(default)]
    pub modes: ModesConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TermsConfig {
    pub sample_type: TermSetting,
    pub germplasm_type: TermSetting,
    pub sample_germplasm_relationship_type: TermSetting,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TermSetting {
    Id(i64),
    Token(String),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ModesConfig {
    #[serde(default = "default_mode")]
    pub samples_mode: ModeSetting,
    #[serde(default = "default_mode")]
    pub germplasm_mode: ModeSetting,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            samples_mode: default_mode(),
            germplasm_mode: default_mode(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ModeSetting {
    Code(i64),
    Name(String),
}

impl ModeSetting {
    pub fn resolve(&self) -> Result<ResolveMode, LoaderError> {
        match self {
            ModeSetting::Code(code) => ResolveMode::try_from(*code),
            ModeSetting::Name(name) => name.parse(),
        }
    }
}

fn default_mode() -> ModeSetting {
    ModeSetting::Code(ResolveMode::SelectOrInsert.code())
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub sample_type: TermSetting,
    pub germplasm_type: TermSetting,
    pub relationship_type: TermSetting,
    pub samples_mode: ResolveMode,
    pub germplasm_mode: ResolveMode,
}

impl ResolvedConfig {
    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        let term = |setting: &TermSetting| match setting {
            TermSetting::Id(id) => id.to_string(),
            TermSetting::Token(token) => token.clone(),
        };
        match (namespace, key) {
            ("terms", "sample_type") => Some(term(&self.sample_type)),
            ("terms", "germplasm_type") => Some(term(&self.germplasm_type)),
            ("terms", "sample_germplasm_relationship_type") => {
                Some(term(&self.relationship_type))
            }
            ("modes", "samples_mode") => Some(self.samples_mode.to_string()),
            ("modes", "germplasm_mode") => Some(self.germplasm_mode.to_string()),
            _ => None,
        }
    }

    pub fn defaults<S: ChadoStore + ?Sized>(&self, store: &S) -> Result<Defaults, LoaderError> {
        Ok(Defaults {
            sample_type: resolve_setting(store, &self.sample_type)?,
            germplasm_type: resolve_setting(store, &self.germplasm_type)?,
            relationship_type: resolve_setting(store, &self.relationship_type)?,
            samples_mode: self.samples_mode,
            germplasm_mode: self.germplasm_mode,
            organism: None,
        })
    }
}

fn resolve_setting<S: ChadoStore + ?Sized>(
    store: &S,
    setting: &TermSetting,
) -> Result<i64, LoaderError> {
    match setting {
        TermSetting::Id(id) => Ok(*id),
        TermSetting::Token(raw) => {
            let token: VocabularyToken = raw.parse()?;
            resolve_term(store, &token)
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LoaderError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => Self::discover().ok_or(LoaderError::MissingConfig)?,
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LoaderError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ResolvedConfig, LoaderError> {
        let config: Config = serde_json::from_str(content)
            .map_err(|err| LoaderError::ConfigParse(err.to_string()))?;
        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LoaderError> {
        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            sample_type: config.terms.sample_type,
            germplasm_type: config.terms.germplasm_type,
            relationship_type: config.terms.sample_germplasm_relationship_type,
            samples_mode: config.modes.samples_mode.resolve()?,
            germplasm_mode: config.modes.germplasm_mode.resolve()?,
        })
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "genoload")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_legacy_codes() {
        let resolved = ConfigLoader::parse(
            r#"{
                "terms": {"sample_type": 9, "germplasm_type": 10,
                          "sample_germplasm_relationship_type": 11},
                "modes": {"samples_mode": 1, "germplasm_mode": 0}
            }"#,
        )
        .unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.samples_mode, ResolveMode::InsertOnly);
        assert_eq!(resolved.germplasm_mode, ResolveMode::SelectOnly);
        assert_eq!(resolved.sample_type, TermSetting::Id(9));
        assert_eq!(resolved.get("modes", "germplasm_mode").as_deref(), Some("select-only"));
        assert_eq!(resolved.get("terms", "germplasm_type").as_deref(), Some("10"));
        assert_eq!(resolved.get("terms", "unknown"), None);
    }

    #[test]
    fn modes_default_to_select_or_insert() {
        let resolved = ConfigLoader::parse(
            r#"{"terms": {"sample_type": 1, "germplasm_type": "CO_010:0000044",
                          "sample_germplasm_relationship_type": 3}}"#,
        )
        .unwrap();
        assert_eq!(resolved.samples_mode, ResolveMode::SelectOrInsert);
        assert_eq!(
            resolved.germplasm_type,
            TermSetting::Token("CO_010:0000044".to_string())
        );
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let err = ConfigLoader::parse(
            r#"{"terms": {"sample_type": 1, "germplasm_type": 2,
                          "sample_germplasm_relationship_type": 3},
                "modes": {"samples_mode": 5}}"#,
        )
        .unwrap_err();
        assert_matches!(err, LoaderError::InvalidMode(_));
    }
}
