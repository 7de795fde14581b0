//! Project configuration.
//!
//! The configuration tells the analyzer which literals carry GraphQL, where
//! the schema lives, how fragments are resolved and how types are generated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::host::ImportCondition;

/// Configuration file names searched in a project directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["tsgql.yaml", ".tsgql.yaml", "tsgql.yml"];

/// Top-level project configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Schema SDL file, relative to the project root.
    #[serde(default)]
    pub schema: String,
    /// Tag identifying embedded documents. `None` matches every template literal.
    #[serde(default)]
    pub tag: Option<TagConfig>,
    /// Whether fragments defined anywhere in the project can be spread.
    #[serde(default)]
    pub enabled_global_fragments: bool,
    /// Coalesce fragments sharing a name instead of reporting them.
    #[serde(default = "default_true")]
    pub remove_duplicated_fragments: bool,
    /// Extra `.graphql` documents extending the schema and providing fragments.
    #[serde(default)]
    pub local_schema_extensions: Vec<String>,
    /// Glob patterns selecting source files (default: all).
    #[serde(default)]
    pub include: Vec<String>,
    /// Glob patterns for source files to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub typegen: TypegenConfig,
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            schema: String::new(),
            tag: None,
            enabled_global_fragments: false,
            remove_duplicated_fragments: true,
            local_schema_extensions: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            typegen: TypegenConfig::default(),
        }
    }
}

/// The tag convention: a bare identifier, or an identifier that must be
/// imported from a given module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagConfig {
    Name(String),
    Import {
        name: String,
        from: String,
        #[serde(default, rename = "isDefault")]
        is_default: Option<bool>,
    },
}

impl TagConfig {
    pub fn name(&self) -> &str {
        match self {
            TagConfig::Name(name) => name,
            TagConfig::Import { name, .. } => name,
        }
    }

    /// Import a file must contain for its literals to match, if constrained.
    pub fn import_condition(&self) -> Option<ImportCondition> {
        match self {
            TagConfig::Name(_) => None,
            TagConfig::Import {
                name,
                from,
                is_default,
            } => Some(ImportCondition {
                is_default: *is_default,
                name: Some(name.clone()),
                from: Some(from.clone()),
            }),
        }
    }
}

impl From<&str> for TagConfig {
    fn from(name: &str) -> Self {
        TagConfig::Name(name.to_string())
    }
}

/// Type generation settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TypegenConfig {
    /// Built-in addon names, applied in order.
    #[serde(default)]
    pub addons: Vec<String>,
    /// Custom scalar name -> TypeScript type, used by the `scalar-map` addon.
    #[serde(default)]
    pub scalars: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Find the configuration file in a project directory.
    pub fn discover(dir: &Path) -> Result<PathBuf, ConfigError> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| ConfigError::ConfigNotFound {
                dir: dir.to_path_buf(),
                candidates: DEFAULT_CONFIG_NAMES.join(", "),
            })
    }

    /// Check the fields that cannot be defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.trim().is_empty() {
            return Err(ConfigError::MissingSchema);
        }
        for addon in &self.typegen.addons {
            if !crate::typegen::addons::is_known_addon(addon) {
                return Err(ConfigError::UnknownAddon(addon.clone()));
            }
        }
        Ok(())
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag.as_ref().map(|t| t.name())
    }
}
