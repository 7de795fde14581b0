use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::Analyzer;
use crate::config::ProjectConfig;
use crate::errors::ConfigError;
use crate::host::{FsSourceProvider, HostLanguage, TypeScriptHost};
use crate::schema::FileSchemaProvider;
use crate::typegen::resolve_addon_factories;

/// Creates analyzers for projects on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyzerFactory;

impl AnalyzerFactory {
    pub fn new() -> Self {
        Self
    }

    /// Create an analyzer from a project directory (its configuration file
    /// is discovered) or from a configuration file path.
    pub fn create_from_project_path<P: AsRef<Path>>(&self, path: P) -> Result<Analyzer, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::ProjectNotFound(path.to_path_buf()));
        }

        let (root, config_path) = if path.is_dir() {
            (path.to_path_buf(), ProjectConfig::discover(path)?)
        } else {
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (root, path.to_path_buf())
        };

        let config = ProjectConfig::parse_file(&config_path)?;
        config.validate()?;
        let addon_factories = resolve_addon_factories(&config.typegen)?;

        let host = Arc::new(TypeScriptHost::new());
        let sources = FsSourceProvider::new(&root, host.file_extensions())
            .include(&config.include)
            .exclude(&config.exclude);
        let schema_provider = FileSchemaProvider::new(
            root.join(&config.schema),
            config
                .local_schema_extensions
                .iter()
                .map(|extension| root.join(extension))
                .collect(),
        );

        info!("loaded configuration {}", config_path.display());
        Ok(
            Analyzer::new(config, root, host, Arc::new(sources), Arc::new(schema_provider))
                .with_addon_factories(addon_factories),
        )
    }
}
