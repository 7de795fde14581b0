//! Project-level operations: manifest extraction, validation, reporting and
//! type generation.
//!
//! Every operation runs its own extraction pass; nothing is cached between
//! calls, so concurrent calls never share fragment registries.

mod factory;
mod markdown;
mod type_generator;
mod validation;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apollo_compiler::validation::Valid;
use apollo_compiler::Schema;
use tracing::{debug, info};

pub use factory::AnalyzerFactory;
pub use markdown::render_markdown;
pub use type_generator::{
    output_file_name, write_output_files, OutputSourceFile, TypeGenerator, TypegenResult, GENERATED_DIR,
};
pub use validation::validate_document;

use crate::config::{ProjectConfig, TagConfig};
use crate::errors::ErrorWithLocation;
use crate::extract::{ExtractResult, Extractor, ExtractorOptions, FragmentRegistry, ManifestOutput};
use crate::host::{HostLanguage, SourceProvider};
use crate::schema::SchemaProvider;
use crate::typegen::AddonFactory;

const NO_SCHEMA_MESSAGE: &str =
    "No GraphQL schema. Confirm the \"schema\" setting of your tsgql configuration.";

/// Outcome of `Analyzer::validate`.
#[derive(Debug, Clone, Default)]
pub struct ValidateResult {
    /// Extraction errors, validation errors and deprecation warnings.
    pub errors: Vec<ErrorWithLocation>,
    /// `None` when no schema could be built.
    pub schema: Option<Arc<Valid<Schema>>>,
}

/// Binds a configuration, a source provider and a schema provider.
pub struct Analyzer {
    config: ProjectConfig,
    root: PathBuf,
    host: Arc<dyn HostLanguage>,
    sources: Arc<dyn SourceProvider>,
    schema_provider: Arc<dyn SchemaProvider>,
    addon_factories: Vec<AddonFactory>,
}

impl Analyzer {
    pub fn new(
        config: ProjectConfig,
        root: impl Into<PathBuf>,
        host: Arc<dyn HostLanguage>,
        sources: Arc<dyn SourceProvider>,
        schema_provider: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            config,
            root: root.into(),
            host,
            sources,
            schema_provider,
            addon_factories: Vec::new(),
        }
    }

    pub fn with_addon_factories(mut self, addon_factories: Vec<AddonFactory>) -> Self {
        self.addon_factories = addon_factories;
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract every document and build the manifest. Failures are entries of
    /// the result, never errors.
    pub fn extract_to_manifest(&self) -> (ExtractResult, ManifestOutput) {
        let result = self.extract();
        let manifest = ManifestOutput::from_extract_result(&result);
        (result, manifest)
    }

    /// Validate every document against the current schema.
    pub async fn validate(&self) -> ValidateResult {
        let schema = match self.acquire_schema().await {
            Ok(schema) => schema,
            Err(errors) => return ValidateResult { errors, schema: None },
        };

        let result = self.extract();
        let mut errors = result.pickup_errors();
        for entry in result.successes() {
            errors.extend(validate_document(&schema, entry));
        }
        info!("validated {} documents, {} diagnostics", result.file_entries.len(), errors.len());

        ValidateResult {
            errors,
            schema: Some(schema),
        }
    }

    /// Render a markdown report. A previously extracted `manifest` is reused
    /// as is; otherwise the project is extracted first.
    pub fn report(
        &self,
        output_path: impl AsRef<Path>,
        manifest: Option<&ManifestOutput>,
    ) -> (Vec<ErrorWithLocation>, String) {
        let output_path = output_path.as_ref();
        match manifest {
            Some(manifest) => (Vec::new(), render_markdown(manifest, output_path)),
            None => {
                let (result, manifest) = self.extract_to_manifest();
                (result.pickup_errors(), render_markdown(&manifest, output_path))
            }
        }
    }

    /// Generate one declaration file per operation or fragment document.
    pub async fn typegen(&self) -> TypegenResult {
        let schema = match self.acquire_schema().await {
            Ok(schema) => schema,
            Err(errors) => {
                return TypegenResult {
                    errors,
                    output_source_files: Vec::new(),
                }
            }
        };

        let result = self.extract();
        TypeGenerator::new(&self.root, &self.addon_factories).generate_types(&result, &schema)
    }

    fn extract(&self) -> ExtractResult {
        let files = self.sources.file_names();
        debug!("extracting from {} files", files.len());
        self.extractor().extract(&files, self.config.tag_name())
    }

    fn extractor(&self) -> Extractor {
        let options = ExtractorOptions {
            remove_duplicated_fragments: self.config.remove_duplicated_fragments,
            enabled_global_fragments: self.config.enabled_global_fragments,
            tag_import: self.config.tag.as_ref().and_then(TagConfig::import_condition),
        };
        let extensions = self.schema_provider.extension_sources();
        let local_fragments = FragmentRegistry::from_graphql_sources(
            extensions
                .iter()
                .map(|source| (source.file_name.as_str(), source.text.as_str())),
        );
        Extractor::new(Arc::clone(&self.host), Arc::clone(&self.sources), options)
            .with_local_fragments(local_fragments)
    }

    /// The current schema, or the errors to report instead of any document
    /// diagnostics.
    async fn acquire_schema(&self) -> Result<Arc<Valid<Schema>>, Vec<ErrorWithLocation>> {
        let snapshot = self.schema_provider.schema().await;
        if let Some(error) = snapshot.error {
            return Err(vec![ErrorWithLocation::unlocated(error.to_string())]);
        }
        snapshot
            .schema
            .ok_or_else(|| vec![ErrorWithLocation::unlocated(NO_SCHEMA_MESSAGE)])
    }
}
