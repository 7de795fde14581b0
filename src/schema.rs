//! Schema acquisition.
//!
//! A `SchemaProvider` hands out the current schema (or none) plus the local
//! schema extension documents declared for the project. The schema is built
//! on each request so edits to the SDL are picked up by the next operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apollo_compiler::validation::Valid;
use apollo_compiler::{ast, Schema};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::SchemaError;
use crate::extract::collect_diagnostics;

/// A local schema extension document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSource {
    pub file_name: String,
    pub text: String,
}

/// The outcome of one schema request.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    /// `None` when no schema is configured, or it failed to build.
    pub schema: Option<Arc<Valid<Schema>>>,
    /// Every failure of one build folds into a single error.
    pub error: Option<SchemaError>,
}

impl SchemaSnapshot {
    fn failed(error: SchemaError) -> Self {
        Self {
            schema: None,
            error: Some(error),
        }
    }
}

/// Supplies the schema and local extension documents.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Build the current schema.
    async fn schema(&self) -> SchemaSnapshot;

    /// Local schema extension documents, for fragment lookup.
    fn extension_sources(&self) -> Vec<ExtensionSource>;
}

/// Build and validate a schema from SDL and extension documents.
///
/// Whitespace-only SDL means there is no schema. Fragments and operations in
/// extension documents are skipped here; only type-system definitions extend
/// the schema.
pub fn build_schema(sdl_path: &str, sdl: &str, extensions: &[ExtensionSource]) -> SchemaSnapshot {
    if sdl.trim().is_empty() {
        debug!("schema {} is empty", sdl_path);
        return SchemaSnapshot::default();
    }

    let mut builder = Schema::builder().adopt_orphan_extensions().parse(sdl, sdl_path);
    let mut failed_paths = Vec::new();
    let mut failed_messages = Vec::new();

    for extension in extensions {
        let mut document = match ast::Document::parse(extension.text.as_str(), &extension.file_name) {
            Ok(document) => document,
            Err(with_errors) => {
                failed_paths.push(extension.file_name.clone());
                failed_messages.push(join_messages(&with_errors.errors, &extension.text));
                continue;
            }
        };
        document.definitions.retain(|definition| {
            !matches!(
                definition,
                ast::Definition::OperationDefinition(_) | ast::Definition::FragmentDefinition(_)
            )
        });
        if !document.definitions.is_empty() {
            builder = builder.parse(document.to_string(), &extension.file_name);
        }
    }

    if !failed_paths.is_empty() {
        return SchemaSnapshot::failed(SchemaError::InvalidExtension {
            path: failed_paths.join(", "),
            message: failed_messages.join("; "),
        });
    }

    match builder.build().and_then(|schema| schema.validate()) {
        Ok(schema) => SchemaSnapshot {
            schema: Some(Arc::new(schema)),
            error: None,
        },
        Err(with_errors) => SchemaSnapshot::failed(SchemaError::Invalid {
            path: sdl_path.to_string(),
            message: join_messages(&with_errors.errors, sdl),
        }),
    }
}

fn join_messages(errors: &apollo_compiler::validation::DiagnosticList, text: &str) -> String {
    collect_diagnostics(errors, text)
        .into_iter()
        .map(|d| d.message)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Schema held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    path: String,
    sdl: String,
    extensions: Vec<ExtensionSource>,
}

impl StaticSchemaProvider {
    pub fn new(sdl: impl Into<String>) -> Self {
        Self {
            path: "schema.graphql".to_string(),
            sdl: sdl.into(),
            extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.extensions.push(ExtensionSource {
            file_name: file_name.into(),
            text: text.into(),
        });
        self
    }
}

#[async_trait]
impl SchemaProvider for StaticSchemaProvider {
    async fn schema(&self) -> SchemaSnapshot {
        build_schema(&self.path, &self.sdl, &self.extensions)
    }

    fn extension_sources(&self) -> Vec<ExtensionSource> {
        self.extensions.clone()
    }
}

/// Schema read from SDL files on disk.
#[derive(Debug, Clone)]
pub struct FileSchemaProvider {
    schema_path: PathBuf,
    extension_paths: Vec<PathBuf>,
}

impl FileSchemaProvider {
    pub fn new<P: AsRef<Path>>(schema_path: P, extension_paths: Vec<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.as_ref().to_path_buf(),
            extension_paths,
        }
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }
}

#[async_trait]
impl SchemaProvider for FileSchemaProvider {
    async fn schema(&self) -> SchemaSnapshot {
        let path = self.schema_path.display().to_string();
        let sdl = match tokio::fs::read_to_string(&self.schema_path).await {
            Ok(sdl) => sdl,
            Err(e) => {
                return SchemaSnapshot::failed(SchemaError::Read {
                    path,
                    message: e.to_string(),
                })
            }
        };

        let mut extensions = Vec::new();
        for ext_path in &self.extension_paths {
            match tokio::fs::read_to_string(ext_path).await {
                Ok(text) => extensions.push(ExtensionSource {
                    file_name: ext_path.display().to_string(),
                    text,
                }),
                Err(e) => {
                    return SchemaSnapshot::failed(SchemaError::Read {
                        path: ext_path.display().to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }

        build_schema(&path, &sdl, &extensions)
    }

    fn extension_sources(&self) -> Vec<ExtensionSource> {
        self.extension_paths
            .iter()
            .filter_map(|path| match std::fs::read_to_string(path) {
                Ok(text) => Some(ExtensionSource {
                    file_name: path.display().to_string(),
                    text,
                }),
                Err(e) => {
                    warn!("cannot read schema extension {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SDL: &str = "type Query { hello: String! }";

    #[test]
    fn test_build_schema() {
        let snapshot = build_schema("schema.graphql", SDL, &[]);
        assert!(snapshot.error.is_none());
        let schema = snapshot.schema.unwrap();
        assert!(schema.types.contains_key("Query"));
    }

    #[test]
    fn test_empty_sdl_means_no_schema() {
        let snapshot = build_schema("schema.graphql", "  \n", &[]);
        assert!(snapshot.schema.is_none());
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_invalid_sdl() {
        let snapshot = build_schema("schema.graphql", "type Query { hello: Missing }", &[]);
        assert!(snapshot.schema.is_none());
        assert!(matches!(snapshot.error, Some(SchemaError::Invalid { .. })));
    }

    #[test]
    fn test_extensions_apply_type_definitions_only() {
        let ext = ExtensionSource {
            file_name: "local.graphql".to_string(),
            text: "extend type Query { local: Int }\nfragment L on Query { local }".to_string(),
        };
        let schema = build_schema("schema.graphql", SDL, &[ext]).schema.unwrap();
        let query = schema.get_object("Query").unwrap();
        assert!(query.fields.contains_key("local"));
    }

    #[test]
    fn test_invalid_extension() {
        let ext = ExtensionSource {
            file_name: "local.graphql".to_string(),
            text: "hogehoge".to_string(),
        };
        let snapshot = build_schema("schema.graphql", SDL, &[ext]);
        assert!(snapshot.schema.is_none());
        assert!(matches!(snapshot.error, Some(SchemaError::InvalidExtension { .. })));
    }

    #[test]
    fn test_invalid_extensions_fold_into_one_error() {
        let extensions = ["a.graphql", "b.graphql"].map(|name| ExtensionSource {
            file_name: name.to_string(),
            text: "hogehoge".to_string(),
        });
        let snapshot = build_schema("schema.graphql", SDL, &extensions);
        assert!(snapshot.schema.is_none());
        match snapshot.error {
            Some(SchemaError::InvalidExtension { path, .. }) => assert_eq!(path, "a.graphql, b.graphql"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_provider() {
        let temp = TempDir::new().unwrap();
        let schema_path = temp.path().join("schema.graphql");
        let ext_path = temp.path().join("local.graphql");
        std::fs::write(&schema_path, SDL).unwrap();
        std::fs::write(&ext_path, "fragment L on Query { hello }").unwrap();

        let provider = FileSchemaProvider::new(&schema_path, vec![ext_path]);
        assert!(provider.schema().await.schema.is_some());
        assert_eq!(provider.extension_sources().len(), 1);

        let missing = FileSchemaProvider::new(temp.path().join("missing.graphql"), vec![]);
        let snapshot = missing.schema().await;
        assert!(snapshot.schema.is_none());
        assert!(matches!(snapshot.error, Some(SchemaError::Read { .. })));
    }
}
