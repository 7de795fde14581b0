//! tsgql - GraphQL documents embedded in TypeScript.
//!
//! tsgql finds GraphQL documents written in tagged template literals,
//! resolves the fragments they spread across the project, validates them
//! against a schema and generates TypeScript declarations for them.
//!
//! # Architecture
//!
//! Data flows one way: source files -> extraction -> resolved documents ->
//! {validation, reporting, type generation}.
//!
//! - `host`: tree-sitter TypeScript parsing behind the `HostLanguage` trait
//! - `extract`: literal extraction, offset mapping and fragment resolution
//! - `schema`: schema building from SDL and local extensions
//! - `typegen`: the type generation visitor and its addons
//! - `analyzer`: project-level operations tying the above together
//! - `config`: YAML project configuration
//! - `report`: output formatting (pretty, JSON)

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extract;
pub mod host;
pub mod report;
pub mod schema;
pub mod typegen;

pub use analyzer::{Analyzer, AnalyzerFactory, OutputSourceFile, TypegenResult, ValidateResult};
pub use config::ProjectConfig;
pub use errors::{ConfigError, ErrorLocation, ErrorWithLocation, SchemaError, Severity};
pub use extract::{ExtractResult, Extractor, ManifestOutput};
pub use host::{FsSourceProvider, HostLanguage, MemorySourceProvider, SourceProvider, TypeScriptHost};
pub use schema::{FileSchemaProvider, SchemaProvider, StaticSchemaProvider};
pub use typegen::{AddonFactory, TypeGenAddon};
