//! Host-language access.
//!
//! This module provides:
//! - `HostLanguage`: the narrow capability interface the extractor depends on
//! - `TypeScriptHost`: the tree-sitter implementation for TypeScript/TSX
//! - `SourceProvider`: where project file text comes from (memory or disk)
//! - Import declaration utilities and offset/line conversion
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────┐     ┌─────────────────┐
//! │ SourceProvider  │────▶│ HostLanguage   │────▶│ ParsedSource    │
//! │ (memory, disk)  │     │ (tree-sitter)  │     │ (templates,     │
//! └─────────────────┘     └────────────────┘     │  imports)       │
//!                                                └─────────────────┘
//! ```

mod imports;
mod line_index;
mod sources;
mod traits;
mod typescript;

pub use imports::{ImportCondition, ImportDeclaration, ImportSpecifier};
pub use line_index::LineIndex;
pub use sources::{
    normalize_path, resolve_relative_module, FsSourceProvider, MemorySourceProvider,
    SourceProvider,
};
pub use traits::{HostLanguage, ParsedSource, Substitution, TemplateLiteral};
pub use typescript::TypeScriptHost;
