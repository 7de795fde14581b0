//! Core traits and facts for host-language analysis.
//!
//! The embedded-document logic only depends on the types in this file: a
//! parsed host file exposes its text, the template literals it contains and
//! its import declarations. Concrete parsers live behind `HostLanguage`.

use std::sync::Arc;

use super::ImportDeclaration;

/// An interpolation site `${...}` inside a template literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Offset of `$` in the host source.
    pub start: usize,
    /// Offset just past the closing `}`.
    pub end: usize,
    /// Identifier referenced by the expression, when it is a bare identifier.
    pub reference: Option<String>,
}

impl Substitution {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// A template literal found in host source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLiteral {
    /// Offset of the opening backtick.
    pub start: usize,
    /// Offset just past the closing backtick.
    pub end: usize,
    /// Offset where the literal's content starts (after the opening backtick).
    pub content_start: usize,
    /// Offset where the literal's content ends (before the closing backtick).
    pub content_end: usize,
    /// Text of the tag expression (`gql` in ``gql`...` ``), if any.
    pub tag: Option<String>,
    /// Variable the literal is assigned to (`const query = gql`...``).
    pub binding: Option<String>,
    /// Whether the binding is exported.
    pub exported: bool,
    /// Interpolation sites in source order.
    pub substitutions: Vec<Substitution>,
}

impl TemplateLiteral {
    /// Whether the literal has no interpolation sites.
    pub fn is_no_substitution(&self) -> bool {
        self.substitutions.is_empty()
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// A parsed host source file.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub file_name: String,
    pub text: Arc<str>,
    /// Template literals in source order (outer literals before nested ones).
    pub templates: Vec<TemplateLiteral>,
    pub imports: Vec<ImportDeclaration>,
    pub has_parse_errors: bool,
}

impl ParsedSource {
    /// Text of a byte range of the host source.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        self.text.get(start..end).unwrap_or("")
    }

    /// Innermost template literal containing `offset`.
    pub fn find_template_at(&self, offset: usize) -> Option<&TemplateLiteral> {
        self.templates
            .iter()
            .filter(|t| t.contains(offset))
            .min_by_key(|t| t.end - t.start)
    }

    /// Template literal assigned to the variable `name`.
    pub fn template_by_binding(&self, name: &str) -> Option<&TemplateLiteral> {
        self.templates
            .iter()
            .find(|t| t.binding.as_deref() == Some(name))
    }

    /// Import declaration binding `local` in this file, with the imported name.
    ///
    /// Returns `"default"` as the imported name for default imports.
    pub fn import_for_local(&self, local: &str) -> Option<(&ImportDeclaration, String)> {
        self.imports.iter().find_map(|decl| {
            if decl.default_binding.as_deref() == Some(local) {
                return Some((decl, "default".to_string()));
            }
            decl.named
                .iter()
                .find(|spec| spec.local_name() == local)
                .map(|spec| (decl, spec.name.clone()))
        })
    }
}

/// Host-language adapter.
///
/// Implementations turn raw source text into a `ParsedSource`. Each call
/// should create its own parser state; tree-sitter parsers are not `Sync`.
pub trait HostLanguage: Send + Sync {
    /// Returns the language identifier (e.g., "typescript").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this adapter handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file.
    ///
    /// Partial syntax errors still produce a `ParsedSource`; only a complete
    /// failure returns an error.
    fn parse(&self, file_name: &str, text: &str) -> anyhow::Result<ParsedSource>;

    /// Check if this adapter handles the given file name.
    fn handles_file(&self, file_name: &str) -> bool {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.file_extensions().contains(&ext))
            .unwrap_or(false)
    }
}
