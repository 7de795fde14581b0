//! Extraction of GraphQL documents from tagged template literals.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use apollo_compiler::ast;
use tracing::{debug, warn};

use super::diagnostics::collect_diagnostics;
use super::position::{ResolvedTemplateInfo, TemplateTextBuilder};
use super::resolver::{
    blank_duplicate_fragments, compose_document_text, fragment_sources, skip_ignored,
    DocumentResolver, FragmentRegistry, FragmentSource,
};
use crate::errors::{ErrorLocation, ErrorWithLocation};
use crate::host::{
    resolve_relative_module, HostLanguage, ImportCondition, ParsedSource, SourceProvider,
    TemplateLiteral,
};

/// Options controlling extraction and fragment resolution.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub remove_duplicated_fragments: bool,
    pub enabled_global_fragments: bool,
    /// Import a file must declare for its literals to be extracted.
    pub tag_import: Option<ImportCondition>,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            remove_duplicated_fragments: true,
            enabled_global_fragments: false,
            tag_import: None,
        }
    }
}

/// A literal recognized as an embedded document.
#[derive(Debug, Clone)]
pub struct ExtractedTemplate {
    pub file_name: String,
    /// Full text of the host file.
    pub source: Arc<str>,
    pub template: TemplateLiteral,
    /// The literal's own document text, with interpolations substituted.
    pub text: String,
    pub info: ResolvedTemplateInfo,
}

impl ExtractedTemplate {
    /// Location covering the whole literal.
    pub fn template_location(&self) -> ErrorLocation {
        self.location(self.template.start, self.template.end)
    }

    /// Location of a span of resolved document text, mapped to the host
    /// source. `None` when the span starts in another literal's text.
    pub fn locate(&self, start: usize, end: usize) -> Option<ErrorLocation> {
        let start_pos = self.info.source_position(start);
        if start_pos.is_in_other_expression {
            return None;
        }
        let end_pos = self.info.source_position(end.max(start));
        let end = if end_pos.is_in_other_expression || end_pos.pos < start_pos.pos {
            start_pos.pos
        } else {
            end_pos.pos
        };
        Some(self.location(start_pos.pos, end))
    }

    /// Like `locate`, but falls back to where the inlined text came from.
    pub fn locate_lenient(&self, start: usize, end: usize) -> ErrorLocation {
        self.locate(start, end).unwrap_or_else(|| {
            let pos = self.info.source_position(start).pos;
            self.location(pos, pos)
        })
    }

    fn location(&self, start: usize, end: usize) -> ErrorLocation {
        ErrorLocation {
            file_name: self.file_name.clone(),
            content: self.source.clone(),
            start,
            end,
        }
    }
}

/// A literal whose document parsed and resolved.
#[derive(Debug, Clone)]
pub struct ExtractSucceeded {
    pub template: ExtractedTemplate,
    /// Own text followed by every pulled fragment.
    pub resolved_text: String,
    pub document: ast::Document,
}

impl ExtractSucceeded {
    /// Definitions written in the literal itself, excluding interpolated and
    /// pulled ones.
    pub fn own_definitions(&self) -> impl Iterator<Item = &ast::Definition> {
        let info = &self.template.info;
        let text = self.resolved_text.as_str();
        self.document.definitions.iter().filter(move |definition| {
            definition_offset(definition)
                .map(|offset| {
                    let offset = skip_ignored(text, offset);
                    offset < info.own_len() && !info.source_position(offset).is_in_other_expression
                })
                .unwrap_or(false)
        })
    }
}

/// A literal that failed to parse or resolve.
#[derive(Debug, Clone)]
pub struct ExtractFailed {
    pub template: ExtractedTemplate,
    pub error: ErrorWithLocation,
}

/// Extraction outcome for one literal.
#[derive(Debug, Clone)]
pub enum ExtractFileEntry {
    Success(ExtractSucceeded),
    SyntaxError(ExtractFailed),
    ResolveError(ExtractFailed),
}

impl ExtractFileEntry {
    pub fn template(&self) -> &ExtractedTemplate {
        match self {
            ExtractFileEntry::Success(s) => &s.template,
            ExtractFileEntry::SyntaxError(f) | ExtractFileEntry::ResolveError(f) => &f.template,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.template().file_name
    }

    pub fn as_success(&self) -> Option<&ExtractSucceeded> {
        match self {
            ExtractFileEntry::Success(s) => Some(s),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorWithLocation> {
        match self {
            ExtractFileEntry::Success(_) => None,
            ExtractFileEntry::SyntaxError(f) | ExtractFileEntry::ResolveError(f) => Some(&f.error),
        }
    }
}

/// Every extraction outcome of one pass, in source order.
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub file_entries: Vec<ExtractFileEntry>,
}

impl ExtractResult {
    pub fn successes(&self) -> impl Iterator<Item = &ExtractSucceeded> {
        self.file_entries.iter().filter_map(ExtractFileEntry::as_success)
    }

    pub fn pickup_errors(&self) -> Vec<ErrorWithLocation> {
        self.file_entries
            .iter()
            .filter_map(|entry| entry.error().cloned())
            .collect()
    }
}

/// The single definition a document is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DominantDefinition {
    Operation {
        operation_type: ast::OperationType,
        name: Option<String>,
    },
    Fragment {
        name: String,
    },
    /// More than one executable definition.
    Complex,
}

impl DominantDefinition {
    /// Operation or fragment name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            DominantDefinition::Operation { name, .. } => name.as_deref(),
            DominantDefinition::Fragment { name } => Some(name),
            DominantDefinition::Complex => None,
        }
    }

    /// `query`, `mutation`, `subscription`, `fragment` or `complex`.
    pub fn kind(&self) -> &'static str {
        match self {
            DominantDefinition::Operation { operation_type, .. } => operation_type_name(*operation_type),
            DominantDefinition::Fragment { .. } => "fragment",
            DominantDefinition::Complex => "complex",
        }
    }
}

pub fn operation_type_name(operation_type: ast::OperationType) -> &'static str {
    match operation_type {
        ast::OperationType::Query => "query",
        ast::OperationType::Mutation => "mutation",
        ast::OperationType::Subscription => "subscription",
    }
}

/// Classify a document by its own definitions.
///
/// Returns `None` when the literal defines nothing itself.
pub fn get_dominant_definition(entry: &ExtractSucceeded) -> Option<DominantDefinition> {
    let mut operations = Vec::new();
    let mut fragments = Vec::new();
    for definition in entry.own_definitions() {
        match definition {
            ast::Definition::OperationDefinition(op) => operations.push(op),
            ast::Definition::FragmentDefinition(fragment) => fragments.push(fragment),
            _ => {}
        }
    }

    match (operations.as_slice(), fragments.as_slice()) {
        ([], []) => None,
        ([op], []) => Some(DominantDefinition::Operation {
            operation_type: op.operation_type,
            name: op.name.as_ref().map(|n| n.to_string()),
        }),
        ([], [fragment]) => Some(DominantDefinition::Fragment {
            name: fragment.name.to_string(),
        }),
        _ => Some(DominantDefinition::Complex),
    }
}

fn definition_offset(definition: &ast::Definition) -> Option<usize> {
    let location = match definition {
        ast::Definition::OperationDefinition(node) => node.location(),
        ast::Definition::FragmentDefinition(node) => node.location(),
        _ => None,
    };
    location.map(|loc| loc.offset())
}

/// A literal parsed but not yet resolved.
struct Parsed {
    template: ExtractedTemplate,
    document: ast::Document,
    duplicate: Option<ErrorWithLocation>,
}

enum Stage {
    Parsed(Parsed),
    Failed(ExtractFileEntry),
}

/// Finds embedded documents in host sources and resolves their fragments.
pub struct Extractor {
    host: Arc<dyn HostLanguage>,
    sources: Arc<dyn SourceProvider>,
    options: ExtractorOptions,
    local_fragments: FragmentRegistry,
}

impl Extractor {
    pub fn new(
        host: Arc<dyn HostLanguage>,
        sources: Arc<dyn SourceProvider>,
        options: ExtractorOptions,
    ) -> Self {
        Self {
            host,
            sources,
            options,
            local_fragments: FragmentRegistry::new(),
        }
    }

    /// Fragments from local schema extension documents.
    pub fn with_local_fragments(mut self, fragments: FragmentRegistry) -> Self {
        self.local_fragments = fragments;
        self
    }

    /// Extract every matching literal of `files`.
    ///
    /// `tag` limits extraction to literals tagged with that identifier;
    /// `None` extracts every template literal.
    pub fn extract(&self, files: &[String], tag: Option<&str>) -> ExtractResult {
        let mut cache = SourceCache::new(self.host.as_ref(), self.sources.as_ref());
        let mut stages = Vec::new();

        for file_name in files {
            let source = match cache.get(file_name) {
                Some(source) => source,
                None => continue,
            };
            if let Some(condition) = &self.options.tag_import {
                if !source.imports.iter().any(|decl| decl.matches(condition)) {
                    debug!("skipping {}: no matching tag import", file_name);
                    continue;
                }
            }

            for template in source.templates.iter().filter(|t| tag_matches(t, tag)) {
                let mut visiting = vec![(source.file_name.clone(), template.start)];
                let (text, info) = self.sanitize(&mut cache, &source, template, &mut visiting);
                let extracted = ExtractedTemplate {
                    file_name: source.file_name.clone(),
                    source: source.text.clone(),
                    template: template.clone(),
                    text,
                    info,
                };
                stages.push(self.parse_template(extracted));
            }
        }

        let registry = self.register_project_fragments(&mut stages);
        let resolver = DocumentResolver::new(
            self.options.enabled_global_fragments.then_some(&registry),
            &self.local_fragments,
        );

        let file_entries: Vec<_> = stages
            .into_iter()
            .map(|stage| match stage {
                Stage::Failed(entry) => entry,
                Stage::Parsed(parsed) => resolve_parsed(&resolver, parsed),
            })
            .collect();

        debug!(
            "extracted {} documents ({} failed)",
            file_entries.len(),
            file_entries.iter().filter(|e| e.error().is_some()).count()
        );
        ExtractResult { file_entries }
    }

    pub fn pickup_errors(&self, result: &ExtractResult) -> Vec<ErrorWithLocation> {
        result.pickup_errors()
    }

    pub fn get_dominant_definition(&self, entry: &ExtractSucceeded) -> Option<DominantDefinition> {
        get_dominant_definition(entry)
    }

    fn parse_template(&self, mut template: ExtractedTemplate) -> Stage {
        let mut document = match ast::Document::parse(template.text.as_str(), &template.file_name) {
            Ok(document) => document,
            Err(with_errors) => {
                let diagnostic = collect_diagnostics(&with_errors.errors, &template.text)
                    .into_iter()
                    .next();
                let (message, span) = match diagnostic {
                    Some(d) => (d.message, d.span),
                    None => ("Syntax error".to_string(), None),
                };
                let location = match span {
                    Some((start, end)) => template.locate_lenient(start, end),
                    None => template.template_location(),
                };
                let error = ErrorWithLocation::new(message, location);
                return Stage::Failed(ExtractFileEntry::SyntaxError(ExtractFailed { template, error }));
            }
        };

        if self.options.remove_duplicated_fragments {
            if let Some(blanked) = blank_duplicate_fragments(&document, &template.text) {
                if let Ok(reparsed) = ast::Document::parse(blanked.as_str(), &template.file_name) {
                    debug!("removed duplicated fragments in {}", template.file_name);
                    template.text = blanked;
                    document = reparsed;
                }
            }
        }

        Stage::Parsed(Parsed {
            template,
            document,
            duplicate: None,
        })
    }

    /// Build the project-wide fragment registry from every literal's own
    /// fragments, flagging name collisions where they are errors.
    fn register_project_fragments(&self, stages: &mut [Stage]) -> FragmentRegistry {
        let report_duplicates =
            self.options.enabled_global_fragments && !self.options.remove_duplicated_fragments;
        let mut registry = FragmentRegistry::new();

        for stage in stages.iter_mut() {
            let parsed = match stage {
                Stage::Parsed(parsed) => parsed,
                Stage::Failed(_) => continue,
            };
            let info = &parsed.template.info;
            let text = parsed.template.text.as_str();
            let own: HashSet<String> = parsed
                .document
                .definitions
                .iter()
                .filter_map(|definition| match definition {
                    ast::Definition::FragmentDefinition(fragment) => {
                        let offset = skip_ignored(text, fragment.location()?.offset());
                        (!info.source_position(offset).is_in_other_expression)
                            .then(|| fragment.name.to_string())
                    }
                    _ => None,
                })
                .collect();

            let fragments: Vec<FragmentSource> =
                fragment_sources(&parsed.document, &parsed.template.text, &parsed.template.file_name)
                    .into_iter()
                    .filter(|fragment| own.contains(&fragment.name))
                    .collect();

            for fragment in fragments {
                let name = fragment.name.clone();
                if !registry.insert(fragment) && report_duplicates && parsed.duplicate.is_none() {
                    let location = duplicate_location(parsed, &name);
                    parsed.duplicate = Some(ErrorWithLocation::new(
                        format!("Duplicated fragment name \"{}\".", name),
                        location,
                    ));
                }
            }
        }

        debug!("registered {} project fragments", registry.len());
        registry
    }

    /// Build a literal's document text, substituting interpolated references
    /// to other literals with their text.
    fn sanitize(
        &self,
        cache: &mut SourceCache<'_>,
        source: &Arc<ParsedSource>,
        template: &TemplateLiteral,
        visiting: &mut Vec<(String, usize)>,
    ) -> (String, ResolvedTemplateInfo) {
        let mut builder = TemplateTextBuilder::new(template.content_start, template.content_end);
        let mut cursor = template.content_start;

        for substitution in &template.substitutions {
            builder.push_text(source.slice(cursor, substitution.start));

            let target = substitution
                .reference
                .as_deref()
                .and_then(|name| self.resolve_reference(cache, source, name));
            match target {
                Some((target_source, target_template))
                    if !visiting.contains(&(target_source.file_name.clone(), target_template.start)) =>
                {
                    visiting.push((target_source.file_name.clone(), target_template.start));
                    let (text, _) = self.sanitize(cache, &target_source, &target_template, visiting);
                    visiting.pop();
                    builder.push_substituted(substitution.start, substitution.end, &text);
                }
                Some(_) => {
                    warn!(
                        "circular template reference in {} at offset {}",
                        source.file_name, substitution.start
                    );
                    builder.push_blank(substitution.len());
                }
                None => builder.push_blank(substitution.len()),
            }
            cursor = substitution.end;
        }

        builder.push_text(source.slice(cursor, template.content_end));
        builder.finish()
    }

    /// Follow an identifier to the literal it is bound to, in the same file
    /// or through a relative import.
    fn resolve_reference(
        &self,
        cache: &mut SourceCache<'_>,
        source: &Arc<ParsedSource>,
        name: &str,
    ) -> Option<(Arc<ParsedSource>, TemplateLiteral)> {
        if let Some(template) = source.template_by_binding(name) {
            return Some((source.clone(), template.clone()));
        }

        let (decl, imported) = source.import_for_local(name)?;
        let target_file = resolve_relative_module(
            self.sources.as_ref(),
            &source.file_name,
            &decl.module,
            self.host.file_extensions(),
        )?;
        let target = cache.get(&target_file)?;
        let template = target
            .templates
            .iter()
            .find(|t| t.exported && t.binding.as_deref() == Some(imported.as_str()))?
            .clone();
        Some((target, template))
    }
}

fn tag_matches(template: &TemplateLiteral, tag: Option<&str>) -> bool {
    match tag {
        Some(tag) => template.tag.as_deref() == Some(tag),
        None => true,
    }
}

fn duplicate_location(parsed: &Parsed, name: &str) -> ErrorLocation {
    super::resolver::fragment_definitions(&parsed.document)
        .filter(|fragment| fragment.name.as_str() == name)
        .find_map(|fragment| fragment.location())
        .and_then(|loc| parsed.template.locate(loc.offset(), loc.end_offset()))
        .unwrap_or_else(|| parsed.template.template_location())
}

fn resolve_parsed(resolver: &DocumentResolver<'_>, parsed: Parsed) -> ExtractFileEntry {
    let Parsed {
        template,
        document,
        duplicate,
    } = parsed;

    if let Some(error) = duplicate {
        return ExtractFileEntry::ResolveError(ExtractFailed { template, error });
    }

    let pulled = match resolver.resolve(&document) {
        Ok(pulled) => pulled,
        Err(missing) => {
            let location = match missing.span {
                Some((start, end)) => template.locate_lenient(start, end),
                None => template.template_location(),
            };
            let error = ErrorWithLocation::new(missing.message(), location);
            return ExtractFileEntry::ResolveError(ExtractFailed { template, error });
        }
    };

    if pulled.is_empty() {
        return ExtractFileEntry::Success(ExtractSucceeded {
            resolved_text: template.text.clone(),
            template,
            document,
        });
    }

    let resolved_text = compose_document_text(&template.text, &pulled);
    match ast::Document::parse(resolved_text.as_str(), &template.file_name) {
        Ok(document) => ExtractFileEntry::Success(ExtractSucceeded {
            template,
            resolved_text,
            document,
        }),
        Err(with_errors) => {
            let message = collect_diagnostics(&with_errors.errors, &resolved_text)
                .into_iter()
                .next()
                .map(|d| d.message)
                .unwrap_or_else(|| "Failed to compose the document with its fragments".to_string());
            let error = ErrorWithLocation::new(message, template.template_location());
            ExtractFileEntry::ResolveError(ExtractFailed { template, error })
        }
    }
}

/// Parsed host files of one extraction pass.
struct SourceCache<'a> {
    host: &'a dyn HostLanguage,
    sources: &'a dyn SourceProvider,
    parsed: HashMap<String, Option<Arc<ParsedSource>>>,
}

impl<'a> SourceCache<'a> {
    fn new(host: &'a dyn HostLanguage, sources: &'a dyn SourceProvider) -> Self {
        Self {
            host,
            sources,
            parsed: HashMap::new(),
        }
    }

    fn get(&mut self, file_name: &str) -> Option<Arc<ParsedSource>> {
        if let Some(cached) = self.parsed.get(file_name) {
            return cached.clone();
        }
        let parsed = self.load(file_name);
        self.parsed.insert(file_name.to_string(), parsed.clone());
        parsed
    }

    fn load(&self, file_name: &str) -> Option<Arc<ParsedSource>> {
        if !self.host.handles_file(file_name) {
            return None;
        }
        let text = self.sources.read(file_name)?;
        match self.host.parse(file_name, &text) {
            Ok(parsed) => {
                if parsed.has_parse_errors {
                    debug!("{} has syntax errors; extracting what parsed", file_name);
                }
                Some(Arc::new(parsed))
            }
            Err(e) => {
                warn!("failed to parse {}: {}", file_name, e);
                None
            }
        }
    }
}
