//! Fragment resolution.
//!
//! A document is resolved by pulling every fragment it spreads, directly or
//! transitively, into the document text. Lookup order for a spread name:
//! 1. fragments already defined in the document
//! 2. the project-wide registry, when global fragments are enabled
//! 3. fragments from local schema extension files

use std::collections::{HashMap, HashSet, VecDeque};

use apollo_compiler::ast;

/// A fragment definition that can be inlined into other documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSource {
    pub name: String,
    /// Source text of the whole definition.
    pub text: String,
    /// Names spread by the definition, in source order.
    pub spreads: Vec<String>,
    /// File the definition comes from.
    pub file_name: String,
}

/// A fragment spread found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadRef {
    pub name: String,
    /// Byte span in the document text, when known.
    pub span: Option<(usize, usize)>,
}

/// A spread no lookup could satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFragment {
    pub name: String,
    /// Span of the spread in the document text. `None` when the spread sits
    /// inside a pulled fragment.
    pub span: Option<(usize, usize)>,
}

impl MissingFragment {
    pub fn message(&self) -> String {
        format!("Fragment \"{}\" is not found.", self.name)
    }
}

/// Fragment name to definition, first definition wins.
#[derive(Debug, Default, Clone)]
pub struct FragmentRegistry {
    fragments: HashMap<String, FragmentSource>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fragment. Returns `false` if the name was already taken;
    /// the existing definition is kept.
    pub fn insert(&mut self, fragment: FragmentSource) -> bool {
        if self.fragments.contains_key(&fragment.name) {
            return false;
        }
        self.fragments.insert(fragment.name.clone(), fragment);
        true
    }

    pub fn get(&self, name: &str) -> Option<&FragmentSource> {
        self.fragments.get(name)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Registry of the fragments defined in standalone `.graphql` documents.
    /// Unparseable documents contribute what could be recovered.
    pub fn from_graphql_sources<'s>(sources: impl IntoIterator<Item = (&'s str, &'s str)>) -> Self {
        let mut registry = Self::new();
        for (file_name, text) in sources {
            let document = match ast::Document::parse(text, file_name) {
                Ok(doc) => doc,
                Err(with_errors) => with_errors.partial,
            };
            for fragment in fragment_sources(&document, text, file_name) {
                registry.insert(fragment);
            }
        }
        registry
    }
}

/// Resolves spreads against the project and local extension registries.
pub struct DocumentResolver<'a> {
    project: Option<&'a FragmentRegistry>,
    extensions: &'a FragmentRegistry,
}

impl<'a> DocumentResolver<'a> {
    /// `project` is `None` when global fragments are disabled.
    pub fn new(project: Option<&'a FragmentRegistry>, extensions: &'a FragmentRegistry) -> Self {
        Self { project, extensions }
    }

    fn lookup(&self, name: &str) -> Option<&'a FragmentSource> {
        self.project
            .and_then(|registry| registry.get(name))
            .or_else(|| self.extensions.get(name))
    }

    /// Compute the fragments to append to `document`, in discovery order.
    pub fn resolve(&self, document: &ast::Document) -> Result<Vec<&'a FragmentSource>, MissingFragment> {
        let mut known: HashSet<String> = fragment_definitions(document)
            .map(|f| f.name.to_string())
            .collect();

        let mut queue: VecDeque<SpreadRef> = VecDeque::new();
        for definition in &document.definitions {
            if let Some(selections) = selection_set_of(definition) {
                let mut spreads = Vec::new();
                collect_spreads(selections, &mut spreads);
                queue.extend(spreads);
            }
        }

        let mut pulled = Vec::new();
        while let Some(spread) = queue.pop_front() {
            if known.contains(&spread.name) {
                continue;
            }
            let fragment = self.lookup(&spread.name).ok_or_else(|| MissingFragment {
                name: spread.name.clone(),
                span: spread.span,
            })?;
            known.insert(spread.name);
            queue.extend(fragment.spreads.iter().map(|name| SpreadRef {
                name: name.clone(),
                span: None,
            }));
            pulled.push(fragment);
        }
        Ok(pulled)
    }
}

/// Append pulled fragments to a document's own text.
pub fn compose_document_text(own_text: &str, fragments: &[&FragmentSource]) -> String {
    let mut text = own_text.to_string();
    for fragment in fragments {
        text.push('\n');
        text.push_str(&fragment.text);
    }
    text
}

/// Blank every fragment definition repeating an earlier name.
///
/// Returns `None` if the document has no duplicates.
pub fn blank_duplicate_fragments(document: &ast::Document, text: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let mut blanked = text.to_string();
    let mut changed = false;

    for fragment in fragment_definitions(document) {
        if seen.insert(fragment.name.as_str()) {
            continue;
        }
        if let Some(loc) = fragment.location() {
            let (start, end) = (loc.offset(), loc.end_offset());
            if end <= blanked.len() && blanked.is_char_boundary(start) && blanked.is_char_boundary(end) {
                let spaces = " ".repeat(end - start);
                blanked.replace_range(start..end, &spaces);
                changed = true;
            }
        }
    }

    changed.then_some(blanked)
}

/// Inlinable sources for every fragment defined in `document`.
pub fn fragment_sources(document: &ast::Document, text: &str, file_name: &str) -> Vec<FragmentSource> {
    fragment_definitions(document)
        .filter_map(|fragment| {
            let loc = fragment.location()?;
            let body = text.get(loc.offset()..loc.end_offset())?.trim();
            let mut spreads = Vec::new();
            collect_spreads(&fragment.selection_set, &mut spreads);
            Some(FragmentSource {
                name: fragment.name.to_string(),
                text: body.to_string(),
                spreads: spreads.into_iter().map(|s| s.name).collect(),
                file_name: file_name.to_string(),
            })
        })
        .collect()
}

/// First offset at or after `offset` that is not a GraphQL ignored token
/// (whitespace, commas, comments).
pub fn skip_ignored(text: &str, offset: usize) -> usize {
    let mut pos = offset.min(text.len());
    let bytes = text.as_bytes();
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\n' | b'\r' | b',' => pos += 1,
            b'#' => {
                pos = text[pos..].find('\n').map(|i| pos + i).unwrap_or(bytes.len());
            }
            _ => break,
        }
    }
    pos
}

pub fn fragment_definitions(
    document: &ast::Document,
) -> impl Iterator<Item = &apollo_compiler::Node<ast::FragmentDefinition>> {
    document.definitions.iter().filter_map(|definition| match definition {
        ast::Definition::FragmentDefinition(fragment) => Some(fragment),
        _ => None,
    })
}

fn selection_set_of(definition: &ast::Definition) -> Option<&[ast::Selection]> {
    match definition {
        ast::Definition::OperationDefinition(op) => Some(op.selection_set.as_slice()),
        ast::Definition::FragmentDefinition(fragment) => Some(fragment.selection_set.as_slice()),
        _ => None,
    }
}

/// Collect fragment spreads in a selection set, recursively.
pub fn collect_spreads(selections: &[ast::Selection], out: &mut Vec<SpreadRef>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => collect_spreads(&field.selection_set, out),
            ast::Selection::FragmentSpread(spread) => out.push(SpreadRef {
                name: spread.fragment_name.to_string(),
                span: spread.location().map(|loc| (loc.offset(), loc.end_offset())),
            }),
            ast::Selection::InlineFragment(inline) => collect_spreads(&inline.selection_set, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ast::Document {
        ast::Document::parse(text, "test.graphql").unwrap()
    }

    fn registry(text: &str) -> FragmentRegistry {
        FragmentRegistry::from_graphql_sources([("frags.graphql", text)])
    }

    #[test]
    fn test_fragment_sources_keep_definition_text() {
        let text = "query Q { ...A }\nfragment A on Query { ...B hello }";
        let fragments = fragment_sources(&parse(text), text, "a.ts");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "fragment A on Query { ...B hello }");
        assert_eq!(fragments[0].spreads, vec!["B"]);
    }

    #[test]
    fn test_resolve_transitive_in_discovery_order() {
        let project = registry(
            "fragment A on Query { ...B }\nfragment B on Query { hello }\nfragment C on Query { hello }",
        );
        let extensions = FragmentRegistry::new();
        let resolver = DocumentResolver::new(Some(&project), &extensions);

        let pulled = resolver.resolve(&parse("query Q { ...A }")).unwrap();
        let names: Vec<_> = pulled.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_local_fragments_take_priority() {
        let project = registry("fragment A on Query { other }");
        let extensions = FragmentRegistry::new();
        let resolver = DocumentResolver::new(Some(&project), &extensions);

        let pulled = resolver
            .resolve(&parse("query Q { ...A }\nfragment A on Query { hello }"))
            .unwrap();
        assert!(pulled.is_empty());
    }

    #[test]
    fn test_disabled_global_uses_extensions_only() {
        let project = registry("fragment A on Query { hello }");
        let extensions = registry("fragment E on Query { hello }");
        let resolver = DocumentResolver::new(None, &extensions);

        let pulled = resolver.resolve(&parse("query Q { ...E }")).unwrap();
        assert_eq!(pulled[0].name, "E");

        let missing = resolver.resolve(&parse("query Q { ...A }")).unwrap_err();
        assert_eq!(missing.name, "A");
        assert!(missing.span.is_some());
        assert!(project.get("A").is_some());
    }

    #[test]
    fn test_missing_fragment_not_hidden_by_found_one() {
        let project = registry("fragment F1 on Query { hello }");
        let extensions = FragmentRegistry::new();
        let resolver = DocumentResolver::new(Some(&project), &extensions);

        let missing = resolver.resolve(&parse("query Q { ...F1, ...F2 }")).unwrap_err();
        assert_eq!(missing.name, "F2");
        assert!(missing.message().contains("F2"));
    }

    #[test]
    fn test_registry_first_wins() {
        let mut registry = FragmentRegistry::new();
        let frag = |text: &str| FragmentSource {
            name: "A".to_string(),
            text: text.to_string(),
            spreads: vec![],
            file_name: "a.ts".to_string(),
        };
        assert!(registry.insert(frag("first")));
        assert!(!registry.insert(frag("second")));
        assert_eq!(registry.get("A").unwrap().text, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_duplicate_fragments() {
        let text = "fragment A on Query { a }\nfragment A on Query { a }\nquery Q { ...A }";
        let blanked = blank_duplicate_fragments(&parse(text), text).unwrap();
        assert_eq!(blanked.len(), text.len());
        assert_eq!(blanked.matches("fragment A").count(), 1);
        assert!(parse(&blanked).definitions.len() == 2);

        let unique = "fragment A on Query { a }";
        assert!(blank_duplicate_fragments(&parse(unique), unique).is_none());
    }

    #[test]
    fn test_skip_ignored() {
        let text = "  ,\n# comment\n  query";
        assert_eq!(&text[skip_ignored(text, 0)..], "query");
        assert_eq!(skip_ignored(text, 100), text.len());
    }

    #[test]
    fn test_compose_document_text() {
        let f = FragmentSource {
            name: "A".to_string(),
            text: "fragment A on Query { a }".to_string(),
            spreads: vec![],
            file_name: "a.ts".to_string(),
        };
        assert_eq!(
            compose_document_text("query Q { ...A }", &[&f]),
            "query Q { ...A }\nfragment A on Query { a }"
        );
    }
}
