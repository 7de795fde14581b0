//! Schema validation of resolved documents.

use apollo_compiler::executable::{Field, Selection, SelectionSet};
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use apollo_compiler::{ast, ExecutableDocument, Node, Schema};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::{ErrorWithLocation, Severity};
use crate::extract::{collect_diagnostics, ExtractSucceeded, ExtractedTemplate};

/// Fragment-only literals are legal, so the unused fragment rule is dropped.
static UNUSED_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"must be used in an operation").expect("valid regex"));

const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// Validate one resolved document against the schema.
///
/// Diagnostics falling in text pulled from another literal are dropped; that
/// literal reports them itself.
pub fn validate_document(schema: &Valid<Schema>, entry: &ExtractSucceeded) -> Vec<ErrorWithLocation> {
    let template = &entry.template;
    let text = entry.resolved_text.as_str();

    match ExecutableDocument::parse_and_validate(schema, text, &template.file_name) {
        Ok(document) => located_warnings(schema, &document, template),
        Err(with_errors) => {
            let mut errors: Vec<ErrorWithLocation> = collect_diagnostics(&with_errors.errors, text)
                .into_iter()
                .filter(|d| !UNUSED_FRAGMENT.is_match(&d.message))
                .filter_map(|d| match d.span {
                    Some((start, end)) => {
                        let location = template.locate(start, end);
                        if location.is_none() {
                            debug!("suppressed diagnostic in inlined text: {}", d.message);
                        }
                        location.map(|loc| ErrorWithLocation::new(d.message, loc))
                    }
                    None => Some(ErrorWithLocation::new(d.message, template.template_location())),
                })
                .collect();
            if errors.is_empty() {
                // Only filtered rules failed; the document is otherwise valid.
                errors = located_warnings(schema, &with_errors.partial, template);
            }
            errors
        }
    }
}

fn located_warnings(
    schema: &Schema,
    document: &ExecutableDocument,
    template: &ExtractedTemplate,
) -> Vec<ErrorWithLocation> {
    deprecation_warnings(schema, document)
        .into_iter()
        .filter_map(|(message, (start, end))| {
            let location = template.locate(start, end)?;
            Some(ErrorWithLocation::new(message, location).with_severity(Severity::Warning))
        })
        .collect()
}

/// Uses of deprecated fields and enum values, with their spans.
fn deprecation_warnings(schema: &Schema, document: &ExecutableDocument) -> Vec<(String, (usize, usize))> {
    let mut walker = DeprecationWalker { schema, out: Vec::new() };
    for operation in document.operations.iter() {
        walker.selection_set(&operation.selection_set);
    }
    for fragment in document.fragments.values() {
        walker.selection_set(&fragment.selection_set);
    }
    walker.out
}

struct DeprecationWalker<'a> {
    schema: &'a Schema,
    out: Vec<(String, (usize, usize))>,
}

impl DeprecationWalker<'_> {
    fn selection_set(&mut self, selection_set: &SelectionSet) {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => {
                    self.field(selection_set.ty.as_str(), field);
                    self.selection_set(&field.selection_set);
                }
                Selection::InlineFragment(inline) => self.selection_set(&inline.selection_set),
                Selection::FragmentSpread(_) => {}
            }
        }
    }

    fn field(&mut self, parent_type: &str, field: &Node<Field>) {
        let Some(span) = span_of(field) else {
            return;
        };
        if let Some(reason) = deprecation_reason(&field.definition.directives) {
            self.out.push((
                format!("The field {}.{} is deprecated. {}", parent_type, field.name, reason),
                span,
            ));
        }
        for argument in &field.arguments {
            let Some(definition) = field.definition.argument_by_name(argument.name.as_str()) else {
                continue;
            };
            self.enum_value(definition.ty.inner_named_type().as_str(), &argument.value, span);
        }
    }

    fn enum_value(&mut self, type_name: &str, value: &ast::Value, span: (usize, usize)) {
        let Some(ExtendedType::Enum(enum_type)) = self.schema.types.get(type_name) else {
            return;
        };
        match value {
            ast::Value::Enum(name) => {
                let reason = enum_type
                    .values
                    .get(name)
                    .and_then(|definition| deprecation_reason(&definition.directives));
                if let Some(reason) = reason {
                    self.out.push((
                        format!("The enum value \"{}.{}\" is deprecated. {}", type_name, name, reason),
                        span,
                    ));
                }
            }
            ast::Value::List(items) => {
                for item in items {
                    self.enum_value(type_name, item, span);
                }
            }
            _ => {}
        }
    }
}

fn deprecation_reason(directives: &ast::DirectiveList) -> Option<String> {
    let directive = directives.get("deprecated")?;
    let reason = directive
        .specified_argument_by_name("reason")
        .and_then(|value| value.as_str())
        .unwrap_or(DEFAULT_DEPRECATION_REASON);
    Some(reason.to_string())
}

fn span_of<T>(node: &Node<T>) -> Option<(usize, usize)> {
    node.location().map(|loc| (loc.offset(), loc.end_offset()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Extractor, ExtractorOptions};
    use crate::host::{MemorySourceProvider, SourceProvider, TypeScriptHost};
    use std::sync::Arc;

    const SDL: &str = r#"
enum Color {
  RED
  GREEN @deprecated(reason: "Use RED")
}

type Query {
  hello: String!
  old: String @deprecated
  paint(colors: [Color!]): Boolean
}
"#;

    fn validate(source: &str) -> Vec<ErrorWithLocation> {
        let schema = Schema::parse_and_validate(SDL, "schema.graphql").unwrap();
        let provider = MemorySourceProvider::new().with_file("main.ts", source);
        let files = provider.file_names();
        let extractor = Extractor::new(
            Arc::new(TypeScriptHost::new()),
            Arc::new(provider),
            ExtractorOptions::default(),
        );
        let result = extractor.extract(&files, Some("gql"));
        let entry = result.successes().next().expect("one document");
        validate_document(&schema, entry)
    }

    #[test]
    fn test_valid_document() {
        assert!(validate("const q = gql`query Q { hello }`;").is_empty());
    }

    #[test]
    fn test_unknown_field_is_error() {
        let errors = validate("const q = gql`query Q { hoge }`;");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_error());
        assert!(errors[0].message.contains("hoge"));
    }

    #[test]
    fn test_fragment_only_document_is_valid() {
        assert!(validate("const f = gql`fragment F on Query { hello }`;").is_empty());
    }

    #[test]
    fn test_deprecated_field_warning() {
        let errors = validate("const q = gql`query Q { old }`;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Warning);
        assert_eq!(errors[0].message, "The field Query.old is deprecated. No longer supported");
    }

    #[test]
    fn test_deprecated_enum_value_in_list() {
        let errors = validate("const q = gql`query Q { paint(colors: [RED, GREEN]) }`;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "The enum value \"Color.GREEN\" is deprecated. Use RED");
    }

    #[test]
    fn test_deprecation_in_fragment_only_document() {
        let errors = validate("const f = gql`fragment F on Query { old }`;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Warning);
    }
}
