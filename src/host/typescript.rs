//! TypeScript host adapter using tree-sitter.

use std::sync::Arc;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use super::{HostLanguage, ImportDeclaration, ImportSpecifier, ParsedSource, Substitution, TemplateLiteral};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_statement
  source: (string) @import_source
) @import
"#;

pub struct TypeScriptHost {
    typescript: Language,
    tsx: Language,
}

impl TypeScriptHost {
    pub fn new() -> Self {
        Self {
            typescript: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tsx: tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    fn language_for(&self, file_name: &str) -> &Language {
        if file_name.ends_with(".tsx") {
            &self.tsx
        } else {
            &self.typescript
        }
    }

    fn create_parser(&self, language: &Language) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(language)?;
        Ok(parser)
    }

    fn extract_templates(&self, root: Node, source: &[u8]) -> Vec<TemplateLiteral> {
        let mut templates = Vec::new();
        let mut stack = vec![root];
        // pre-order walk so literals come out in source order
        while let Some(node) = stack.pop() {
            if node.kind() == "template_string" {
                templates.push(self.template_literal(node, source));
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        templates
    }

    fn template_literal(&self, node: Node, source: &[u8]) -> TemplateLiteral {
        let start = node.start_byte();
        let end = node.end_byte();

        let mut content_end = end;
        if let Some(last) = node.child(node.child_count().saturating_sub(1)) {
            if last.kind() == "`" && !last.is_missing() && last.start_byte() > start {
                content_end = last.start_byte();
            }
        }

        let mut substitutions = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "template_substitution" {
                continue;
            }
            let reference = child
                .named_child(0)
                .filter(|expr| expr.kind() == "identifier")
                .and_then(|expr| expr.utf8_text(source).ok())
                .map(|s| s.to_string());
            substitutions.push(Substitution {
                start: child.start_byte(),
                end: child.end_byte(),
                reference,
            });
        }

        // tagged template: `tag`...``
        let mut outer = node;
        let mut tag = None;
        if let Some(parent) = node.parent() {
            if parent.kind() == "call_expression"
                && parent
                    .child_by_field_name("arguments")
                    .map(|args| args.id() == node.id())
                    .unwrap_or(false)
            {
                tag = parent
                    .child_by_field_name("function")
                    .and_then(|f| f.utf8_text(source).ok())
                    .map(|s| s.to_string());
                outer = parent;
            }
        }

        let (binding, exported) = binding_of(outer, source);

        TemplateLiteral {
            start,
            end,
            content_start: (start + 1).min(end),
            content_end,
            tag,
            binding,
            exported,
            substitutions,
        }
    }

    fn extract_imports(
        &self,
        language: &Language,
        root: Node,
        source: &[u8],
    ) -> anyhow::Result<Vec<ImportDeclaration>> {
        let query = Query::new(language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, source);

        let mut imports = Vec::new();

        while let Some(m) = matches.next() {
            let mut module = String::new();
            let mut import_node = None;

            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                match name {
                    "import_source" => {
                        // Remove quotes from path
                        let raw = capture.node.utf8_text(source).unwrap_or("");
                        module = raw.trim_matches(|c| c == '"' || c == '\'').to_string();
                    }
                    "import" => import_node = Some(capture.node),
                    _ => {}
                }
            }

            if let Some(node) = import_node {
                imports.push(import_declaration(node, module, source));
            }
        }

        Ok(imports)
    }
}

impl Default for TypeScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLanguage for TypeScriptHost {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts", "cts"]
    }

    fn parse(&self, file_name: &str, text: &str) -> anyhow::Result<ParsedSource> {
        let language = self.language_for(file_name);
        let mut parser = self.create_parser(language)?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse TypeScript source: {}", file_name))?;
        let root = tree.root_node();
        let source = text.as_bytes();

        let templates = self.extract_templates(root, source);
        let imports = self.extract_imports(language, root, source)?;

        Ok(ParsedSource {
            file_name: file_name.to_string(),
            text: Arc::from(text),
            templates,
            imports,
            has_parse_errors: root.has_error(),
        })
    }
}

/// Find the variable a literal expression is assigned to.
fn binding_of(expr: Node, source: &[u8]) -> (Option<String>, bool) {
    let mut current = expr;
    // unwrap `(...)`, `x as T` and `x satisfies T`
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "parenthesized_expression" | "as_expression" | "satisfies_expression" | "non_null_expression" => {
                current = parent
            }
            _ => break,
        }
    }

    let declarator = match current.parent() {
        Some(p) if p.kind() == "variable_declarator" => p,
        _ => return (None, false),
    };
    let is_value = declarator
        .child_by_field_name("value")
        .map(|v| v.id() == current.id())
        .unwrap_or(false);
    if !is_value {
        return (None, false);
    }
    let name = declarator
        .child_by_field_name("name")
        .filter(|n| n.kind() == "identifier")
        .and_then(|n| n.utf8_text(source).ok())
        .map(|s| s.to_string());

    let exported = declarator
        .parent()
        .and_then(|decl| decl.parent())
        .map(|p| p.kind() == "export_statement")
        .unwrap_or(false);

    (name, exported)
}

fn import_declaration(node: Node, module: String, source: &[u8]) -> ImportDeclaration {
    let mut decl = ImportDeclaration::new(module);

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type" => decl.type_only = true,
            "import_clause" => read_import_clause(child, source, &mut decl),
            _ => {}
        }
    }
    decl
}

fn read_import_clause(clause: Node, source: &[u8], decl: &mut ImportDeclaration) {
    let text = |n: Node| n.utf8_text(source).unwrap_or("").to_string();

    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => decl.default_binding = Some(text(child)),
            "namespace_import" => {
                let mut inner = child.walk();
                let ident = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "identifier");
                decl.namespace = ident.map(text);
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let name = spec.child_by_field_name("name").map(text);
                    let alias = spec.child_by_field_name("alias").map(text);
                    if let Some(name) = name {
                        decl.named.push(ImportSpecifier {
                            name: name.trim_matches(|c| c == '"' || c == '\'').to_string(),
                            alias,
                        });
                    }
                }
            }
            _ => {}
        }
    }
}
