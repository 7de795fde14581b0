//! Markdown rendering of a manifest.

use std::fmt::Write as _;
use std::path::Path;

use crate::extract::{ManifestDocumentEntry, ManifestOutput};

const SECTIONS: &[(&str, &str)] = &[
    ("query", "Queries"),
    ("mutation", "Mutations"),
    ("subscription", "Subscriptions"),
    ("fragment", "Fragments"),
];

/// Render the documents of `manifest` grouped by kind. Source links are
/// relative to the directory of `output_path`.
pub fn render_markdown(manifest: &ManifestOutput, output_path: &Path) -> String {
    let base_dir = output_path.parent().unwrap_or_else(|| Path::new(""));
    let mut out = String::from("# Extracted GraphQL Operations\n");

    for (kind, title) in SECTIONS {
        let entries: Vec<&ManifestDocumentEntry> =
            manifest.documents.iter().filter(|doc| doc.kind == *kind).collect();
        if entries.is_empty() {
            continue;
        }
        let _ = write!(out, "\n## {}\n", title);
        for entry in entries {
            write_entry(&mut out, entry, base_dir);
        }
    }

    out.push_str("\n---\n\nExtracted by tsgql\n");
    out
}

fn write_entry(out: &mut String, entry: &ManifestDocumentEntry, base_dir: &Path) {
    let name = entry
        .operation_name
        .as_deref()
        .or(entry.fragment_name.as_deref())
        .unwrap_or("(anonymous)");
    let file = relative_path(&entry.file_name, base_dir);
    let start = entry.document_start;
    let end = entry.document_end;

    let _ = write!(out, "\n### {}\n\n```graphql\n{}", name, entry.body);
    if !entry.body.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "```\n\nFrom [{}:{}:{}]({}#L{}-L{})",
        file,
        start.line + 1,
        start.character + 1,
        file,
        start.line + 1,
        end.line + 1
    );
}

fn relative_path(file_name: &str, base_dir: &Path) -> String {
    let path = Path::new(file_name);
    let relative = if base_dir.as_os_str().is_empty() || path.is_relative() != base_dir.is_relative() {
        None
    } else {
        pathdiff::diff_paths(path, base_dir)
    };
    relative
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ManifestPosition;
    use pretty_assertions::assert_eq;

    fn entry(file_name: &str, kind: &str, name: &str, body: &str) -> ManifestDocumentEntry {
        let is_fragment = kind == "fragment";
        ManifestDocumentEntry {
            file_name: file_name.to_string(),
            document_start: ManifestPosition { line: 0, character: 17 },
            document_end: ManifestPosition { line: 0, character: 42 },
            operation_name: (!is_fragment).then(|| name.to_string()),
            fragment_name: is_fragment.then(|| name.to_string()),
            kind: kind.to_string(),
            body: body.to_string(),
            tag: Some("gql".to_string()),
        }
    }

    #[test]
    fn test_render_sections_in_order() {
        let manifest = ManifestOutput {
            documents: vec![
                entry("fragment.ts", "fragment", "MyFragment", "fragment MyFragment on Query {\n  hello\n}\n"),
                entry("main.ts", "query", "MyQuery", "query MyQuery {\n  hello\n}\n"),
            ],
        };
        let markdown = render_markdown(&manifest, Path::new("out.md"));
        assert_eq!(
            markdown,
            r#"# Extracted GraphQL Operations

## Queries

### MyQuery

```graphql
query MyQuery {
  hello
}
```

From [main.ts:1:18](main.ts#L1-L1)

## Fragments

### MyFragment

```graphql
fragment MyFragment on Query {
  hello
}
```

From [fragment.ts:1:18](fragment.ts#L1-L1)

---

Extracted by tsgql
"#
        );
    }

    #[test]
    fn test_links_are_relative_to_output_dir() {
        let manifest = ManifestOutput {
            documents: vec![entry("/prj/src/main.ts", "mutation", "Save", "mutation Save {\n  save\n}\n")],
        };
        let markdown = render_markdown(&manifest, Path::new("/prj/docs/out.md"));
        assert!(markdown.contains("## Mutations"));
        assert!(markdown.contains("From [../src/main.ts:1:18](../src/main.ts#L1-L1)"));
    }
}
