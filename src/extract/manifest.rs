//! Serializable snapshot of an extraction pass.

use serde::{Deserialize, Serialize};

use super::extractor::{get_dominant_definition, ExtractResult};
use crate::host::LineIndex;

/// A 0-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPosition {
    pub line: usize,
    pub character: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocumentEntry {
    pub file_name: String,
    pub document_start: ManifestPosition,
    pub document_end: ManifestPosition,
    pub operation_name: Option<String>,
    pub fragment_name: Option<String>,
    /// `query`, `mutation`, `subscription`, `fragment` or `complex`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The resolved document, printed.
    pub body: String,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOutput {
    pub documents: Vec<ManifestDocumentEntry>,
}

impl ManifestOutput {
    /// Manifest entries for every successfully extracted document that
    /// defines something itself.
    pub fn from_extract_result(result: &ExtractResult) -> Self {
        let documents = result
            .successes()
            .filter_map(|entry| {
                let dominant = get_dominant_definition(entry)?;
                let template = &entry.template;
                let index = LineIndex::new(&template.source);
                let position = |offset: usize| {
                    let (line, column) = index.line_column(offset);
                    ManifestPosition {
                        line: line - 1,
                        character: column - 1,
                    }
                };
                let (operation_name, fragment_name) = match dominant.kind() {
                    "fragment" => (None, dominant.name().map(String::from)),
                    _ => (dominant.name().map(String::from), None),
                };
                Some(ManifestDocumentEntry {
                    file_name: template.file_name.clone(),
                    document_start: position(template.template.start),
                    document_end: position(template.template.end),
                    operation_name,
                    fragment_name,
                    kind: dominant.kind().to_string(),
                    body: entry.document.to_string(),
                    tag: template.template.tag.clone(),
                })
            })
            .collect();
        Self { documents }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Extractor, ExtractorOptions};
    use crate::host::{MemorySourceProvider, SourceProvider, TypeScriptHost};
    use std::sync::Arc;

    #[test]
    fn test_manifest_entries() {
        let provider = MemorySourceProvider::new().with_file(
            "main.ts",
            "const q = gql`query MyQuery { hello }`;\n\nconst f = gql`fragment F on Query { hello }`;",
        );
        let files = provider.file_names();
        let extractor = Extractor::new(
            Arc::new(TypeScriptHost::new()),
            Arc::new(provider),
            ExtractorOptions::default(),
        );
        let manifest = ManifestOutput::from_extract_result(&extractor.extract(&files, Some("gql")));

        assert_eq!(manifest.documents.len(), 2);
        let query = &manifest.documents[0];
        assert_eq!(query.kind, "query");
        assert_eq!(query.operation_name.as_deref(), Some("MyQuery"));
        assert_eq!(query.fragment_name, None);
        assert_eq!(query.document_start, ManifestPosition { line: 0, character: 13 });
        assert_eq!(query.tag.as_deref(), Some("gql"));
        assert!(query.body.contains("hello"));

        let fragment = &manifest.documents[1];
        assert_eq!(fragment.kind, "fragment");
        assert_eq!(fragment.fragment_name.as_deref(), Some("F"));
        assert_eq!(fragment.document_start.line, 2);

        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"operationName\": \"MyQuery\""));
        assert!(json.contains("\"type\": \"fragment\""));
        assert_eq!(ManifestOutput::from_json(&json).unwrap(), manifest);
    }
}
