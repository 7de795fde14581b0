//! Conversion of GraphQL parser and validator diagnostics into offsets.

use apollo_compiler::diagnostic::ToCliReport;
use apollo_compiler::validation::DiagnosticList;

/// A GraphQL diagnostic with its span in the document text it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphqlDiagnostic {
    pub message: String,
    /// Byte span in the document text.
    pub span: Option<(usize, usize)>,
}

/// Flatten a diagnostic list. Spans are the parser's byte offsets into `text`,
/// clamped to its length.
pub fn collect_diagnostics(errors: &DiagnosticList, text: &str) -> Vec<GraphqlDiagnostic> {
    errors
        .iter()
        .map(|diagnostic| {
            let span = diagnostic.error.location().map(|location| {
                let start = location.offset().min(text.len());
                let end = location.end_offset().clamp(start, text.len());
                (start, end)
            });
            GraphqlDiagnostic {
                message: diagnostic.error.to_string(),
                span,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apollo_compiler::ast;

    #[test]
    fn test_syntax_error_has_span() {
        let text = "query Q {\n  hello\n";
        let errors = ast::Document::parse(text, "q.graphql").unwrap_err().errors;
        let diagnostics = collect_diagnostics(&errors, text);

        assert!(!diagnostics.is_empty());
        let (start, end) = diagnostics[0].span.unwrap();
        assert!(start <= end && end <= text.len());
        assert!(!diagnostics[0].message.is_empty());
    }

    #[test]
    fn test_span_is_in_bytes_after_multibyte_text() {
        let text = "query Q($s: String = \"ééééé\") { hello ) }";
        let errors = ast::Document::parse(text, "q.graphql").unwrap_err().errors;
        let diagnostics = collect_diagnostics(&errors, text);

        let (start, _) = diagnostics[0].span.unwrap();
        assert!(text[start..].starts_with(") }"), "{:?}", &text[start..]);
    }
}
