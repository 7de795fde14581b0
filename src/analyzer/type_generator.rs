//! Per-document type file generation.

use std::fs;
use std::path::{Path, PathBuf};

use apollo_compiler::{ast, Schema};
use heck::ToKebabCase;
use serde::Serialize;
use tracing::debug;

use crate::errors::ErrorWithLocation;
use crate::extract::{get_dominant_definition, DominantDefinition, ExtractResult};
use crate::typegen::{merge_addons, AddonContext, AddonFactory, ExtractedInfo, OutputSource, TypeGenVisitor};

const COMPLEX_DOCUMENT_MESSAGE: &str = "This document node has complex operations.";

/// Directory generated files are written to, next to their source file.
pub const GENERATED_DIR: &str = "__generated__";

/// A generated declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSourceFile {
    pub file_name: String,
    pub content: String,
}

/// Outcome of type generation for a project.
#[derive(Debug, Clone, Default)]
pub struct TypegenResult {
    /// Extraction errors followed by generation errors.
    pub errors: Vec<ErrorWithLocation>,
    pub output_source_files: Vec<OutputSourceFile>,
}

/// Generates one declaration file per operation or fragment document.
pub struct TypeGenerator<'a> {
    root: &'a Path,
    addon_factories: &'a [AddonFactory],
}

impl<'a> TypeGenerator<'a> {
    pub fn new(root: &'a Path, addon_factories: &'a [AddonFactory]) -> Self {
        Self { root, addon_factories }
    }

    pub fn generate_types(&self, extracted: &ExtractResult, schema: &Schema) -> TypegenResult {
        let mut errors = extracted.pickup_errors();
        if !errors.is_empty() {
            debug!("found {} extraction errors", errors.len());
        }

        let visitor = TypeGenVisitor::new(schema);
        let mut output_source_files = Vec::new();

        for entry in extracted.successes() {
            let template = &entry.template;
            let name = match get_dominant_definition(entry) {
                None => continue,
                Some(DominantDefinition::Complex) => {
                    errors.push(ErrorWithLocation::new(
                        COMPLEX_DOCUMENT_MESSAGE,
                        template.template_location(),
                    ));
                    continue;
                }
                Some(dominant) => match dominant.name() {
                    Some(name) => name.to_string(),
                    None => continue,
                },
            };

            let output_file_name = output_file_name(&template.file_name, &name);
            let context = AddonContext {
                schema,
                extracted_info: ExtractedInfo {
                    file_name: &template.file_name,
                    source_text: &template.source,
                    template: &template.template,
                },
                output_file_name: &output_file_name,
            };
            let addon = merge_addons(self.addon_factories, &context);
            let mut source = OutputSource::new(output_file_name.clone());
            let targets: Vec<&ast::Definition> = entry.own_definitions().collect();

            match visitor.visit(&entry.document, &targets, &mut source, &addon) {
                Ok(()) => {
                    debug!(
                        "create type source file '{}' from '{}'",
                        self.relative(&output_file_name),
                        self.relative(&template.file_name)
                    );
                    output_source_files.push(OutputSourceFile {
                        file_name: output_file_name,
                        content: source.print(),
                    });
                }
                Err(error) => {
                    let location = match error.span {
                        Some((start, end)) => template.locate(start, end),
                        None => Some(template.template_location()),
                    };
                    match location {
                        Some(location) => errors.push(ErrorWithLocation::new(error.message, location)),
                        None => debug!("suppressed type error in inlined text: {}", error.message),
                    }
                }
            }
        }

        TypegenResult {
            errors,
            output_source_files,
        }
    }

    fn relative(&self, file_name: &str) -> String {
        Path::new(file_name)
            .strip_prefix(self.root)
            .unwrap_or_else(|_| Path::new(file_name))
            .display()
            .to_string()
    }
}

/// `<dir of source>/__generated__/<dash-cased name>.ts`
pub fn output_file_name(source_file: &str, name: &str) -> String {
    let dir = Path::new(source_file).parent().unwrap_or_else(|| Path::new(""));
    let path: PathBuf = dir.join(GENERATED_DIR).join(format!("{}.ts", name.to_kebab_case()));
    path.to_string_lossy().to_string()
}

/// Write generated files, creating their directories.
pub fn write_output_files(files: &[OutputSourceFile]) -> std::io::Result<()> {
    for file in files {
        let path = Path::new(&file.file_name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &file.content)?;
        debug!("wrote {}", file.file_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("main.ts", "MyQuery"), "__generated__/my-query.ts");
        assert_eq!(
            output_file_name("src/app/user.ts", "UserFragment"),
            "src/app/__generated__/user-fragment.ts"
        );
    }

    #[test]
    fn test_write_output_files() {
        let temp = TempDir::new().unwrap();
        let file_name = output_file_name(&temp.path().join("main.ts").to_string_lossy(), "MyQuery");
        let files = vec![OutputSourceFile {
            file_name: file_name.clone(),
            content: "export type MyQuery = {};\n".to_string(),
        }];
        write_output_files(&files).unwrap();
        assert_eq!(fs::read_to_string(file_name).unwrap(), "export type MyQuery = {};\n");
    }
}
