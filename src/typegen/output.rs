//! The generated declaration file under construction.

use std::collections::HashSet;

use super::ts_type::TypeAliasDeclaration;
use crate::host::ImportDeclaration;

const HEADER: &str = "/* eslint-disable */\n/* This is an autogenerated file. Do not edit this file directly! */\n";

/// Accumulates the declarations of one generated file.
///
/// Imports of the same module are merged; every declared name is unique
/// within the file.
#[derive(Debug, Clone)]
pub struct OutputSource {
    file_name: String,
    imports: Vec<ImportDeclaration>,
    statements: Vec<TypeAliasDeclaration>,
    names: HashSet<String>,
}

impl OutputSource {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            imports: Vec::new(),
            statements: Vec::new(),
            names: HashSet::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Return `base` if unused, otherwise `base_1`, `base_2`, ... The returned
    /// name is reserved.
    pub fn unique_name(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 0;
        while self.names.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", base, n);
        }
        self.names.insert(candidate.clone());
        candidate
    }

    /// Add an import, merging it into an existing import of the same module.
    pub fn push_import(&mut self, import: ImportDeclaration) {
        for binding in local_names(&import) {
            self.names.insert(binding);
        }
        let mergeable = if import.namespace.is_none() {
            self.imports
                .iter()
                .position(|existing| existing.module == import.module && existing.namespace.is_none())
        } else {
            None
        };
        match mergeable {
            Some(i) => self.imports[i] = self.imports[i].merge(&import),
            None => self.imports.push(import),
        }
    }

    pub fn push_statement(&mut self, statement: TypeAliasDeclaration) {
        self.names.insert(statement.name.clone());
        self.statements.push(statement);
    }

    pub fn imports(&self) -> &[ImportDeclaration] {
        &self.imports
    }

    pub fn statements(&self) -> &[TypeAliasDeclaration] {
        &self.statements
    }

    /// Print the file: header, imports, then declarations.
    pub fn print(&self) -> String {
        let mut out = String::from(HEADER);
        for import in &self.imports {
            out.push_str(&import.to_string());
            out.push('\n');
        }
        for statement in &self.statements {
            out.push_str(&statement.to_string());
            out.push('\n');
        }
        out
    }
}

fn local_names(import: &ImportDeclaration) -> Vec<String> {
    let mut names: Vec<String> = import.named.iter().map(|s| s.local_name().to_string()).collect();
    names.extend(import.default_binding.clone());
    names.extend(import.namespace.clone());
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ImportSpecifier;
    use crate::typegen::TsType;
    use pretty_assertions::assert_eq;

    fn type_import(names: &[&str]) -> ImportDeclaration {
        ImportDeclaration {
            module: "graphql".to_string(),
            named: names.iter().map(|n| ImportSpecifier::new(*n)).collect(),
            type_only: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_unique_name() {
        let mut source = OutputSource::new("a.ts");
        assert_eq!(source.unique_name("X"), "X");
        assert_eq!(source.unique_name("X"), "X_1");
        assert_eq!(source.unique_name("X"), "X_2");
        source.push_import(type_import(&["Y"]));
        assert_eq!(source.unique_name("Y"), "Y_1");
    }

    #[test]
    fn test_imports_are_merged_and_printed_first() {
        let mut source = OutputSource::new("a.ts");
        source.push_statement(TypeAliasDeclaration::exported("Q", TsType::Object(vec![])));
        source.push_import(type_import(&["A"]));
        source.push_import(type_import(&["A", "B"]));

        assert_eq!(source.imports().len(), 1);
        assert_eq!(
            source.print(),
            "/* eslint-disable */\n/* This is an autogenerated file. Do not edit this file directly! */\nimport type { A, B } from \"graphql\";\nexport type Q = {};\n"
        );
    }
}
