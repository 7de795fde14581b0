//! Import declarations: matching, merging and binding removal.

use std::fmt;

/// A single `{ name as alias }` element of a named import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    /// Exported name in the source module.
    pub name: String,
    /// Local alias, if renamed.
    pub alias: Option<String>,
}

impl ImportSpecifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// The binding introduced in the importing file.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An `import ... from "module"` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportDeclaration {
    pub module: String,
    pub default_binding: Option<String>,
    pub named: Vec<ImportSpecifier>,
    pub namespace: Option<String>,
    pub type_only: bool,
}

/// Condition for `ImportDeclaration::matches`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCondition {
    /// `Some(true)`: only default bindings match. `Some(false)`: only named or
    /// namespace bindings match. `None`: any of the three.
    pub is_default: Option<bool>,
    pub name: Option<String>,
    pub from: Option<String>,
}

impl ImportDeclaration {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn has_bindings(&self) -> bool {
        self.default_binding.is_some() || !self.named.is_empty() || self.namespace.is_some()
    }

    /// Check whether this declaration satisfies `cond`.
    ///
    /// A condition with neither `name` nor `from` never matches. With only
    /// `from`, any import of that module matches.
    pub fn matches(&self, cond: &ImportCondition) -> bool {
        if cond.name.is_none() && cond.from.is_none() {
            return false;
        }
        if let Some(from) = &cond.from {
            if &self.module != from {
                return false;
            }
        }
        let name = match &cond.name {
            Some(name) => name,
            None => return true,
        };
        if !self.has_bindings() {
            return false;
        }

        let mut result = false;
        if cond.is_default != Some(false) {
            result = result || self.default_binding.as_ref() == Some(name);
        }
        if cond.is_default != Some(true) {
            result = result
                || self.named.iter().any(|s| s.local_name() == name)
                || self.namespace.as_ref() == Some(name);
        }
        result
    }

    /// Merge `head` into `self` when both import the same module.
    ///
    /// Declarations of different modules return `self` unchanged.
    pub fn merge(&self, head: &ImportDeclaration) -> ImportDeclaration {
        if self.module != head.module {
            return self.clone();
        }

        let default_binding = head
            .default_binding
            .clone()
            .or_else(|| self.default_binding.clone());

        // namespace imports are kept as they are
        let (named, namespace) = if self.namespace.is_some() || head.namespace.is_some() {
            (self.named.clone(), self.namespace.clone())
        } else {
            let mut named = self.named.clone();
            for spec in &head.named {
                if !named.iter().any(|s| s.local_name() == spec.local_name()) {
                    named.push(spec.clone());
                }
            }
            (named, None)
        };

        ImportDeclaration {
            module: self.module.clone(),
            default_binding,
            named,
            namespace,
            type_only: self.type_only && head.type_only,
        }
    }

    /// Drop the bindings whose local names are in `names`.
    ///
    /// Returns `None` when nothing is left to import.
    pub fn remove_names(&self, names: &[&str]) -> Option<ImportDeclaration> {
        let named: Vec<_> = self
            .named
            .iter()
            .filter(|s| !names.contains(&s.local_name()))
            .cloned()
            .collect();
        let default_binding = self
            .default_binding
            .clone()
            .filter(|d| !names.contains(&d.as_str()));
        let decl = ImportDeclaration {
            module: self.module.clone(),
            default_binding,
            named,
            namespace: self.namespace.clone(),
            type_only: self.type_only,
        };
        decl.has_bindings().then_some(decl)
    }
}

impl fmt::Display for ImportDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import ")?;
        if self.type_only {
            write!(f, "type ")?;
        }
        let mut clauses = Vec::new();
        if let Some(default) = &self.default_binding {
            clauses.push(default.clone());
        }
        if let Some(ns) = &self.namespace {
            clauses.push(format!("* as {}", ns));
        } else if !self.named.is_empty() {
            let specs: Vec<String> = self
                .named
                .iter()
                .map(|s| match &s.alias {
                    Some(alias) => format!("{} as {}", s.name, alias),
                    None => s.name.clone(),
                })
                .collect();
            clauses.push(format!("{{ {} }}", specs.join(", ")));
        }
        if clauses.is_empty() {
            write!(f, "\"{}\";", self.module)
        } else {
            write!(f, "{} from \"{}\";", clauses.join(", "), self.module)
        }
    }
}
