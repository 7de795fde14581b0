//! TypeScript type model and printer.

use std::fmt;

const INDENT: &str = "    ";

/// A TypeScript type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsType {
    /// A keyword or type reference, with optional type arguments.
    Reference { name: String, args: Vec<TsType> },
    /// A string literal type (`"User"`).
    StringLiteral(String),
    /// `(T)[]`
    Array(Box<TsType>),
    Union(Vec<TsType>),
    Intersection(Vec<TsType>),
    Object(Vec<TsProperty>),
    /// Verbatim type text, as configured by the user.
    Raw(String),
}

/// A property of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsProperty {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
}

impl TsProperty {
    pub fn new(name: impl Into<String>, ty: TsType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

impl TsType {
    pub fn named(name: impl Into<String>) -> Self {
        TsType::Reference {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TsType>) -> Self {
        TsType::Reference {
            name: name.into(),
            args,
        }
    }

    pub fn any() -> Self {
        Self::named("any")
    }

    pub fn null() -> Self {
        Self::named("null")
    }

    pub fn array(item: TsType) -> Self {
        TsType::Array(Box::new(item))
    }

    /// `T | null`
    pub fn nullable(self) -> Self {
        match self {
            TsType::Union(mut members) => {
                if !members.contains(&TsType::null()) {
                    members.push(TsType::null());
                }
                TsType::Union(members)
            }
            other => TsType::Union(vec![other, TsType::null()]),
        }
    }

    /// Union of `members`, flattening nested unions. A single member is
    /// returned as is.
    pub fn union(members: Vec<TsType>) -> Self {
        let mut flat = Vec::new();
        for member in members {
            match member {
                TsType::Union(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            TsType::Union(flat)
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            TsType::Reference { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        arg.write(f, depth)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TsType::StringLiteral(value) => write!(f, "\"{}\"", escape(value)),
            TsType::Array(item) => {
                write!(f, "(")?;
                item.write(f, depth)?;
                write!(f, ")[]")
            }
            TsType::Union(members) => write_joined(f, members, " | ", depth, false),
            TsType::Intersection(members) => write_joined(f, members, " & ", depth, true),
            TsType::Object(props) => {
                if props.is_empty() {
                    return write!(f, "{{}}");
                }
                writeln!(f, "{{")?;
                for prop in props {
                    write!(f, "{}{}", INDENT.repeat(depth + 1), prop.name)?;
                    write!(f, "{}: ", if prop.optional { "?" } else { "" })?;
                    prop.ty.write(f, depth + 1)?;
                    writeln!(f, ";")?;
                }
                write!(f, "{}}}", INDENT.repeat(depth))
            }
            TsType::Raw(text) => write!(f, "{}", text),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    members: &[TsType],
    separator: &str,
    depth: usize,
    paren_unions: bool,
) -> fmt::Result {
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        let paren = paren_unions && matches!(member, TsType::Union(_));
        if paren {
            write!(f, "(")?;
        }
        member.write(f, depth)?;
        if paren {
            write!(f, ")")?;
        }
    }
    Ok(())
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for TsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

/// `export type Name = ...;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAliasDeclaration {
    pub name: String,
    pub ty: TsType,
    pub exported: bool,
}

impl TypeAliasDeclaration {
    pub fn exported(name: impl Into<String>, ty: TsType) -> Self {
        Self {
            name: name.into(),
            ty,
            exported: true,
        }
    }
}

impl fmt::Display for TypeAliasDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exported {
            write!(f, "export ")?;
        }
        write!(f, "type {} = ", self.name)?;
        self.ty.write(f, 0)?;
        write!(f, ";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_print_object() {
        let ty = TsType::Object(vec![
            TsProperty::new("hello", TsType::named("string")),
            TsProperty::new("count", TsType::named("number").nullable()).optional(true),
            TsProperty::new(
                "tags",
                TsType::array(TsType::named("string").nullable()),
            ),
        ]);
        let alias = TypeAliasDeclaration::exported("MyQuery", ty);
        assert_eq!(
            alias.to_string(),
            "export type MyQuery = {\n    hello: string;\n    count?: number | null;\n    tags: (string | null)[];\n};"
        );
    }

    #[test]
    fn test_print_nested_union_of_objects() {
        let user = TsType::Object(vec![TsProperty::new(
            "__typename",
            TsType::StringLiteral("User".to_string()),
        )]);
        let ty = TsType::Object(vec![TsProperty::new("node", user.nullable())]);
        assert_eq!(
            ty.to_string(),
            "{\n    node: {\n        __typename: \"User\";\n    } | null;\n}"
        );
    }

    #[test]
    fn test_union_flattens_and_nullable_is_idempotent() {
        let ty = TsType::union(vec![
            TsType::StringLiteral("A".to_string()),
            TsType::union(vec![
                TsType::StringLiteral("B".to_string()),
                TsType::StringLiteral("C".to_string()),
            ]),
        ]);
        assert_eq!(ty.to_string(), "\"A\" | \"B\" | \"C\"");
        assert_eq!(ty.clone().nullable().nullable().to_string(), "\"A\" | \"B\" | \"C\" | null");
        assert_eq!(TsType::union(vec![TsType::any()]), TsType::any());
    }

    #[test]
    fn test_print_generic_and_intersection() {
        let ty = TsType::generic(
            "TypedQueryDocumentNode",
            vec![TsType::named("Q"), TsType::named("QVariables")],
        );
        assert_eq!(ty.to_string(), "TypedQueryDocumentNode<Q, QVariables>");

        let inter = TsType::Intersection(vec![
            TsType::named("A"),
            TsType::union(vec![TsType::named("B"), TsType::named("C")]),
        ]);
        assert_eq!(inter.to_string(), "A & (B | C)");
        assert_eq!(TsType::Object(vec![]).to_string(), "{}");
    }
}
