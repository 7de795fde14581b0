//! Walks a resolved document against the schema and emits declarations.

use std::collections::HashMap;

use apollo_compiler::schema::ExtendedType;
use apollo_compiler::{ast, Node, Schema};
use phf::phf_map;
use thiserror::Error;

use super::addon::{
    CustomScalarInput, DocumentInput, FragmentDefinitionInput, OperationDefinitionInput,
    TypeGenAddon,
};
use super::output::OutputSource;
use super::ts_type::{TsProperty, TsType, TypeAliasDeclaration};

/// TypeScript types of the built-in scalars.
static BUILTIN_SCALARS: phf::Map<&'static str, &'static str> = phf_map! {
    "Int" => "number",
    "Float" => "number",
    "String" => "string",
    "ID" => "string",
    "Boolean" => "boolean",
};

/// A document shape that cannot be typed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TypeGenError {
    pub message: String,
    /// Span of the offending node in the document text.
    pub span: Option<(usize, usize)>,
}

impl TypeGenError {
    fn at<T>(node: &Node<T>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: node.location().map(|loc| (loc.offset(), loc.end_offset())),
        }
    }
}

/// Generates types for the definitions of one document.
pub struct TypeGenVisitor<'s> {
    schema: &'s Schema,
}

impl<'s> TypeGenVisitor<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Emit declarations for `targets` into `source`.
    ///
    /// `document` is the whole resolved document; fragments it defines are
    /// available to spreads in the targets.
    pub fn visit(
        &self,
        document: &ast::Document,
        targets: &[&ast::Definition],
        source: &mut OutputSource,
        addon: &dyn TypeGenAddon,
    ) -> Result<(), TypeGenError> {
        addon.document(&DocumentInput { graphql_node: document }, source);

        let walk = Walk::new(self.schema, document, addon);
        for definition in targets {
            match definition {
                ast::Definition::OperationDefinition(op) => {
                    let root = self.schema.root_operation(op.operation_type).ok_or_else(|| {
                        TypeGenError::at(
                            op,
                            format!(
                                "Schema does not define a {} root type.",
                                operation_keyword(op.operation_type)
                            ),
                        )
                    })?;
                    let selections: Vec<_> = op.selection_set.iter().collect();
                    let result_ty = walk.composite_type(root.as_str(), &selections, op)?;
                    let variables_ty = walk.variables_type(&op.variables)?;

                    let base = match &op.name {
                        Some(name) => name.to_string(),
                        None => default_operation_name(op.operation_type).to_string(),
                    };
                    let result = TypeAliasDeclaration::exported(source.unique_name(&base), result_ty);
                    let variables = TypeAliasDeclaration::exported(
                        source.unique_name(&format!("{}Variables", base)),
                        variables_ty,
                    );
                    source.push_statement(result.clone());
                    source.push_statement(variables.clone());

                    addon.operation_definition(
                        &OperationDefinitionInput {
                            graphql_node: op,
                            operation_type: root.as_str(),
                            ts_result_node: &result,
                            ts_variable_node: &variables,
                        },
                        source,
                    );
                }
                ast::Definition::FragmentDefinition(fragment) => {
                    let condition = fragment.type_condition.as_str();
                    let selections: Vec<_> = fragment.selection_set.iter().collect();
                    let ty = walk.composite_type(condition, &selections, fragment)?;
                    let alias = TypeAliasDeclaration::exported(source.unique_name(fragment.name.as_str()), ty);
                    source.push_statement(alias.clone());

                    addon.fragment_definition(
                        &FragmentDefinitionInput {
                            graphql_node: fragment,
                            fragment_type: condition,
                            ts_node: &alias,
                        },
                        source,
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn operation_keyword(operation_type: ast::OperationType) -> &'static str {
    match operation_type {
        ast::OperationType::Query => "query",
        ast::OperationType::Mutation => "mutation",
        ast::OperationType::Subscription => "subscription",
    }
}

fn default_operation_name(operation_type: ast::OperationType) -> &'static str {
    match operation_type {
        ast::OperationType::Query => "AnonymousQuery",
        ast::OperationType::Mutation => "AnonymousMutation",
        ast::OperationType::Subscription => "AnonymousSubscription",
    }
}

fn is_conditional(directives: &ast::DirectiveList) -> bool {
    directives
        .iter()
        .any(|d| matches!(d.name.as_str(), "skip" | "include"))
}

/// Fields sharing a response key.
struct FieldGroup<'a> {
    key: String,
    fields: Vec<&'a Node<ast::Field>>,
    optional: bool,
}

/// Per-document walking state.
struct Walk<'a> {
    schema: &'a Schema,
    addon: &'a dyn TypeGenAddon,
    fragments: HashMap<&'a str, &'a Node<ast::FragmentDefinition>>,
}

impl<'a> Walk<'a> {
    fn new(schema: &'a Schema, document: &'a ast::Document, addon: &'a dyn TypeGenAddon) -> Self {
        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => Some((fragment.name.as_str(), fragment)),
                _ => None,
            })
            .collect();
        Self {
            schema,
            addon,
            fragments,
        }
    }

    /// Type of a selection set on an object, interface or union type.
    fn composite_type<T>(
        &self,
        type_name: &str,
        selections: &[&'a ast::Selection],
        node: &Node<T>,
    ) -> Result<TsType, TypeGenError> {
        match self.schema.types.get(type_name) {
            Some(ExtendedType::Object(_)) => {
                let names = vec![type_name.to_string()];
                Ok(TsType::Object(self.properties(type_name, Some(type_name), &names, selections)?))
            }
            Some(ExtendedType::Interface(_)) | Some(ExtendedType::Union(_)) => {
                self.abstract_type(type_name, selections)
            }
            Some(_) => Err(TypeGenError::at(
                node,
                format!("Type \"{}\" cannot have a selection set.", type_name),
            )),
            None => Err(TypeGenError::at(
                node,
                format!("Type \"{}\" is not defined in the schema.", type_name),
            )),
        }
    }

    /// One variant per concrete type selected through a type condition, plus
    /// one for the remaining possible types.
    fn abstract_type(&self, type_name: &str, selections: &[&'a ast::Selection]) -> Result<TsType, TypeGenError> {
        let possible = self.possible_types(type_name);
        let mut conditioned = Vec::new();
        self.conditioned_types(type_name, &possible, selections, &mut conditioned, &mut Vec::new());

        let rest: Vec<String> = possible
            .iter()
            .filter(|name| !conditioned.contains(name))
            .cloned()
            .collect();

        let mut variants = Vec::new();
        for concrete in &conditioned {
            let names = vec![concrete.clone()];
            variants.push(TsType::Object(self.properties(type_name, Some(concrete), &names, selections)?));
        }
        if !rest.is_empty() || variants.is_empty() {
            variants.push(TsType::Object(self.properties(type_name, None, &rest, selections)?));
        }
        Ok(TsType::union(variants))
    }

    /// Concrete types named by type conditions narrower than `type_name`.
    fn conditioned_types(
        &self,
        type_name: &str,
        possible: &[String],
        selections: &[&'a ast::Selection],
        out: &mut Vec<String>,
        stack: &mut Vec<&'a str>,
    ) {
        for &selection in selections {
            let (condition, inner): (Option<&str>, Vec<&'a ast::Selection>) = match selection {
                ast::Selection::Field(_) => continue,
                ast::Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let fragment = match self.fragments.get(name) {
                        Some(fragment) if !stack.contains(&name) => *fragment,
                        _ => continue,
                    };
                    stack.push(name);
                    let inner = fragment.selection_set.iter().collect();
                    (Some(fragment.type_condition.as_str()), inner)
                }
                ast::Selection::InlineFragment(inline) => (
                    inline.type_condition.as_ref().map(|c| c.as_str()),
                    inline.selection_set.iter().collect(),
                ),
            };

            let covers_all = condition
                .map(|c| c == type_name || self.covers(c, possible))
                .unwrap_or(true);
            if covers_all {
                self.conditioned_types(type_name, possible, &inner, out, stack);
            } else if let Some(condition) = condition {
                for concrete in self.possible_types(condition) {
                    if possible.contains(&concrete) && !out.contains(&concrete) {
                        out.push(concrete);
                    }
                }
            }
            if matches!(selection, ast::Selection::FragmentSpread(_)) {
                stack.pop();
            }
        }
    }

    /// Properties of a selection set on `type_name`, narrowed to `concrete`
    /// when known. `typenames` are the values `__typename` can take.
    fn properties(
        &self,
        type_name: &str,
        concrete: Option<&str>,
        typenames: &[String],
        selections: &[&'a ast::Selection],
    ) -> Result<Vec<TsProperty>, TypeGenError> {
        let mut groups = Vec::new();
        self.collect_fields(type_name, concrete, selections, false, &mut groups, &mut Vec::new())?;

        let lookup_type = concrete.unwrap_or(type_name);
        let mut props = Vec::new();
        for group in groups {
            let field = group.fields[0];
            let ty = if field.name.as_str() == "__typename" {
                match concrete {
                    Some(name) => TsType::StringLiteral(name.to_string()),
                    None => TsType::union(
                        typenames
                            .iter()
                            .map(|name| TsType::StringLiteral(name.clone()))
                            .collect(),
                    ),
                }
            } else {
                let definition = self.field_type(lookup_type, field.name.as_str()).ok_or_else(|| {
                    TypeGenError::at(
                        field,
                        format!("Field \"{}\" is not defined on type \"{}\".", field.name, lookup_type),
                    )
                })?;
                let sub_selections: Vec<&'a ast::Selection> = group
                    .fields
                    .iter()
                    .flat_map(|f| f.selection_set.iter())
                    .collect();
                self.output_type(definition, &sub_selections, field)?
            };
            props.push(TsProperty::new(group.key, ty).optional(group.optional));
        }
        Ok(props)
    }

    fn collect_fields(
        &self,
        type_name: &str,
        concrete: Option<&str>,
        selections: &[&'a ast::Selection],
        optional: bool,
        groups: &mut Vec<FieldGroup<'a>>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), TypeGenError> {
        for &selection in selections {
            match selection {
                ast::Selection::Field(field) => {
                    let key = field.alias.as_ref().unwrap_or(&field.name).to_string();
                    let field_optional = optional || is_conditional(&field.directives);
                    match groups.iter_mut().find(|g| g.key == key) {
                        Some(group) => {
                            group.fields.push(field);
                            group.optional = group.optional && field_optional;
                        }
                        None => groups.push(FieldGroup {
                            key,
                            fields: vec![field],
                            optional: field_optional,
                        }),
                    }
                }
                ast::Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let fragment = self.fragments.get(name).copied().ok_or_else(|| {
                        TypeGenError::at(spread, format!("Fragment \"{}\" is not defined.", name))
                    })?;
                    if stack.contains(&name) {
                        return Err(TypeGenError::at(
                            spread,
                            format!("Fragment \"{}\" spreads itself.", name),
                        ));
                    }
                    if self.applies(fragment.type_condition.as_str(), type_name, concrete) {
                        stack.push(name);
                        let inner: Vec<_> = fragment.selection_set.iter().collect();
                        let inner_optional = optional || is_conditional(&spread.directives);
                        self.collect_fields(type_name, concrete, &inner, inner_optional, groups, stack)?;
                        stack.pop();
                    }
                }
                ast::Selection::InlineFragment(inline) => {
                    let applies = inline
                        .type_condition
                        .as_ref()
                        .map(|c| self.applies(c.as_str(), type_name, concrete))
                        .unwrap_or(true);
                    if applies {
                        let inner: Vec<_> = inline.selection_set.iter().collect();
                        let inner_optional = optional || is_conditional(&inline.directives);
                        self.collect_fields(type_name, concrete, &inner, inner_optional, groups, stack)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a type condition holds for every value selected here.
    fn applies(&self, condition: &str, type_name: &str, concrete: Option<&str>) -> bool {
        if condition == type_name {
            return true;
        }
        match concrete {
            Some(concrete) => {
                condition == concrete || self.possible_types(condition).iter().any(|t| t == concrete)
            }
            None => self.covers(condition, &self.possible_types(type_name)),
        }
    }

    /// Whether every type in `types` is a possible type of `condition`.
    fn covers(&self, condition: &str, types: &[String]) -> bool {
        let condition_types = self.possible_types(condition);
        !types.is_empty() && types.iter().all(|t| condition_types.contains(t))
    }

    /// Object types a value of `type_name` can have, in schema order.
    fn possible_types(&self, type_name: &str) -> Vec<String> {
        match self.schema.types.get(type_name) {
            Some(ExtendedType::Object(_)) => vec![type_name.to_string()],
            Some(ExtendedType::Union(union_type)) => union_type
                .members
                .iter()
                .map(|member| member.name.to_string())
                .collect(),
            Some(ExtendedType::Interface(_)) => self
                .schema
                .types
                .iter()
                .filter_map(|(name, ty)| match ty {
                    ExtendedType::Object(object)
                        if object
                            .implements_interfaces
                            .iter()
                            .any(|i| i.name.as_str() == type_name) =>
                    {
                        Some(name.to_string())
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn field_type(&self, type_name: &str, field_name: &str) -> Option<&'a ast::Type> {
        let schema: &'a Schema = self.schema;
        match schema.types.get(type_name)? {
            ExtendedType::Object(object) => object.fields.get(field_name).map(|f| &f.ty),
            ExtendedType::Interface(interface) => interface.fields.get(field_name).map(|f| &f.ty),
            _ => None,
        }
    }

    fn output_type(
        &self,
        ty: &ast::Type,
        selections: &[&'a ast::Selection],
        field: &Node<ast::Field>,
    ) -> Result<TsType, TypeGenError> {
        Ok(match ty {
            ast::Type::Named(name) => self.named_output_type(name.as_str(), selections, field)?.nullable(),
            ast::Type::NonNullNamed(name) => self.named_output_type(name.as_str(), selections, field)?,
            ast::Type::List(inner) => TsType::array(self.output_type(inner, selections, field)?).nullable(),
            ast::Type::NonNullList(inner) => TsType::array(self.output_type(inner, selections, field)?),
        })
    }

    fn named_output_type(
        &self,
        type_name: &str,
        selections: &[&'a ast::Selection],
        field: &Node<ast::Field>,
    ) -> Result<TsType, TypeGenError> {
        match self.schema.types.get(type_name) {
            Some(ExtendedType::Object(_)) | Some(ExtendedType::Interface(_)) | Some(ExtendedType::Union(_)) => {
                if selections.is_empty() {
                    return Err(TypeGenError::at(
                        field,
                        format!(
                            "Field \"{}\" of type \"{}\" must have a selection of subfields.",
                            field.name, type_name
                        ),
                    ));
                }
                self.composite_type(type_name, selections, field)
            }
            _ => self.leaf_type(type_name).ok_or_else(|| {
                TypeGenError::at(
                    field,
                    format!("Type \"{}\" is not defined in the schema.", type_name),
                )
            }),
        }
    }

    /// Scalar or enum type; `None` for other or unknown types.
    fn leaf_type(&self, type_name: &str) -> Option<TsType> {
        if let Some(ts) = BUILTIN_SCALARS.get(type_name) {
            return Some(TsType::named(*ts));
        }
        match self.schema.types.get(type_name)? {
            ExtendedType::Scalar(scalar) => Some(
                self.addon
                    .custom_scalar(&CustomScalarInput { scalar_type: scalar })
                    .unwrap_or_else(TsType::any),
            ),
            ExtendedType::Enum(enum_type) => Some(TsType::union(
                enum_type
                    .values
                    .keys()
                    .map(|value| TsType::StringLiteral(value.to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }

    fn variables_type(&self, variables: &[Node<ast::VariableDefinition>]) -> Result<TsType, TypeGenError> {
        let mut props = Vec::new();
        for variable in variables {
            let ty = self.input_type(&variable.ty, &mut Vec::new()).ok_or_else(|| {
                TypeGenError::at(
                    variable,
                    format!("Variable \"${}\" has an invalid input type.", variable.name),
                )
            })?;
            let optional = !variable.ty.is_non_null() || variable.default_value.is_some();
            props.push(TsProperty::new(variable.name.to_string(), ty).optional(optional));
        }
        Ok(TsType::Object(props))
    }

    fn input_type(&self, ty: &ast::Type, visiting: &mut Vec<String>) -> Option<TsType> {
        Some(match ty {
            ast::Type::Named(name) => self.named_input_type(name.as_str(), visiting)?.nullable(),
            ast::Type::NonNullNamed(name) => self.named_input_type(name.as_str(), visiting)?,
            ast::Type::List(inner) => TsType::array(self.input_type(inner, visiting)?).nullable(),
            ast::Type::NonNullList(inner) => TsType::array(self.input_type(inner, visiting)?),
        })
    }

    fn named_input_type(&self, type_name: &str, visiting: &mut Vec<String>) -> Option<TsType> {
        match self.schema.types.get(type_name) {
            Some(ExtendedType::InputObject(input)) => {
                if visiting.iter().any(|v| v == type_name) {
                    return Some(TsType::any());
                }
                visiting.push(type_name.to_string());
                let mut props = Vec::new();
                for (name, field) in &input.fields {
                    let ty = self.input_type(&field.ty, visiting)?;
                    let optional = !field.ty.is_non_null() || field.default_value.is_some();
                    props.push(TsProperty::new(name.to_string(), ty).optional(optional));
                }
                visiting.pop();
                Some(TsType::Object(props))
            }
            _ => self.leaf_type(type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typegen::{MergedAddon, TypeGenAddon};
    use apollo_compiler::validation::Valid;
    use pretty_assertions::assert_eq;

    const SDL: &str = r#"
scalar DateTime
enum Role { ADMIN USER }
interface Node { id: ID! }
type User implements Node { id: ID! name: String role: Role! createdAt: DateTime }
type Post implements Node { id: ID! title: String! tags: [String!] }
union SearchResult = User | Post
input UserFilter { role: Role, name: String!, limit: Int = 10 }
type Query {
  hello: String!
  user(id: ID!): User
  node(id: ID!): Node
  search(filter: UserFilter): [SearchResult!]!
}
"#;

    fn schema() -> Valid<Schema> {
        Schema::parse_and_validate(SDL, "schema.graphql").unwrap()
    }

    fn generate(query: &str, addon: &dyn TypeGenAddon) -> Result<String, TypeGenError> {
        let schema = schema();
        let document = ast::Document::parse(query, "q.graphql").unwrap();
        let targets: Vec<_> = document.definitions.iter().take(1).collect();
        let mut source = OutputSource::new("out.ts");
        TypeGenVisitor::new(&schema).visit(&document, &targets, &mut source, addon)?;
        Ok(source
            .statements()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    struct DateAsString;

    impl TypeGenAddon for DateAsString {
        fn custom_scalar(&self, _input: &CustomScalarInput<'_>) -> Option<TsType> {
            Some(TsType::named("string"))
        }
    }

    #[test]
    fn test_simple_query() {
        let out = generate("query MyQuery { hello }", &MergedAddon::default()).unwrap();
        assert_eq!(
            out,
            "export type MyQuery = {\n    hello: string;\n};\nexport type MyQueryVariables = {};"
        );
    }

    #[test]
    fn test_nullable_object_enum_and_custom_scalar() {
        let query = "query Q($id: ID!) { user(id: $id) { name role createdAt } }";
        let out = generate(query, &MergedAddon::default()).unwrap();
        assert_eq!(
            out,
            r#"export type Q = {
    user: {
        name: string | null;
        role: "ADMIN" | "USER";
        createdAt: any | null;
    } | null;
};
export type QVariables = {
    id: string;
};"#
        );

        let with_addon = generate(query, &DateAsString).unwrap();
        assert!(with_addon.contains("createdAt: string | null;"));
    }

    #[test]
    fn test_alias_conditional_and_typename() {
        let query = r#"query Q($skip: Boolean!) {
  greeting: hello
  user(id: "1") { __typename name @skip(if: $skip) }
}"#;
        let out = generate(query, &MergedAddon::default()).unwrap();
        assert!(out.contains("greeting: string;"));
        assert!(out.contains("__typename: \"User\";"));
        assert!(out.contains("name?: string | null;"));
    }

    #[test]
    fn test_fragment_spread_is_expanded() {
        let query = "query Q { user(id: \"1\") { ...UserFields } }\nfragment UserFields on User { id name }";
        let out = generate(query, &MergedAddon::default()).unwrap();
        assert!(out.contains("id: string;"));
        assert!(out.contains("name: string | null;"));
    }

    #[test]
    fn test_abstract_type_variants() {
        let query = r#"query Q {
  search { __typename ... on User { name } ... on Post { title } }
}"#;
        let out = generate(query, &MergedAddon::default()).unwrap();
        assert_eq!(
            out,
            r#"export type Q = {
    search: ({
        __typename: "User";
        name: string | null;
    } | {
        __typename: "Post";
        title: string;
    })[];
};
export type QVariables = {};"#
        );
    }

    #[test]
    fn test_interface_common_fields() {
        let query = "query Q { node(id: \"1\") { __typename id ... on Post { title } } }";
        let out = generate(query, &MergedAddon::default()).unwrap();
        assert!(out.contains("__typename: \"Post\";"));
        assert!(out.contains("__typename: \"User\";"));
        assert_eq!(out.matches("id: string;").count(), 2);
    }

    #[test]
    fn test_variables_with_input_object() {
        let query = "query Q($filter: UserFilter, $n: Int = 1) { search(filter: $filter) { __typename } }";
        let out = generate(query, &MergedAddon::default()).unwrap();
        assert!(out.contains(
            r#"export type QVariables = {
    filter?: {
        role?: "ADMIN" | "USER" | null;
        name: string;
        limit?: number | null;
    } | null;
    n?: number | null;
};"#
        ));
    }

    #[test]
    fn test_fragment_definition() {
        let out = generate("fragment PostFields on Post { title tags }", &MergedAddon::default()).unwrap();
        assert_eq!(
            out,
            "export type PostFields = {\n    title: string;\n    tags: (string)[] | null;\n};"
        );
    }

    #[test]
    fn test_unknown_field_error_has_span() {
        let query = "query MyQuery { helloo }";
        let err = generate(query, &MergedAddon::default()).unwrap_err();
        assert!(err.message.contains("helloo"));
        let (start, _) = err.span.unwrap();
        assert_eq!(&query[start..start + 6], "helloo");
    }

    #[test]
    fn test_missing_selection_and_root_type() {
        let err = generate("query Q { user(id: \"1\") }", &MergedAddon::default()).unwrap_err();
        assert!(err.message.contains("must have a selection"));

        let err = generate("mutation M { x }", &MergedAddon::default()).unwrap_err();
        assert!(err.message.contains("mutation root type"));
    }
}
