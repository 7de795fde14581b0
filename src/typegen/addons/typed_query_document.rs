use crate::host::{ImportDeclaration, ImportSpecifier};
use crate::typegen::addon::{OperationDefinitionInput, TypeGenAddon};
use crate::typegen::output::OutputSource;
use crate::typegen::ts_type::{TsType, TypeAliasDeclaration};

const DOCUMENT_NODE_TYPE: &str = "TypedQueryDocumentNode";

/// Emits `<Op>Document = TypedQueryDocumentNode<Op, OpVariables>` per operation.
pub struct TypedQueryDocumentAddon;

impl TypeGenAddon for TypedQueryDocumentAddon {
    fn operation_definition(&self, input: &OperationDefinitionInput<'_>, source: &mut OutputSource) {
        source.push_import(ImportDeclaration {
            module: "graphql".to_string(),
            named: vec![ImportSpecifier::new(DOCUMENT_NODE_TYPE)],
            type_only: true,
            ..Default::default()
        });
        let name = source.unique_name(&format!("{}Document", input.ts_result_node.name));
        source.push_statement(TypeAliasDeclaration::exported(
            name,
            TsType::generic(
                DOCUMENT_NODE_TYPE,
                vec![
                    TsType::named(input.ts_result_node.name.clone()),
                    TsType::named(input.ts_variable_node.name.clone()),
                ],
            ),
        ));
    }
}
