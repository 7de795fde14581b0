//! Type generation addons.
//!
//! An addon customizes generated output at four hook points. Value hooks
//! (`custom_scalar`) are answered by the first addon returning `Some`; side
//! effect hooks run on every addon in order.

use std::sync::Arc;

use apollo_compiler::schema::ScalarType;
use apollo_compiler::{ast, Schema};

use super::output::OutputSource;
use super::ts_type::{TsType, TypeAliasDeclaration};
use crate::host::TemplateLiteral;

pub struct CustomScalarInput<'a> {
    pub scalar_type: &'a ScalarType,
}

pub struct DocumentInput<'a> {
    pub graphql_node: &'a ast::Document,
}

pub struct OperationDefinitionInput<'a> {
    pub graphql_node: &'a ast::OperationDefinition,
    /// Name of the root type the operation selects from.
    pub operation_type: &'a str,
    pub ts_result_node: &'a TypeAliasDeclaration,
    pub ts_variable_node: &'a TypeAliasDeclaration,
}

pub struct FragmentDefinitionInput<'a> {
    pub graphql_node: &'a ast::FragmentDefinition,
    /// The fragment's type condition.
    pub fragment_type: &'a str,
    pub ts_node: &'a TypeAliasDeclaration,
}

/// Hooks invoked while generating one file. Every hook is optional.
pub trait TypeGenAddon {
    fn custom_scalar(&self, _input: &CustomScalarInput<'_>) -> Option<TsType> {
        None
    }

    fn document(&self, _input: &DocumentInput<'_>, _source: &mut OutputSource) {}

    fn operation_definition(&self, _input: &OperationDefinitionInput<'_>, _source: &mut OutputSource) {}

    fn fragment_definition(&self, _input: &FragmentDefinitionInput<'_>, _source: &mut OutputSource) {}
}

/// Where the document being typed came from.
pub struct ExtractedInfo<'a> {
    pub file_name: &'a str,
    /// Full text of the host file.
    pub source_text: &'a str,
    pub template: &'a TemplateLiteral,
}

/// Read-only view handed to addon factories, one per generated file.
pub struct AddonContext<'a> {
    pub schema: &'a Schema,
    pub extracted_info: ExtractedInfo<'a>,
    /// Path of the file being generated.
    pub output_file_name: &'a str,
}

/// Creates an addon for one generated file.
pub type AddonFactory = Arc<dyn Fn(&AddonContext<'_>) -> Box<dyn TypeGenAddon> + Send + Sync>;

/// Addons applied as one, in registration order.
#[derive(Default)]
pub struct MergedAddon {
    addons: Vec<Box<dyn TypeGenAddon>>,
}

impl MergedAddon {
    pub fn new(addons: Vec<Box<dyn TypeGenAddon>>) -> Self {
        Self { addons }
    }
}

/// Instantiate every factory for `context` and merge the addons.
pub fn merge_addons(factories: &[AddonFactory], context: &AddonContext<'_>) -> MergedAddon {
    MergedAddon::new(factories.iter().map(|factory| factory(context)).collect())
}

impl TypeGenAddon for MergedAddon {
    fn custom_scalar(&self, input: &CustomScalarInput<'_>) -> Option<TsType> {
        self.addons.iter().find_map(|addon| addon.custom_scalar(input))
    }

    fn document(&self, input: &DocumentInput<'_>, source: &mut OutputSource) {
        for addon in &self.addons {
            addon.document(input, source);
        }
    }

    fn operation_definition(&self, input: &OperationDefinitionInput<'_>, source: &mut OutputSource) {
        for addon in &self.addons {
            addon.operation_definition(input, source);
        }
    }

    fn fragment_definition(&self, input: &FragmentDefinitionInput<'_>, source: &mut OutputSource) {
        for addon in &self.addons {
            addon.fragment_definition(input, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl TypeGenAddon for Fixed {
        fn custom_scalar(&self, input: &CustomScalarInput<'_>) -> Option<TsType> {
            (input.scalar_type.name.as_str() == "Date").then(|| TsType::named(self.0))
        }

        fn document(&self, _input: &DocumentInput<'_>, source: &mut OutputSource) {
            source.unique_name(self.0);
        }
    }

    struct Silent;

    impl TypeGenAddon for Silent {}

    #[test]
    fn test_merged_addon_first_value_wins_and_all_side_effects_run() {
        let schema = Schema::parse_and_validate("scalar Date type Query { d: Date }", "s.graphql").unwrap();
        let date = schema.get_scalar("Date").unwrap();

        let merged = MergedAddon::new(vec![Box::new(Silent), Box::new(Fixed("string")), Box::new(Fixed("number"))]);
        let input = CustomScalarInput { scalar_type: date };
        assert_eq!(merged.custom_scalar(&input), Some(TsType::named("string")));

        let document = ast::Document::parse("{ d }", "q.graphql").unwrap();
        let mut source = OutputSource::new("out.ts");
        merged.document(&DocumentInput { graphql_node: &document }, &mut source);
        assert_eq!(source.unique_name("string"), "string_1");
        assert_eq!(source.unique_name("number"), "number_1");
    }
}
