use std::collections::BTreeMap;
use std::sync::Arc;

use crate::typegen::addon::{CustomScalarInput, TypeGenAddon};
use crate::typegen::ts_type::TsType;

/// Types custom scalars from the `typegen.scalars` table.
pub struct ScalarMapAddon {
    scalars: Arc<BTreeMap<String, String>>,
}

impl ScalarMapAddon {
    pub fn new(scalars: Arc<BTreeMap<String, String>>) -> Self {
        Self { scalars }
    }
}

impl TypeGenAddon for ScalarMapAddon {
    fn custom_scalar(&self, input: &CustomScalarInput<'_>) -> Option<TsType> {
        self.scalars
            .get(input.scalar_type.name.as_str())
            .map(|ts| TsType::Raw(ts.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apollo_compiler::Schema;

    #[test]
    fn test_maps_configured_scalars_only() {
        let schema =
            Schema::parse_and_validate("scalar DateTime scalar JSON type Query { a: DateTime b: JSON }", "s.graphql")
                .unwrap();
        let mut table = BTreeMap::new();
        table.insert("DateTime".to_string(), "string".to_string());
        let addon = ScalarMapAddon::new(Arc::new(table));

        let date = CustomScalarInput {
            scalar_type: schema.get_scalar("DateTime").unwrap(),
        };
        let json = CustomScalarInput {
            scalar_type: schema.get_scalar("JSON").unwrap(),
        };
        assert_eq!(addon.custom_scalar(&date), Some(TsType::Raw("string".to_string())));
        assert_eq!(addon.custom_scalar(&json), None);
    }
}
