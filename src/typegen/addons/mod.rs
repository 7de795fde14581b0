//! Built-in addons, selectable by name in the project configuration.

mod scalar_map;
mod typed_query_document;

use std::sync::Arc;

pub use scalar_map::ScalarMapAddon;
pub use typed_query_document::TypedQueryDocumentAddon;

use super::addon::{AddonContext, AddonFactory, TypeGenAddon};
use crate::config::TypegenConfig;
use crate::errors::ConfigError;

const TYPED_QUERY_DOCUMENT: &str = "typed-query-document";
const SCALAR_MAP: &str = "scalar-map";

/// Names accepted in `typegen.addons`.
pub const BUILTIN_ADDONS: &[&str] = &[TYPED_QUERY_DOCUMENT, SCALAR_MAP];

pub fn is_known_addon(name: &str) -> bool {
    BUILTIN_ADDONS.contains(&name)
}

/// Build the factories for the configured addons, in configuration order.
pub fn resolve_addon_factories(config: &TypegenConfig) -> Result<Vec<AddonFactory>, ConfigError> {
    config
        .addons
        .iter()
        .map(|name| -> Result<AddonFactory, ConfigError> {
            match name.as_str() {
                TYPED_QUERY_DOCUMENT => Ok(Arc::new(|_: &AddonContext<'_>| {
                    Box::new(TypedQueryDocumentAddon) as Box<dyn TypeGenAddon>
                })),
                SCALAR_MAP => {
                    let scalars = Arc::new(config.scalars.clone());
                    Ok(Arc::new(move |_: &AddonContext<'_>| {
                        Box::new(ScalarMapAddon::new(Arc::clone(&scalars))) as Box<dyn TypeGenAddon>
                    }))
                }
                other => Err(ConfigError::UnknownAddon(other.to_string())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_addon_factories() {
        let mut config = TypegenConfig::default();
        config.addons = vec![SCALAR_MAP.to_string(), TYPED_QUERY_DOCUMENT.to_string()];
        assert_eq!(resolve_addon_factories(&config).unwrap().len(), 2);

        config.addons.push("graphql-codegen".to_string());
        assert!(matches!(
            resolve_addon_factories(&config),
            Err(ConfigError::UnknownAddon(name)) if name == "graphql-codegen"
        ));
        assert!(is_known_addon("scalar-map"));
        assert!(!is_known_addon("graphql-codegen"));
    }
}
