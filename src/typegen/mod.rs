//! TypeScript type generation for extracted documents.

pub mod addon;
pub mod addons;
mod output;
mod ts_type;
mod visitor;

pub use addon::{
    merge_addons, AddonContext, AddonFactory, CustomScalarInput, DocumentInput, ExtractedInfo,
    FragmentDefinitionInput, MergedAddon, OperationDefinitionInput, TypeGenAddon,
};
pub use addons::{is_known_addon, resolve_addon_factories};
pub use output::OutputSource;
pub use ts_type::{TsProperty, TsType, TypeAliasDeclaration};
pub use visitor::{TypeGenError, TypeGenVisitor};
