//! Embedded document extraction.
//!
//! - `position`: resolved-text <-> host-source offset mapping
//! - `extractor`: finds tagged literals and builds their documents
//! - `resolver`: inlines fragments spread across the project
//! - `manifest`: serializable view of an extraction pass

mod diagnostics;
mod extractor;
mod manifest;
mod position;
mod resolver;

pub use diagnostics::{collect_diagnostics, GraphqlDiagnostic};
pub use extractor::{
    get_dominant_definition, operation_type_name, DominantDefinition, ExtractFailed,
    ExtractFileEntry, ExtractResult, ExtractSucceeded, ExtractedTemplate, Extractor,
    ExtractorOptions,
};
pub use manifest::{ManifestDocumentEntry, ManifestOutput, ManifestPosition};
pub use position::{MappedSegment, ResolvedTemplateInfo, SourcePosition, TemplateTextBuilder};
pub use resolver::{
    collect_spreads, fragment_sources, DocumentResolver, FragmentRegistry, FragmentSource,
    MissingFragment, SpreadRef,
};
