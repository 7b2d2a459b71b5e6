//! Desired facts: what producers say should be true about a subject.

mod builder;
mod catalog;
mod factset;
mod observation;

pub use builder::{FactSetBuilder, FieldIssue, NormalizedFacts};
pub use catalog::{FieldCatalog, FieldKind, FieldSpec};
pub use factset::{DesiredFact, FactSet};
pub use observation::{AssetFile, CatalogNormalizer, Normalize, RawObservation};
