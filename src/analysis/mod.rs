pub mod aggregate;
pub mod classification;
pub mod schema;

pub use aggregate::{
    AggregationResult, aggregate, breakdown_across_themes, breakdown_within_theme,
    total_for_selection, total_for_year,
};
pub use classification::{Classifier, ClassifierStrategy, Taxonomy, classify};
pub use schema::{LogicalColumn, ResolvedSchema, canonical_column_name, resolve_schema};
