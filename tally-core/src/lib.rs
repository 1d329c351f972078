//! tally-core: shared types and pure text/scoring primitives for the
//! adaptive transaction-categorization engine.

pub mod category;
pub mod features;
pub mod lexicon;
pub mod similarity;
pub mod text;
pub mod time;
pub mod types;

pub use category::{CategoryMeta, category_meta};
pub use features::{
    AmountBucket, Entity, EntityKind, FeatureRecord, Language, TimeBucket, extract_features,
};
pub use similarity::similarity;
pub use text::normalize;
pub use time::{local_hour, parse_timezone};
pub use types::{CategorySuggestion, Feedback, SuggestionSource, TrainingExample};
