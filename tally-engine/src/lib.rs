//! tally-engine: the adaptive categorization engine — rule store,
//! merchant map, historical similarity, suggestion aggregation, and the
//! feedback learning loop, behind a lock-guarded facade.

pub mod aggregator;
pub mod engine;
pub mod eval;
pub mod induction;
pub mod merchants;
pub mod rules;
pub mod store;

pub use engine::{Categorizer, EngineConfig, EngineStats};
pub use eval::{AccuracyReport, CategoryAccuracy};
pub use merchants::{MerchantMap, MerchantMapping};
pub use rules::{CategoryRule, RuleStore};
pub use store::DataStore;
