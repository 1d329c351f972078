//! tally-ingest: bulk import of labeled transactions for corpus seeding.

pub mod labeled_csv;

pub use labeled_csv::{LabeledTransaction, parse_labeled_csv};
