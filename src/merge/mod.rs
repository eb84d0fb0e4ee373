//! Merge engine modules.
//!
//! This module groups merge records and their batch aggregation, pass-scoped
//! id migration, the id-keyed reference collections, and the orchestrator
//! that drives source merges and the finalize loop.

pub mod collection;
pub mod migration;
pub mod orchestrator;
pub mod record;
pub mod results;

pub use collection::EntitySet;
pub use migration::IdMigrationTracker;
pub use orchestrator::{FinalizeReport, MergeOrchestrator, PassResults};
pub use record::{MergeOutcome, MergeRecord};
pub use results::CoreMergeResults;
