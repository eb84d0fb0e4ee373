//! # rostermerge - Entity resolution for competitive player and team records
//!
//! rostermerge folds player and team records imported from many independent
//! sources (tournament brackets, chat services, spreadsheets) into a single
//! de-duplicated, provenance-preserving roster.
//!
//! ## Core Concepts
//!
//! - **Sourced attribute**: a set of distinct values, each tagged with every source that reported it
//! - **Match reason**: bitmask of attribute categories two entities share, reduced to a weight
//! - **Merge pass**: a read-only prep phase against a frozen snapshot, then a serial perform phase
//! - **Id migration**: every retired id is rewritten to its surviving id across all references
//!
//! ## Usage
//!
//! ```rust
//! use rostermerge::{Identifier, MergeOrchestrator, Player, Source, SourceRef};
//!
//! let mut engine = MergeOrchestrator::default();
//!
//! let cup1 = SourceRef::named("cup-1");
//! let mut jane = Player::named("Jane", &cup1)?;
//! jane.identifiers.add(Identifier::chat_id("1001"), cup1.clone());
//! engine.merge_source(Source::with_entities(cup1, vec![jane], vec![]))?;
//!
//! let cup2 = SourceRef::named("cup-2");
//! let mut renamed = Player::named("Jane D", &cup2)?;
//! renamed.identifiers.add(Identifier::chat_id("1001"), cup2.clone());
//! let results = engine.merge_source(Source::with_entities(cup2, vec![renamed], vec![]))?;
//!
//! assert_eq!(results.players.merge_count(), 1);
//! assert_eq!(engine.players().len(), 1);
//! # Ok::<(), rostermerge::RosterError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod attribute;
pub mod entity;
pub mod error;
pub mod source;

// Scoring and merging
pub mod config;
pub mod events;
pub mod matching;
pub mod merge;
pub mod snapshot;

// Re-export primary types at crate root for convenience
pub use attribute::{
    AttributeValue, ClanTag, CountryCode, FriendCode, Identifier, IdentifierKind, Name, Placement,
    Pronoun, Skill, Sourced, SourcedValue, TagLayout, Weapon,
};
pub use config::MergeConfig;
pub use entity::{EntityId, EntityKind, Mergeable, Player, Team};
pub use error::{MergeError, RosterError, RosterResult, ValidationError};
pub use events::{MergeEvent, PassKind};
pub use matching::{MatchCategory, MatchReason, MatchWeights};
pub use merge::{
    CoreMergeResults, EntitySet, FinalizeReport, IdMigrationTracker, MergeOrchestrator, MergeOutcome,
    MergeRecord, PassResults,
};
pub use snapshot::{Snapshot, SourceResolver};
pub use source::{Source, SourceId, SourceRef};
