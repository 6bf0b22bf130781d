//! Risk assessment sessions.
//!
//! An [`Assessment`] is the mutable record of one assessment: general
//! information, the results submitted so far and the set of nodes still
//! awaiting input. Every accepted change is persisted as a new YAML snapshot
//! by the [`SnapshotStore`], so any past step can be reloaded or rolled back.
//! The [`Repository`] ties both to a directory tree on disk.

pub mod assessment;
pub mod general;
pub mod notes;
pub mod repository;
pub mod snapshot;
pub mod store;

pub use assessment::{
    ActiveNodeSummary, Assessment, ItemAction, ItemOutcome, ResultView, SkipReason, TaskView,
    UpdateReport,
};
pub use general::{GeneralInfo, Substance};
pub use notes::Note;
pub use repository::Repository;
pub use snapshot::{RaHeader, Snapshot};
pub use store::SnapshotStore;
