//! Core module - classification, traversal, planning, and execution

pub mod apply;
pub mod auth;
pub mod backup;
pub mod cascade;
pub mod client;
pub mod config;
pub mod error;
pub mod identify;
pub mod plan;
pub mod resolve;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use apply::{ChangeResult, Executor, Outcome};
pub use auth::{StaticToken, TokenProvider};
pub use backup::BackupStore;
pub use cascade::{CascadeEngine, DeleteState, DeletionRecord, DeletionResult};
pub use client::FolioClient;
pub use config::Config;
pub use error::FolioError;
pub use identify::{unique_identifiers, Classifier, ClassifierCache, IdKind, IdToken, Probe};
pub use plan::{
    FieldAction, FieldChange, HoldingsDisposition, MutationPlan, PlanDecision, PlanEntry,
    PlannedHoldings, PlannedItemChange, Planner,
};
pub use resolve::{instance_id_from_accession, Navigator, ResolveOptions};
pub use transport::{Method, OkapiTransport, Reply, Transport};
