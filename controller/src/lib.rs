//! Lifecycle controller: the single state machine that reconciles a
//! student's codespace record with its workload on the orchestrator.
//!
//! Owns both [`codeloom_store::StudentStore`] and
//! `codeloom_orchestrator::Orchestrator`, sequencing calls to each
//! rather than letting either depend on the other.

mod config;
mod controller;
mod error;
mod locks;

pub use config::CodespaceConfig;
pub use controller::{CodespaceUrl, Controller};
pub use error::ControllerError;
