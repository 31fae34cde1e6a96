//! Orchestrator adapter: translates `JobParams`/`JobInfo` into a
//! cluster's native workload primitives. `KubeOrchestrator` targets a
//! real cluster's `Deployment`+`Service`; `MockOrchestrator` is an
//! in-process stand-in for tests and local development.

mod decide;
mod error;
mod kube_orchestrator;
mod mock;
mod resources;
mod traits;

pub use error::OrchestratorError;
pub use kube_orchestrator::KubeOrchestrator;
pub use mock::MockOrchestrator;
pub use traits::Orchestrator;
