//! The remote-publish pipeline: reference normalization, the staging
//! workspace, and the orchestrator that drives one publish end to end.

pub mod pipeline;
pub mod reference;
pub mod workspace;

pub use pipeline::{PublishReceipt, PublishRequest, Publisher};
pub use reference::RepoRef;
pub use workspace::Workspace;
