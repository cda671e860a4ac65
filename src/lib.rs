//! gitship — remote-publish pipeline.
//!
//! Takes a blob of generated code and gets it durably committed into a
//! caller-specified GitHub repository: verify token scope, normalize the
//! target reference, stage and commit the code in an ephemeral local
//! repository, ensure the remote repository exists, force-push the
//! target branch, and tear the workspace down on every exit path.

pub mod config;
pub mod errors;
pub mod github;
pub mod publish;
pub mod server;
