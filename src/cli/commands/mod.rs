//! CLI command implementations
//!
//! Every command returns its process exit code: 0 ok, 1 partial failure,
//! 2 configuration error, 4 connection error, 5 fatal, 130 interrupted.

pub mod health;
pub mod init;
pub mod run;
pub mod status;
pub mod validate;
