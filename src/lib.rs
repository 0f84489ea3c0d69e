//! rehook — keeps instrumentation hook scripts attached to restarting
//! mobile app processes.
//!
//! A line-oriented configuration file maps application package names to
//! hook script files. A background census task refreshes the device's
//! process list once per second while the supervisor loop re-attaches the
//! matching script to any newly observed instance of a monitored package.

pub mod census;
pub mod cli;
pub mod config;
pub mod device;
pub mod errors;
pub mod shutdown;
pub mod supervisor;

pub use errors::{AppError, Result};
