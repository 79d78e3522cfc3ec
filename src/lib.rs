//! File-backed server for CAP alerts and an aggregated Atom alert feed.
//!
//! Alert documents are uploaded as XML files and kept verbatim on disk; a
//! batch job folds the alert directory into one Atom feed document, and the
//! HTTP layer serves both back.

pub mod aggregate;
pub mod alert;
pub mod atom;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
