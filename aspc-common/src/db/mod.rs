//! Database initialization for the shared command store

pub mod init;

pub use init::*;
