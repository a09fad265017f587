//! Core types, config, errors, storage, session and routing for Tasklane.

pub mod config;
pub mod error;
pub mod navigation;
pub mod preferences;
pub mod routes;
pub mod session;
pub mod storage;
pub mod types;
pub mod views;
