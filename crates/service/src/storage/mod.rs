//! Storage abstractions for service layer
//!
//! File-backed document store used by the JSON record backend.

pub mod json_file_store;
