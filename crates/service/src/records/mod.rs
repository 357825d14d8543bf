//! Identifier record store: domain types, storage backends and the
//! application service enforcing validation, attribution and access rules.

pub mod domain;
pub mod repository;
pub mod seaorm;
pub mod file;
pub mod transfer;
pub mod service;

pub use domain::{ImportReport, ListQuery, Record, RecordPage, SubmitOutcome};
pub use repository::RecordRepository;
pub use service::RecordService;
