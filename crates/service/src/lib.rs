//! Service layer for the identifier registry.
//! - Record store operations on top of interchangeable storage backends.
//! - Master-key access control and API-key attribution.
//! - Clear error types mapped to HTTP statuses by the server crate.

pub mod errors;
pub mod access;
pub mod keys;
#[cfg(test)]
pub mod test_support;
pub mod storage;
pub mod records;
