//! Common error handling utilities for CareLedger
//!
//! Every CareLedger crate defines its own `thiserror` enum; this crate gives
//! them a shared vocabulary so the request layer can translate any failure
//! into a response without knowing which crate produced it.
//!
//! # Error Categories
//!
//! - **InvalidInput**: malformed timestamps, out-of-range parameters, illegal
//!   appointment transitions
//! - **NotFound**: unknown or foreign records
//! - **DoctorUnavailable** / **CapacityExceeded**: appointment admission
//! - **InsufficientStock**: medicine admission
//! - **PersistenceFailure**: storage errors, always rolled back
//!
//! # Example
//!
//! ```rust
//! use error_common::{Classify, ErrorKind, ErrorReport};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("doctor is off shift")]
//! struct OffShift;
//!
//! impl Classify for OffShift {
//!     fn kind(&self) -> ErrorKind {
//!         ErrorKind::DoctorUnavailable
//!     }
//! }
//!
//! let report = ErrorReport::from_error(&OffShift);
//! assert_eq!(report.code, "SCHEDULING_5001");
//! ```

pub mod codes;
pub mod types;

pub use types::*;
