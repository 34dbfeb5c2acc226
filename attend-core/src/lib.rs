//! Attend Core - QR attendance verification and classification engine
//!
//! This crate holds the logic that decides what a scanned QR code means:
//! - Signature codec: issue, encode, decode and verify self-certifying payloads
//! - Schedule classifier: PRESENT vs LATE against a start time and grace period
//! - Session resolver: the per-day arrival/departure state machine
//!
//! Storage, enrollment and presentation live outside this crate and are
//! reached only through the collaborator traits in [`store`].

pub mod classify;
pub mod codec;
pub mod debounce;
pub mod error;
pub mod logging;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod store;
pub mod types;

pub use classify::*;
pub use codec::*;
pub use debounce::*;
pub use error::*;
pub use policy::*;
pub use report::*;
pub use resolver::*;
pub use store::*;
pub use types::*;
