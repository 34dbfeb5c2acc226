//! Attend API Server
//!
//! REST surface over the scan resolver and the reference store.
//!
//! ## Endpoints
//!
//! ### Scanning
//! - POST /api/v1/scans - Submit a scanned payload for an activity
//!
//! ### Participants
//! - POST /api/v1/participants - Enroll participant
//! - GET /api/v1/participants?owner_id= - List an owner's roster
//! - GET /api/v1/participants/:participant_id - Get participant
//! - GET /api/v1/participants/:participant_id/qr - Issue a signed QR payload
//!
//! ### Activities
//! - POST /api/v1/activities - Create activity
//! - GET /api/v1/activities?owner_id= - List an owner's activities
//! - GET /api/v1/activities/:activity_id - Get activity
//! - PUT /api/v1/activities/:activity_id - Update activity
//! - DELETE /api/v1/activities/:activity_id - Delete activity
//!
//! ### Attendance
//! - GET /api/v1/attendance?owner_id= - List records (newest first)
//! - GET /api/v1/attendance/stats?owner_id= - Summary statistics
//! - GET /api/v1/attendance/:record_id - Get record
//! - DELETE /api/v1/attendance/:record_id - Delete record (admin token)

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use dto::*;
pub use error::*;
pub use routes::*;
pub use server::*;
pub use state::*;
