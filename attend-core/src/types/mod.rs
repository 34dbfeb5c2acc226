//! Core attendance types

mod ids;
mod participant;
mod record;
mod schedule;

pub use ids::*;
pub use participant::*;
pub use record::*;
pub use schedule::*;
