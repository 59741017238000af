//! Data types for B-Route entities.
//!
//! This module contains the data structures passed between the join, the
//! codec and the caller:
//! - Credentials and joined sessions
//! - Active scan results
//! - Meter readings and acquisition records

pub mod reading;
pub mod scan;
pub mod session;

pub use reading::{AcquisitionRecord, MeterReading};
pub use scan::ScanResult;
pub use session::{Credentials, Peer, Session};
