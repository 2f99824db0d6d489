//! Enrollment workflow engine for a municipal urban-development voter program.
//!
//! Citizens enroll through a multi-step wizard; the hard parts live in
//! [`workflows::enrollment`]: a perimeter engine answering point-in-polygon
//! eligibility queries against the fixed program boundary, and a step machine
//! that gates wizard progression on per-step validation (including the
//! geofence check on the address step).

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
