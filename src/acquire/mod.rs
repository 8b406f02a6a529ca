//! Image acquisition domain — candidate validation and decode.
//!
//! A candidate file (picker or drag-and-drop) is validated here before any
//! session state changes, then decoded off the main task into a
//! [`SourceImage`]. External code should only use what is re-exported here.

mod candidate;
mod decode;

pub use candidate::{AcquireError, CandidateFile};
pub use decode::{decode_candidate, SourceImage};
