//! Snapcrop — deterministic crop-and-upload pipeline for user-supplied images.
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! acquire (validate + decode) → crop region → rasterize → gate (dedupe) → dispatch
//! ```
//!
//! Each stage lives in its own module; [`session::EditorSession`] wires them
//! together and owns all mutable state, including the last-write-wins
//! sequencing for in-flight decodes and rasterizations. Nothing in this crate
//! is ambient or static — multiple sessions can coexist.

pub mod acquire;
pub mod config;
pub mod crop;
pub mod dispatch;
pub mod gate;
pub mod session;

pub use acquire::{AcquireError, CandidateFile, SourceImage};
pub use config::{OutputFormat, PipelineConfig};
pub use crop::{rasterize, CropRegion, CropUnit, RasterError, RasterizedCrop};
pub use dispatch::{DispatchError, HttpUploadSink, UploadPayload, UploadSink};
pub use gate::{content_digest, DispatchGate};
pub use session::{
    DecodeOutcome, DecodeTicket, EditorSession, PipelineError, RasterJob, SubmitOutcome,
};
