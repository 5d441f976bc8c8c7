pub mod base;
mod pipeline;

pub use base::{CaptureConstraints, CaptureDevice, CaptureStream, EnergyAnalyzer};
pub use pipeline::CapturePipeline;
