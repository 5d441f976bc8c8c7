pub mod base;
mod bridge;

pub use base::{SpeechParams, Synthesizer};
pub use bridge::SynthesisBridge;
