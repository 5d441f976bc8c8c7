pub mod base;
mod bridge;

pub use base::{
    RecognitionCallback, RecognitionEvent, RecognizedSegment, Recognizer, RecognizerFault,
    RecognizerOptions,
};
pub use bridge::RecognitionBridge;
