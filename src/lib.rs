pub mod config;
pub mod replay;

// Re-export vision types for convenience
pub use facemetrics_vision::{
    face, overlay, processor, DetectedFace, FaceDetectorProcessor, FaceReport, GraphicOverlay,
};
