pub mod detector;
pub mod face;
pub mod metrics;
pub mod model;
pub mod overlay;
pub mod processor;
pub mod tracker;
pub mod yunet;

// Re-export commonly used types
pub use detector::{DetectorOptions, FaceDetector, YuNetDetector};
pub use face::{BoundingBox, ContourType, DetectedFace, LandmarkType, Point};
pub use metrics::{eye_distance_ratio, RatioError};
pub use overlay::{FaceGraphic, Graphic, GraphicOverlay};
pub use processor::{FaceDetectorProcessor, FaceReport};
