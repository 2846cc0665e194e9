//! Per-frame face metrics: diagnostics, eye ratio and overlay graphics.

use std::fmt::Display;

use image::DynamicImage;
use log::{debug, error, info};
use thiserror::Error;

use crate::detector::FaceDetector;
use crate::face::{ContourType, DetectedFace, LandmarkType};
use crate::metrics::{self, RatioError};
use crate::overlay::{FaceGraphic, GraphicOverlay};

/// Log target for the per-face diagnostic lines.
pub const MANUAL_TESTING_LOG: &str = "facemetrics::manual_testing";

#[derive(Error, Debug)]
pub enum Error {
    #[error("processor has been stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Active,
    Stopped,
}

/// Outcome for one face of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceReport {
    pub tracking_id: Option<i32>,
    /// `None` when the face has no left-eye contour.
    pub eye_ratio: Option<Result<f64, RatioError>>,
}

impl FaceReport {
    pub fn ratio(&self) -> Option<f64> {
        self.eye_ratio.as_ref().and_then(|r| r.as_ref().ok().copied())
    }
}

/// Turns detector results into log lines, eye ratios and overlay graphics.
pub struct FaceDetectorProcessor<D: FaceDetector> {
    detector: D,
    state: State,
    latest_ratio: Option<f64>,
}

impl<D: FaceDetector> FaceDetectorProcessor<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            state: State::Active,
            latest_ratio: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Ratio of the most recent face that produced one, across all frames.
    pub fn latest_ratio(&self) -> Option<f64> {
        self.latest_ratio
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Detect faces in `image` and hand the outcome to the result callbacks.
    ///
    /// A detection failure is logged and yields an empty report list.
    pub fn process_frame(
        &mut self,
        image: &DynamicImage,
        overlay: &mut GraphicOverlay,
    ) -> Result<Vec<FaceReport>, Error> {
        if self.state == State::Stopped {
            return Err(Error::Stopped);
        }
        match self.detector.detect(image) {
            Ok(faces) => Ok(self.on_frame_result(&faces, overlay)),
            Err(e) => {
                self.on_detection_failure(&e);
                Ok(Vec::new())
            }
        }
    }

    /// Handle the completed face list of one frame.
    ///
    /// Adds exactly one graphic per face. Ignored once stopped.
    pub fn on_frame_result(
        &mut self,
        faces: &[DetectedFace],
        overlay: &mut GraphicOverlay,
    ) -> Vec<FaceReport> {
        if self.state == State::Stopped {
            debug!("ignoring {} face(s) delivered after stop", faces.len());
            return Vec::new();
        }

        let mut reports = Vec::with_capacity(faces.len());
        for face in faces {
            log_extras(face);

            let eye_ratio = face
                .contour(ContourType::LeftEye)
                .map(|_| self.log_face_stat(face));

            let ratio = eye_ratio.as_ref().and_then(|r| r.as_ref().ok().copied());
            overlay.add(FaceGraphic::new(face.clone(), ratio));

            reports.push(FaceReport {
                tracking_id: face.tracking_id,
                eye_ratio,
            });
        }
        reports
    }

    pub fn on_detection_failure(&self, err: &dyn Display) {
        error!("Face detection failed {:#}", err);
    }

    /// Release the detector. Only the first call has an effect.
    pub fn stop(&mut self) {
        if self.state == State::Stopped {
            return;
        }
        self.detector.close();
        self.state = State::Stopped;
    }

    fn log_face_stat(&mut self, face: &DetectedFace) -> Result<f64, RatioError> {
        let ratio = metrics::eye_distance_ratio(face);
        match &ratio {
            Ok(value) => {
                self.latest_ratio = Some(*value);
                info!(target: MANUAL_TESTING_LOG, "en-en/ex-ex ratio is {}", value);
            }
            Err(e) => {
                info!(target: MANUAL_TESTING_LOG, "en-en/ex-ex ratio unavailable: {}", e);
            }
        }
        ratio
    }
}

impl<D: FaceDetector> Drop for FaceDetectorProcessor<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}

fn log_extras(face: &DetectedFace) {
    debug!(target: MANUAL_TESTING_LOG, "face bounding box: {}", face.bounding_box.flatten_to_string());
    debug!(target: MANUAL_TESTING_LOG, "face Euler Angle X: {}", face.head_euler_angle_x);
    debug!(target: MANUAL_TESTING_LOG, "face Euler Angle Y: {}", face.head_euler_angle_y);
    debug!(target: MANUAL_TESTING_LOG, "face Euler Angle Z: {}", face.head_euler_angle_z);

    for kind in LandmarkType::ALL {
        match face.landmark(kind) {
            Some(p) => debug!(
                target: MANUAL_TESTING_LOG,
                "Position for face landmark: {} is :x: {:.6} , y: {:.6}", kind, p.x, p.y
            ),
            None => debug!(
                target: MANUAL_TESTING_LOG,
                "No landmark of type: {} has been detected", kind
            ),
        }
    }

    debug!(
        target: MANUAL_TESTING_LOG,
        "face left eye open probability: {}",
        opt(face.left_eye_open_probability)
    );
    debug!(
        target: MANUAL_TESTING_LOG,
        "face right eye open probability: {}",
        opt(face.right_eye_open_probability)
    );
    debug!(target: MANUAL_TESTING_LOG, "face smiling probability: {}", opt(face.smiling_probability));
    debug!(target: MANUAL_TESTING_LOG, "face tracking id: {}", opt(face.tracking_id));
}
