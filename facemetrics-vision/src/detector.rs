use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::face::{BoundingBox, DetectedFace, LandmarkType, Point};
use crate::tracker::Tracker;
use crate::yunet::{self, RawDetection};

/// A source of per-frame face records.
pub trait FaceDetector {
    /// Run detection on one frame.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>>;

    /// Release the underlying model. Called once at teardown.
    fn close(&mut self);
}

/// YuNet input canvas edge in pixels.
pub const INPUT_SIZE: u32 = 640;

/// Ratio of (nose - eye line) to (mouth - eye line) for a level head.
const NEUTRAL_NOSE_DEPTH: f32 = 0.55;

/// YuNet keypoint order: subject's right eye, left eye, nose, right and left
/// mouth corners.
const KEYPOINT_LANDMARKS: [LandmarkType; yunet::NUM_KEYPOINTS] = [
    LandmarkType::RightEye,
    LandmarkType::LeftEye,
    LandmarkType::NoseBase,
    LandmarkType::MouthRight,
    LandmarkType::MouthLeft,
];

#[derive(Debug, Clone)]
pub struct DetectorOptions {
    pub score_threshold: f32,
    /// Values `>= 1.0` disable NMS.
    pub nms_threshold: f32,
    pub tracking: bool,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.6,
            nms_threshold: 0.3,
            tracking: true,
        }
    }
}

/// Face detector backed by a YuNet ONNX model.
pub struct YuNetDetector {
    session: Option<Session>,
    options: DetectorOptions,
    tracker: Tracker,
}

impl YuNetDetector {
    pub fn new(model: &Path, options: DetectorOptions) -> Result<Self> {
        let session = crate::model::detector_session(model)?;
        log::debug!("Face detector options: {:?}", options);
        Ok(Self {
            session: Some(session),
            options,
            tracker: Tracker::default(),
        })
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>> {
        let session = self
            .session
            .as_mut()
            .context("detector has been closed")?;

        let letterbox = Letterbox::fit(image.dimensions(), INPUT_SIZE);
        let input = letterbox.tensor(image)?;
        let outputs = session.run(ort::inputs![Value::from_array(input)?])?;

        let mut output_data: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
        for (_name, output) in outputs.iter() {
            let (shape, data) = output.try_extract_tensor::<f32>()?;
            output_data.push((shape.iter().copied().collect(), data.to_vec()));
        }
        let output_refs: Vec<(&[i64], &[f32])> = output_data
            .iter()
            .map(|(s, d)| (s.as_slice(), d.as_slice()))
            .collect();

        let maps = yunet::parse_outputs(&output_refs, INPUT_SIZE as usize)
            .context("parsing yunet outputs")?;
        let mut raw = yunet::decode(&maps, self.options.score_threshold, INPUT_SIZE as usize)?;
        if self.options.nms_threshold < 1.0 {
            raw = yunet::nms(raw, self.options.nms_threshold);
        }

        let mut faces: Vec<DetectedFace> = raw
            .into_iter()
            .map(|d| to_face(&letterbox.restore(d)))
            .collect();

        if self.options.tracking {
            self.tracker.assign(&mut faces);
        }

        Ok(faces)
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            self.tracker.reset();
            log::debug!("face detector closed");
        }
    }
}

/// Aspect-preserving resize into a square canvas, centred with black padding.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    pub size: u32,
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Letterbox {
    pub fn fit((width, height): (u32, u32), size: u32) -> Self {
        let scale = size as f32 / width.max(height).max(1) as f32;
        let new_width = ((width as f32 * scale) as u32).min(size);
        let new_height = ((height as f32 * scale) as u32).min(size);
        Self {
            size,
            scale,
            offset_x: (size - new_width) / 2,
            offset_y: (size - new_height) / 2,
            width: new_width,
            height: new_height,
        }
    }

    /// `[1, 3, size, size]` BGR planar input with values in [0, 255].
    pub fn tensor(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        let resized =
            image.resize_exact(self.width, self.height, image::imageops::FilterType::Triangle);
        let mut canvas = DynamicImage::new_rgb8(self.size, self.size);
        image::imageops::overlay(
            &mut canvas,
            &resized,
            self.offset_x as i64,
            self.offset_y as i64,
        );
        let rgb = canvas.to_rgb8();

        let pixel_count = (self.size * self.size) as usize;
        let mut input_data = vec![0.0f32; 3 * pixel_count];
        let (b_channel, rest) = input_data.split_at_mut(pixel_count);
        let (g_channel, r_channel) = rest.split_at_mut(pixel_count);
        for (i, px) in rgb.as_raw().chunks_exact(3).enumerate() {
            r_channel[i] = px[0] as f32;
            g_channel[i] = px[1] as f32;
            b_channel[i] = px[2] as f32;
        }

        Ok(Array4::from_shape_vec(
            (1, 3, self.size as usize, self.size as usize),
            input_data,
        )?)
    }

    pub fn restore_point(&self, x: f32, y: f32) -> Point {
        Point::new(
            (x - self.offset_x as f32) / self.scale,
            (y - self.offset_y as f32) / self.scale,
        )
    }

    /// Map a canvas-space detection back to source image pixels.
    pub fn restore(&self, d: RawDetection) -> RawDetection {
        let origin = self.restore_point(d.bbox[0], d.bbox[1]);
        let mut keypoints = d.keypoints;
        for k in keypoints.chunks_exact_mut(2) {
            let p = self.restore_point(k[0], k[1]);
            k[0] = p.x;
            k[1] = p.y;
        }
        RawDetection {
            bbox: [
                origin.x,
                origin.y,
                d.bbox[2] / self.scale,
                d.bbox[3] / self.scale,
            ],
            score: d.score,
            keypoints,
        }
    }
}

/// Build a face record from a decoded detection in image coordinates.
pub fn to_face(d: &RawDetection) -> DetectedFace {
    let mut face = DetectedFace::new(BoundingBox::from_xywh(d.bbox));
    for (kind, xy) in KEYPOINT_LANDMARKS.iter().zip(d.keypoints.chunks_exact(2)) {
        face.landmarks.insert(*kind, Point::new(xy[0], xy[1]));
    }

    if let Some(pose) = estimate_pose(&face) {
        face.head_euler_angle_x = pose.pitch;
        face.head_euler_angle_y = pose.yaw;
        face.head_euler_angle_z = pose.roll;
    }
    face
}

/// Head rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// Rough head pose from five landmarks.
///
/// Roll is the eye-line angle (counter-clockwise positive as seen in the
/// image). Yaw and pitch come from where the nose sits relative to the eyes
/// and mouth, measured along and across the eye line.
pub fn estimate_pose(face: &DetectedFace) -> Option<Pose> {
    let right_eye = face.landmark(LandmarkType::RightEye)?;
    let left_eye = face.landmark(LandmarkType::LeftEye)?;
    let nose = face.landmark(LandmarkType::NoseBase)?;
    let mouth_right = face.landmark(LandmarkType::MouthRight)?;
    let mouth_left = face.landmark(LandmarkType::MouthLeft)?;

    let eye_dx = left_eye.x - right_eye.x;
    let eye_dy = left_eye.y - right_eye.y;
    let eye_dist = (eye_dx * eye_dx + eye_dy * eye_dy).sqrt();
    if eye_dist <= f32::EPSILON {
        return None;
    }
    let (ux, uy) = (eye_dx / eye_dist, eye_dy / eye_dist);
    // Perpendicular pointing down the face
    let (vx, vy) = (-uy, ux);

    let eye_mid = Point::new((left_eye.x + right_eye.x) / 2.0, (left_eye.y + right_eye.y) / 2.0);
    let mouth_mid = Point::new(
        (mouth_left.x + mouth_right.x) / 2.0,
        (mouth_left.y + mouth_right.y) / 2.0,
    );

    let (nx, ny) = (nose.x - eye_mid.x, nose.y - eye_mid.y);
    let along = (nx * ux + ny * uy) / eye_dist;
    let nose_down = nx * vx + ny * vy;
    let mouth_down = (mouth_mid.x - eye_mid.x) * vx + (mouth_mid.y - eye_mid.y) * vy;

    let roll = -eye_dy.atan2(eye_dx).to_degrees();
    let yaw = (2.0 * along).clamp(-1.0, 1.0).asin().to_degrees();
    let pitch = if mouth_down.abs() > f32::EPSILON {
        let depth = nose_down / mouth_down;
        -(2.0 * (depth - NEUTRAL_NOSE_DEPTH))
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees()
    } else {
        0.0
    };

    Some(Pose { pitch, yaw, roll })
}
