//! Per-frame face records as produced by a detection provider.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Integer bounding box in image coordinates (right and bottom exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Round an `x, y, w, h` float box to integer edges.
    pub fn from_xywh(bbox: [f32; 4]) -> Self {
        let [x, y, w, h] = bbox;
        Self {
            left: x.round() as i32,
            top: y.round() as i32,
            right: (x + w).round() as i32,
            bottom: (y + h).round() as i32,
        }
    }

    /// Widened so boxes spanning the whole `i32` range do not overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.right) - i64::from(self.left)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.bottom) - i64::from(self.top)
    }

    /// Space separated `left top right bottom`.
    pub fn flatten_to_string(&self) -> String {
        format!("{} {} {} {}", self.left, self.top, self.right, self.bottom)
    }

    /// Intersection over union with another box, 0.0 when disjoint.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.left.max(other.left);
        let y1 = self.top.max(other.top);
        let x2 = self.right.min(other.right);
        let y2 = self.bottom.min(other.bottom);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter_w = (i64::from(x2) - i64::from(x1)) as f64;
        let inter_h = (i64::from(y2) - i64::from(y1)) as f64;
        let inter = inter_w * inter_h;
        let area_a = self.width() as f64 * self.height() as f64;
        let area_b = other.width() as f64 * other.height() as f64;
        (inter / (area_a + area_b - inter)) as f32
    }
}

/// Single named key points on a face, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandmarkType {
    MouthBottom,
    MouthRight,
    MouthLeft,
    RightEye,
    LeftEye,
    RightEar,
    LeftEar,
    RightCheek,
    LeftCheek,
    NoseBase,
}

impl LandmarkType {
    pub const ALL: [LandmarkType; 10] = [
        LandmarkType::MouthBottom,
        LandmarkType::MouthRight,
        LandmarkType::MouthLeft,
        LandmarkType::RightEye,
        LandmarkType::LeftEye,
        LandmarkType::RightEar,
        LandmarkType::LeftEar,
        LandmarkType::RightCheek,
        LandmarkType::LeftCheek,
        LandmarkType::NoseBase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LandmarkType::MouthBottom => "MOUTH_BOTTOM",
            LandmarkType::MouthRight => "MOUTH_RIGHT",
            LandmarkType::MouthLeft => "MOUTH_LEFT",
            LandmarkType::RightEye => "RIGHT_EYE",
            LandmarkType::LeftEye => "LEFT_EYE",
            LandmarkType::RightEar => "RIGHT_EAR",
            LandmarkType::LeftEar => "LEFT_EAR",
            LandmarkType::RightCheek => "RIGHT_CHEEK",
            LandmarkType::LeftCheek => "LEFT_CHEEK",
            LandmarkType::NoseBase => "NOSE_BASE",
        }
    }
}

impl fmt::Display for LandmarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered boundary outlines of facial features.
///
/// Eye contours have 16 points, with the two eye corners at indices 0 and 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContourType {
    Face,
    LeftEyebrowTop,
    LeftEyebrowBottom,
    RightEyebrowTop,
    RightEyebrowBottom,
    LeftEye,
    RightEye,
    UpperLipTop,
    UpperLipBottom,
    LowerLipTop,
    LowerLipBottom,
    NoseBridge,
    NoseBottom,
    LeftCheek,
    RightCheek,
}

impl ContourType {
    pub fn name(&self) -> &'static str {
        match self {
            ContourType::Face => "FACE",
            ContourType::LeftEyebrowTop => "LEFT_EYEBROW_TOP",
            ContourType::LeftEyebrowBottom => "LEFT_EYEBROW_BOTTOM",
            ContourType::RightEyebrowTop => "RIGHT_EYEBROW_TOP",
            ContourType::RightEyebrowBottom => "RIGHT_EYEBROW_BOTTOM",
            ContourType::LeftEye => "LEFT_EYE",
            ContourType::RightEye => "RIGHT_EYE",
            ContourType::UpperLipTop => "UPPER_LIP_TOP",
            ContourType::UpperLipBottom => "UPPER_LIP_BOTTOM",
            ContourType::LowerLipTop => "LOWER_LIP_TOP",
            ContourType::LowerLipBottom => "LOWER_LIP_BOTTOM",
            ContourType::NoseBridge => "NOSE_BRIDGE",
            ContourType::NoseBottom => "NOSE_BOTTOM",
            ContourType::LeftCheek => "LEFT_CHEEK",
            ContourType::RightCheek => "RIGHT_CHEEK",
        }
    }
}

impl fmt::Display for ContourType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One detected face for a single frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub bounding_box: BoundingBox,
    /// Pitch in degrees.
    #[serde(default)]
    pub head_euler_angle_x: f32,
    /// Yaw in degrees.
    #[serde(default)]
    pub head_euler_angle_y: f32,
    /// Roll in degrees.
    #[serde(default)]
    pub head_euler_angle_z: f32,
    #[serde(default)]
    pub landmarks: BTreeMap<LandmarkType, Point>,
    #[serde(default)]
    pub contours: BTreeMap<ContourType, Vec<Point>>,
    #[serde(default)]
    pub left_eye_open_probability: Option<f32>,
    #[serde(default)]
    pub right_eye_open_probability: Option<f32>,
    #[serde(default)]
    pub smiling_probability: Option<f32>,
    /// Assigned by the detector; stable across frames for the same face.
    #[serde(default)]
    pub tracking_id: Option<i32>,
}

impl DetectedFace {
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            ..Default::default()
        }
    }

    pub fn landmark(&self, kind: LandmarkType) -> Option<Point> {
        self.landmarks.get(&kind).copied()
    }

    pub fn contour(&self, kind: ContourType) -> Option<&[Point]> {
        self.contours.get(&kind).map(Vec::as_slice)
    }

    pub fn with_landmark(mut self, kind: LandmarkType, point: Point) -> Self {
        self.landmarks.insert(kind, point);
        self
    }

    pub fn with_contour(mut self, kind: ContourType, points: Vec<Point>) -> Self {
        self.contours.insert(kind, points);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(10, 10, 30, 30);
        let b = BoundingBox::new(15, 15, 35, 35);
        let iou = a.iou(&b);
        assert!(iou > 0.0 && iou < 1.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        // No overlap
        let c = BoundingBox::new(100, 100, 110, 110);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_extreme_boxes() {
        let wide = BoundingBox::new(-2_000_000_000, -2_000_000_000, 2_000_000_000, 2_000_000_000);
        assert_eq!(wide.width(), 4_000_000_000);
        assert_eq!(wide.height(), 4_000_000_000);
        assert!((wide.iou(&wide) - 1.0).abs() < 1e-6);

        let small = BoundingBox::new(0, 0, 10, 10);
        let iou = wide.iou(&small);
        assert!(iou > 0.0 && iou < 1e-9);
    }

    #[test]
    fn test_flatten_to_string() {
        let bbox = BoundingBox::from_xywh([10.4, 20.6, 100.0, 50.0]);
        assert_eq!(bbox.flatten_to_string(), "10 21 110 71");
        assert_eq!(bbox.width(), 100);
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_face() {
        let json = r#"{
            "boundingBox": {"left": 1, "top": 2, "right": 3, "bottom": 4},
            "headEulerAngleZ": 12.5,
            "landmarks": {"NOSE_BASE": {"x": 5.0, "y": 6.0}},
            "contours": {"LEFT_EYE": [{"x": 0.0, "y": 0.0}]},
            "smilingProbability": 0.25,
            "trackingId": 7
        }"#;
        let face: DetectedFace = serde_json::from_str(json).unwrap();
        assert_eq!(face.bounding_box, BoundingBox::new(1, 2, 3, 4));
        assert_eq!(face.head_euler_angle_z, 12.5);
        assert_eq!(face.landmark(LandmarkType::NoseBase), Some(Point::new(5.0, 6.0)));
        assert!(face.landmark(LandmarkType::LeftEar).is_none());
        assert_eq!(face.contour(ContourType::LeftEye).map(|c| c.len()), Some(1));
        assert!(face.left_eye_open_probability.is_none());
        assert_eq!(face.tracking_id, Some(7));
    }
}
