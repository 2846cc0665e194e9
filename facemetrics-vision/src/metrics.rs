//! Geometric measurements over eye contours.

use thiserror::Error;

use crate::face::{ContourType, DetectedFace, Point};

/// First eye corner in an eye contour.
pub const EYE_CORNER_START: usize = 0;
/// Opposite eye corner, halfway round a 16-point eye contour.
pub const EYE_CORNER_MID: usize = 8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RatioError {
    #[error("no {0} contour")]
    MissingContour(ContourType),

    #[error("{contour} contour has {len} points, point {index} is required")]
    MissingPoint {
        contour: ContourType,
        index: usize,
        len: usize,
    },

    #[error("lex and rex coincide")]
    DegenerateExDistance,
}

/// Corner points used by [`eye_distance_ratio`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeCorners {
    /// Left eye, contour point 0.
    pub lex: Point,
    /// Left eye, contour point 8.
    pub len: Point,
    /// Right eye, contour point 8.
    pub rex: Point,
    /// Right eye, contour point 0.
    pub ren: Point,
}

impl EyeCorners {
    pub fn from_face(face: &DetectedFace) -> Result<Self, RatioError> {
        let left = face
            .contour(ContourType::LeftEye)
            .ok_or(RatioError::MissingContour(ContourType::LeftEye))?;
        let right = face
            .contour(ContourType::RightEye)
            .ok_or(RatioError::MissingContour(ContourType::RightEye))?;

        Ok(Self {
            lex: contour_point(ContourType::LeftEye, left, EYE_CORNER_START)?,
            len: contour_point(ContourType::LeftEye, left, EYE_CORNER_MID)?,
            rex: contour_point(ContourType::RightEye, right, EYE_CORNER_MID)?,
            ren: contour_point(ContourType::RightEye, right, EYE_CORNER_START)?,
        })
    }

    /// `|len - ren|`
    pub fn length_en(&self) -> f64 {
        self.len.distance(&self.ren)
    }

    /// `|lex - rex|`
    pub fn length_ex(&self) -> f64 {
        self.lex.distance(&self.rex)
    }

    pub fn ratio(&self) -> Result<f64, RatioError> {
        let length_ex = self.length_ex();
        if length_ex == 0.0 {
            return Err(RatioError::DegenerateExDistance);
        }
        Ok(self.length_en() / length_ex)
    }
}

fn contour_point(contour: ContourType, points: &[Point], index: usize) -> Result<Point, RatioError> {
    points.get(index).copied().ok_or(RatioError::MissingPoint {
        contour,
        index,
        len: points.len(),
    })
}

/// The en-en / ex-ex ratio of a face.
///
/// Both eye contours must be present with at least nine points each.
pub fn eye_distance_ratio(face: &DetectedFace) -> Result<f64, RatioError> {
    EyeCorners::from_face(face)?.ratio()
}
