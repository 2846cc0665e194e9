//! Drawables layered over a camera frame.

use image::{Rgb, RgbImage};
use imageproc::{drawing, rect::Rect};

use crate::face::{BoundingBox, DetectedFace};

/// Something that can paint itself onto a frame.
pub trait Graphic: Send {
    fn draw(&self, canvas: &mut RgbImage);
}

/// Ordered collection of graphics drawn over a frame.
#[derive(Default)]
pub struct GraphicOverlay {
    graphics: Vec<Box<dyn Graphic>>,
}

impl GraphicOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, graphic: impl Graphic + 'static) {
        self.graphics.push(Box::new(graphic));
    }

    pub fn clear(&mut self) {
        self.graphics.clear();
    }

    pub fn len(&self) -> usize {
        self.graphics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty()
    }

    /// Draw every graphic in insertion order.
    pub fn render(&self, canvas: &mut RgbImage) {
        for graphic in &self.graphics {
            graphic.draw(canvas);
        }
    }
}

const COLORS: [[u8; 3]; 7] = [
    [255, 255, 255],
    [0, 0, 255],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 0],
    [255, 0, 255],
    [255, 255, 0],
];

const LANDMARK_RADIUS: i32 = 3;

/// A face outline with its landmarks and contours.
#[derive(Debug, Clone)]
pub struct FaceGraphic {
    face: DetectedFace,
    eye_ratio: Option<f64>,
}

impl FaceGraphic {
    pub fn new(face: DetectedFace, eye_ratio: Option<f64>) -> Self {
        Self { face, eye_ratio }
    }

    pub fn face(&self) -> &DetectedFace {
        &self.face
    }

    pub fn eye_ratio(&self) -> Option<f64> {
        self.eye_ratio
    }

    /// Colour picked by tracking id so a face keeps its colour across frames.
    pub fn color(&self) -> Rgb<u8> {
        let idx = self
            .face
            .tracking_id
            .map(|id| id.rem_euclid(COLORS.len() as i32) as usize)
            .unwrap_or(0);
        Rgb(COLORS[idx])
    }
}

impl Graphic for FaceGraphic {
    fn draw(&self, canvas: &mut RgbImage) {
        let color = self.color();

        if let Some(rect) = canvas_rect(&self.face.bounding_box, canvas.width(), canvas.height()) {
            drawing::draw_hollow_rect_mut(canvas, rect, color);
        }

        for points in self.face.contours.values() {
            for pair in points.windows(2) {
                drawing::draw_line_segment_mut(
                    canvas,
                    (pair[0].x, pair[0].y),
                    (pair[1].x, pair[1].y),
                    color,
                );
            }
        }

        for point in self.face.landmarks.values() {
            drawing::draw_filled_circle_mut(
                canvas,
                (point.x.round() as i32, point.y.round() as i32),
                LANDMARK_RADIUS,
                color,
            );
        }
    }
}

/// The box clipped to one pixel beyond each canvas edge, so edges outside
/// the canvas stay undrawn. `None` for empty or inverted boxes.
fn canvas_rect(bbox: &BoundingBox, width: u32, height: u32) -> Option<Rect> {
    if bbox.width() <= 0 || bbox.height() <= 0 {
        return None;
    }
    let (w, h) = (i64::from(width), i64::from(height));
    let left = i64::from(bbox.left).clamp(-1, w + 1);
    let right = i64::from(bbox.right).clamp(-1, w + 1);
    let top = i64::from(bbox.top).clamp(-1, h + 1);
    let bottom = i64::from(bbox.bottom).clamp(-1, h + 1);
    if right <= left || bottom <= top {
        return None;
    }
    Some(
        Rect::at(i32::try_from(left).ok()?, i32::try_from(top).ok()?)
            .of_size(u32::try_from(right - left).ok()?, u32::try_from(bottom - top).ok()?),
    )
}
