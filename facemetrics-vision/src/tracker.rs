//! Frame-to-frame face identity by box overlap.

use crate::face::{BoundingBox, DetectedFace};

/// Minimum IoU with a previous-frame box to inherit its id.
pub const DEFAULT_MIN_IOU: f32 = 0.3;

/// Greedy IoU tracker.
///
/// Each frame, faces are matched against the previous frame's boxes, best
/// overlap first. A matched face keeps the old id; everything else gets a
/// fresh one. Faces missing from a frame are forgotten.
#[derive(Debug)]
pub struct Tracker {
    min_iou: f32,
    next_id: i32,
    previous: Vec<(i32, BoundingBox)>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_IOU)
    }
}

impl Tracker {
    pub fn new(min_iou: f32) -> Self {
        Self {
            min_iou,
            next_id: 0,
            previous: Vec::new(),
        }
    }

    /// Assign `tracking_id` on every face of the current frame.
    pub fn assign(&mut self, faces: &mut [DetectedFace]) {
        let mut pairs: Vec<(f32, usize, usize)> = Vec::new();
        for (fi, face) in faces.iter().enumerate() {
            for (pi, (_, prev)) in self.previous.iter().enumerate() {
                let iou = face.bounding_box.iou(prev);
                if iou >= self.min_iou {
                    pairs.push((iou, fi, pi));
                }
            }
        }
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut assigned: Vec<Option<i32>> = vec![None; faces.len()];
        let mut taken = vec![false; self.previous.len()];
        for (_, fi, pi) in pairs {
            if assigned[fi].is_some() || taken[pi] {
                continue;
            }
            assigned[fi] = Some(self.previous[pi].0);
            taken[pi] = true;
        }

        self.previous.clear();
        for (face, id) in faces.iter_mut().zip(assigned) {
            let id = id.unwrap_or_else(|| {
                let id = self.next_id;
                self.next_id += 1;
                id
            });
            face.tracking_id = Some(id);
            self.previous.push((id, face.bounding_box));
        }
    }

    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(left: i32, top: i32) -> DetectedFace {
        DetectedFace::new(BoundingBox::new(left, top, left + 100, top + 100))
    }

    #[test]
    fn test_keeps_id_for_overlapping_face() {
        let mut tracker = Tracker::default();

        let mut first = vec![face(0, 0), face(300, 0)];
        tracker.assign(&mut first);
        assert_eq!(first[0].tracking_id, Some(0));
        assert_eq!(first[1].tracking_id, Some(1));

        // Order swapped and slightly moved
        let mut second = vec![face(305, 5), face(10, 0)];
        tracker.assign(&mut second);
        assert_eq!(second[0].tracking_id, Some(1));
        assert_eq!(second[1].tracking_id, Some(0));
    }

    #[test]
    fn test_new_face_gets_fresh_id() {
        let mut tracker = Tracker::default();
        let mut first = vec![face(0, 0)];
        tracker.assign(&mut first);

        let mut second = vec![face(500, 500)];
        tracker.assign(&mut second);
        assert_eq!(second[0].tracking_id, Some(1));

        // Face 0 was dropped in the second frame and does not come back
        let mut third = vec![face(0, 0)];
        tracker.assign(&mut third);
        assert_eq!(third[0].tracking_id, Some(2));
    }

    #[test]
    fn test_one_previous_box_matches_once() {
        let mut tracker = Tracker::default();
        let mut first = vec![face(0, 0)];
        tracker.assign(&mut first);

        let mut second = vec![face(0, 0), face(5, 5)];
        tracker.assign(&mut second);
        assert_eq!(second[0].tracking_id, Some(0));
        assert_eq!(second[1].tracking_id, Some(1));
    }
}
