//! Multi-frame runs through the processor with a scripted detector.
use anyhow::Result;
use facemetrics_vision::{
    processor::State, tracker::Tracker, BoundingBox, ContourType, DetectedFace, FaceDetector,
    FaceDetectorProcessor, GraphicOverlay, LandmarkType, Point,
};
use image::{DynamicImage, Rgb};

/// Yields the scripted frames, assigning tracking ids like a real detector.
struct ScriptedDetector {
    frames: Vec<Vec<DetectedFace>>,
    tracker: Tracker,
    closed: usize,
}

impl ScriptedDetector {
    fn new(mut frames: Vec<Vec<DetectedFace>>) -> Self {
        frames.reverse();
        Self {
            frames,
            tracker: Tracker::default(),
            closed: 0,
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<DetectedFace>> {
        let mut faces = self
            .frames
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no more frames"))?;
        self.tracker.assign(&mut faces);
        Ok(faces)
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}

fn eye(p0: Point, p8: Point) -> Vec<Point> {
    (0..16)
        .map(|i| match i {
            0 => p0,
            8 => p8,
            _ => Point::new((p0.x + p8.x) / 2.0, p0.y - 2.0),
        })
        .collect()
}

fn face_at(left: i32, eyes: Option<(f32, f32)>) -> DetectedFace {
    let mut face = DetectedFace::new(BoundingBox::new(left, 10, left + 60, 70))
        .with_landmark(LandmarkType::NoseBase, Point::new(left as f32 + 30.0, 45.0));
    if let Some((inner, outer)) = eyes {
        let cx = left as f32 + 30.0;
        face = face
            .with_contour(
                ContourType::LeftEye,
                eye(Point::new(cx - outer, 30.0), Point::new(cx - inner, 30.0)),
            )
            .with_contour(
                ContourType::RightEye,
                eye(Point::new(cx + inner, 30.0), Point::new(cx + outer, 30.0)),
            );
    }
    face
}

#[test]
fn test_frames_produce_graphics_and_ratios() -> Result<()> {
    env_logger::try_init().ok();

    let detector = ScriptedDetector::new(vec![
        vec![face_at(0, Some((5.0, 20.0))), face_at(100, None)],
        vec![],
        vec![face_at(2, None), face_at(102, Some((4.0, 20.0)))],
    ]);
    let mut processor = FaceDetectorProcessor::new(detector);
    let image = DynamicImage::new_rgb8(200, 100);

    let mut overlay = GraphicOverlay::new();
    let reports = processor.process_frame(&image, &mut overlay)?;
    assert_eq!(overlay.len(), 2);
    // en = 2 * 5, ex = 2 * 20
    assert!((reports[0].ratio().unwrap() - 0.25).abs() < 1e-9);
    assert_eq!(reports[1].eye_ratio, None);
    assert_eq!(processor.latest_ratio(), Some(0.25));

    let mut overlay = GraphicOverlay::new();
    assert!(processor.process_frame(&image, &mut overlay)?.is_empty());
    assert!(overlay.is_empty());
    assert_eq!(processor.latest_ratio(), Some(0.25));

    let mut overlay = GraphicOverlay::new();
    let reports = processor.process_frame(&image, &mut overlay)?;
    assert_eq!(overlay.len(), 2);
    assert_eq!(reports[0].eye_ratio, None);
    // en = 2 * 4, ex = 2 * 20
    assert!((reports[1].ratio().unwrap() - 0.2).abs() < 1e-9);
    assert!((processor.latest_ratio().unwrap() - 0.2).abs() < 1e-9);

    let mut canvas = image.to_rgb8();
    overlay.render(&mut canvas);
    assert_ne!(*canvas.get_pixel(2, 10), Rgb([0, 0, 0]));

    Ok(())
}

#[test]
fn test_tracking_ids_reach_reports() -> Result<()> {
    let detector = ScriptedDetector::new(vec![
        vec![face_at(0, None), face_at(100, None)],
        vec![face_at(103, None), face_at(1, None)],
    ]);
    let mut processor = FaceDetectorProcessor::new(detector);
    let image = DynamicImage::new_rgb8(200, 100);

    let first = processor.process_frame(&image, &mut GraphicOverlay::new())?;
    let second = processor.process_frame(&image, &mut GraphicOverlay::new())?;

    assert_eq!(first[0].tracking_id, Some(0));
    assert_eq!(first[1].tracking_id, Some(1));
    assert_eq!(second[0].tracking_id, Some(1));
    assert_eq!(second[1].tracking_id, Some(0));
    Ok(())
}

#[test]
fn test_stop_ends_processing() -> Result<()> {
    let detector = ScriptedDetector::new(vec![vec![face_at(0, Some((5.0, 20.0)))]; 3]);
    let mut processor = FaceDetectorProcessor::new(detector);
    let image = DynamicImage::new_rgb8(200, 100);

    processor.process_frame(&image, &mut GraphicOverlay::new())?;
    processor.stop();
    processor.stop();

    assert_eq!(processor.state(), State::Stopped);
    assert_eq!(processor.detector().closed, 1);

    let mut overlay = GraphicOverlay::new();
    assert!(processor.process_frame(&image, &mut overlay).is_err());
    assert!(overlay.is_empty());
    Ok(())
}

#[test]
fn test_detector_error_skips_frame() -> Result<()> {
    let mut processor = FaceDetectorProcessor::new(ScriptedDetector::new(vec![]));
    let mut overlay = GraphicOverlay::new();
    let reports = processor.process_frame(&DynamicImage::new_rgb8(8, 8), &mut overlay)?;
    assert!(reports.is_empty());
    assert!(overlay.is_empty());
    assert_eq!(processor.state(), State::Active);
    Ok(())
}
