use anyhow::Result;
use facemetrics::{replay, FaceDetectorProcessor, GraphicOverlay};
use image::DynamicImage;

fn eye(p0: (f32, f32), p8: (f32, f32)) -> String {
    let points: Vec<String> = (0..16)
        .map(|i| {
            let (x, y) = match i {
                0 => p0,
                8 => p8,
                _ => ((p0.0 + p8.0) / 2.0, p0.1 + 3.0),
            };
            format!(r#"{{"x": {:.1}, "y": {:.1}}}"#, x, y)
        })
        .collect();
    format!("[{}]", points.join(", "))
}

#[test]
fn test_replay_through_processor() -> Result<()> {
    let face = format!(
        r#"{{
            "boundingBox": {{"left": 0, "top": 0, "right": 100, "bottom": 100}},
            "contours": {{"LEFT_EYE": {}, "RIGHT_EYE": {}}},
            "trackingId": 1
        }}"#,
        eye((10.0, 40.0), (40.0, 40.0)),
        eye((60.0, 40.0), (90.0, 40.0)),
    );
    let no_eyes = r#"{"boundingBox": {"left": 150, "top": 0, "right": 200, "bottom": 60}}"#;
    let json = format!(
        r#"[{{"faces": [{}, {}]}}, {{"error": "lost frame"}}, {{"faces": [{}]}}]"#,
        face, no_eyes, no_eyes
    );

    let frames = replay::parse_frames(&json)?;
    let mut processor = FaceDetectorProcessor::new(replay::ReplayDetector::new(frames));
    let canvas = DynamicImage::new_rgb8(200, 120);

    let mut overlay = GraphicOverlay::new();
    let reports = processor.process_frame(&canvas, &mut overlay)?;
    assert_eq!(overlay.len(), 2);
    // en = |40 - 60| = 20, ex = |10 - 90| = 80
    assert_eq!(reports[0].ratio(), Some(0.25));
    assert_eq!(reports[0].tracking_id, Some(1));
    assert_eq!(reports[1].eye_ratio, None);

    let mut overlay = GraphicOverlay::new();
    assert!(processor.process_frame(&canvas, &mut overlay)?.is_empty());
    assert!(overlay.is_empty());

    let mut overlay = GraphicOverlay::new();
    assert_eq!(processor.process_frame(&canvas, &mut overlay)?.len(), 1);
    assert_eq!(processor.latest_ratio(), Some(0.25));

    processor.stop();
    assert!(processor.detector().is_closed());
    Ok(())
}
