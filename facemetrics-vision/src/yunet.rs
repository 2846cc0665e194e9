//! YuNet output decoding.
//!
//! YuNet is an anchor-free detector that predicts directly from grid cells.
//! For each stride (8, 16, 32) the network emits:
//! - cls: [1, H*W, 1] classification probabilities
//! - obj: [1, H*W, 1] objectness probabilities
//! - bbox: [1, H*W, 4] box deltas (dx, dy, log dw, log dh)
//! - kps: [1, H*W, 10] landmark deltas (5 points x 2 coords)
//!
//! Output order: cls_8, cls_16, cls_32, obj_8, obj_16, obj_32,
//! bbox_8, bbox_16, bbox_32, kps_8, kps_16, kps_32.
//!
//! Decoding maps a cell straight to input pixels:
//! cx = (grid_x + dx) * stride, w = exp(dw) * stride

use anyhow::Result;
use ndarray::Array2;

pub const STRIDES: [usize; 3] = [8, 16, 32];
pub const NUM_KEYPOINTS: usize = 5;

/// A decoded candidate before NMS, in input-canvas pixels.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    pub keypoints: [f32; NUM_KEYPOINTS * 2],
}

/// Per-stride score, box and keypoint maps.
#[derive(Debug, Default)]
pub struct YuNetOutputs {
    pub scores: Vec<Array2<f32>>,
    pub bboxes: Vec<Array2<f32>>,
    pub keypoints: Vec<Array2<f32>>,
}

fn grid_cells(input_size: usize) -> [usize; 3] {
    STRIDES.map(|s| (input_size / s) * (input_size / s))
}

/// Read the three per-stride tensors of one output group into `[cells, width]` arrays.
fn read_group(
    outputs: &[(&[i64], &[f32])],
    group: usize,
    name: &str,
    width: usize,
    input_size: usize,
) -> Result<Vec<Array2<f32>>> {
    let mut maps = Vec::with_capacity(STRIDES.len());
    for (scale, &cells) in grid_cells(input_size).iter().enumerate() {
        let idx = group * STRIDES.len() + scale;
        let Some((shape, data)) = outputs.get(idx) else {
            anyhow::bail!("Missing {} output at index {}", name, idx);
        };
        if shape.len() != 3 || shape[0] != 1 || shape[2] != width as i64 {
            anyhow::bail!(
                "Unexpected {} shape at index {}: {:?}, expected [1, {}, {}]",
                name,
                idx,
                shape,
                cells,
                width
            );
        }
        if shape[1] as usize != cells {
            anyhow::bail!(
                "Expected {} locations for {} at index {}, got {}",
                cells,
                name,
                idx,
                shape[1]
            );
        }
        maps.push(Array2::from_shape_vec((cells, width), data.to_vec())?);
    }
    Ok(maps)
}

/// Split the twelve raw YuNet tensors into score, box and keypoint maps.
///
/// Scores are `sqrt(cls * obj)`, each clamped to [0, 1] first.
pub fn parse_outputs(outputs: &[(&[i64], &[f32])], input_size: usize) -> Result<YuNetOutputs> {
    let cls = read_group(outputs, 0, "cls", 1, input_size)?;
    let obj = read_group(outputs, 1, "obj", 1, input_size)?;
    let bboxes = read_group(outputs, 2, "bbox", 4, input_size)?;
    let keypoints = read_group(outputs, 3, "kps", NUM_KEYPOINTS * 2, input_size)?;

    let scores = cls
        .into_iter()
        .zip(obj)
        .map(|(c, o)| {
            let mut score = c.mapv(|v| v.clamp(0.0, 1.0)) * o.mapv(|v| v.clamp(0.0, 1.0));
            score.mapv_inplace(f32::sqrt);
            score
        })
        .collect();

    Ok(YuNetOutputs {
        scores,
        bboxes,
        keypoints,
    })
}

/// Decode every cell scoring at least `score_threshold`.
pub fn decode(
    outputs: &YuNetOutputs,
    score_threshold: f32,
    input_size: usize,
) -> Result<Vec<RawDetection>> {
    let mut detections = Vec::new();

    for (scale, &stride) in STRIDES.iter().enumerate() {
        let (Some(scores), Some(bboxes), Some(kps)) = (
            outputs.scores.get(scale),
            outputs.bboxes.get(scale),
            outputs.keypoints.get(scale),
        ) else {
            anyhow::bail!("Missing maps for stride {}", stride);
        };

        let feature_size = input_size / stride;
        if scores.nrows() != feature_size * feature_size {
            anyhow::bail!(
                "Expected {} boxes for stride {} ({}x{} grid), got {}",
                feature_size * feature_size,
                stride,
                feature_size,
                feature_size,
                scores.nrows()
            );
        }

        let s = stride as f32;
        for i in 0..feature_size {
            for j in 0..feature_size {
                let idx = i * feature_size + j;
                let score = scores[[idx, 0]];
                if score < score_threshold {
                    continue;
                }

                let cx = (j as f32 + bboxes[[idx, 0]]) * s;
                let cy = (i as f32 + bboxes[[idx, 1]]) * s;
                let w = bboxes[[idx, 2]].exp() * s;
                let h = bboxes[[idx, 3]].exp() * s;

                let mut keypoints = [0.0f32; NUM_KEYPOINTS * 2];
                for k in 0..NUM_KEYPOINTS {
                    keypoints[k * 2] = (j as f32 + kps[[idx, k * 2]]) * s;
                    keypoints[k * 2 + 1] = (i as f32 + kps[[idx, k * 2 + 1]]) * s;
                }

                detections.push(RawDetection {
                    bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                    score,
                    keypoints,
                });
            }
        }
    }

    Ok(detections)
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}
