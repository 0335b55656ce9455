//! Cross-tile non-maximum suppression.

use crate::detection::GlobalDetection;
use std::cmp::Ordering;

/// Greedy class-agnostic NMS over the whole raster.
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    iou_threshold: f64,
}

impl Deduplicator {
    /// Suppress detections overlapping a kept one by more than `iou_threshold`.
    pub fn new(iou_threshold: f32) -> Self {
        Self {
            iou_threshold: f64::from(iou_threshold),
        }
    }

    /// Kept detections in descending confidence order.
    ///
    /// Equal confidences keep their input order, so the earlier detection
    /// wins a tie.
    pub fn run(&self, detections: Vec<GlobalDetection>) -> Vec<GlobalDetection> {
        suppress(
            detections,
            self.iou_threshold,
            |d| d.confidence,
            |a, b| a.bbox.iou(&b.bbox),
        )
    }
}

/// Greedy suppression shared by the global pass and per-tile decoding.
///
/// Sorts by descending confidence (stable), keeps the best remaining item
/// and drops every later item whose `overlap` with it exceeds `threshold`.
pub(crate) fn suppress<T: Copy>(
    mut items: Vec<T>,
    threshold: f64,
    confidence: impl Fn(&T) -> f32,
    overlap: impl Fn(&T, &T) -> f64,
) -> Vec<T> {
    items.sort_by(|a, b| {
        confidence(b)
            .partial_cmp(&confidence(a))
            .unwrap_or(Ordering::Equal)
    });

    let mut suppressed = vec![false; items.len()];
    let mut keep = Vec::new();

    for i in 0..items.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(items[i]);

        for j in (i + 1)..items.len() {
            if !suppressed[j] && overlap(&items[i], &items[j]) > threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::PixelBox;

    fn det(bbox: PixelBox, confidence: f32, tile_index: usize) -> GlobalDetection {
        GlobalDetection {
            bbox,
            confidence,
            class_id: 0,
            tile_index,
        }
    }

    #[test]
    fn test_chain_suppression_is_greedy() {
        // a overlaps b, b overlaps c, a does not overlap c.
        let a = det(PixelBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 0);
        let b = det(PixelBox::new(3.0, 0.0, 13.0, 10.0), 0.8, 0);
        let c = det(PixelBox::new(6.0, 0.0, 16.0, 10.0), 0.7, 0);
        let kept = Deduplicator::new(0.45).run(vec![c, b, a]);
        let conf: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(conf, vec![0.9, 0.7]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let a = det(PixelBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 0);
        let b = det(PixelBox::new(5.0, 0.0, 15.0, 10.0), 0.8, 0);
        let iou = a.bbox.iou(&b.bbox);
        #[allow(clippy::cast_possible_truncation)]
        let kept = Deduplicator::new(iou as f32).run(vec![a, b]);
        assert_eq!(kept.len(), 2);
    }
}
