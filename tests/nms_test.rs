//! Integration tests for cross-tile duplicate suppression.

#![allow(clippy::float_cmp)]

use geotiler::constants::DEFAULT_IOU_THRESHOLD;
use geotiler::detection::{Deduplicator, GlobalDetection, PixelBox};

fn detection(bbox: (f64, f64, f64, f64), confidence: f32, tile_index: usize) -> GlobalDetection {
    GlobalDetection {
        bbox: PixelBox::new(bbox.0, bbox.1, bbox.2, bbox.3),
        confidence,
        class_id: 0,
        tile_index,
    }
}

#[test]
fn test_identical_boxes_keep_highest_confidence() {
    let kept = Deduplicator::new(0.5).run(vec![
        detection((10.0, 10.0, 30.0, 30.0), 0.6, 0),
        detection((10.0, 10.0, 30.0, 30.0), 0.9, 1),
    ]);
    assert_eq!(kept.len(), 1);
    assert!((kept[0].confidence - 0.9).abs() < f32::EPSILON);
    assert_eq!(kept[0].tile_index, 1);
}

#[test]
fn test_low_overlap_keeps_both() {
    // IoU = 1/3
    let kept = Deduplicator::new(0.5).run(vec![
        detection((0.0, 0.0, 10.0, 10.0), 0.9, 0),
        detection((5.0, 0.0, 15.0, 10.0), 0.8, 1),
    ]);
    assert_eq!(kept.len(), 2);
}

#[test]
fn test_empty_input() {
    assert!(Deduplicator::new(0.5).run(Vec::new()).is_empty());
}

#[test]
fn test_equal_confidence_keeps_earlier_tile() {
    let kept = Deduplicator::new(0.5).run(vec![
        detection((0.0, 0.0, 10.0, 10.0), 0.8, 0),
        detection((0.0, 0.0, 10.0, 10.0), 0.8, 3),
    ]);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].tile_index, 0);
}

#[test]
fn test_output_sorted_by_confidence() {
    let kept = Deduplicator::new(0.5).run(vec![
        detection((0.0, 0.0, 10.0, 10.0), 0.3, 0),
        detection((100.0, 0.0, 110.0, 10.0), 0.7, 1),
        detection((200.0, 0.0, 210.0, 10.0), 0.5, 2),
    ]);
    let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.7, 0.5, 0.3]);
}

#[test]
fn test_suppression_ignores_class() {
    let mut other = detection((0.0, 0.0, 10.0, 10.0), 0.7, 1);
    other.class_id = 4;
    let kept = Deduplicator::new(0.5).run(vec![detection((0.0, 0.0, 10.0, 10.0), 0.9, 0), other]);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 0);
}

#[test]
fn test_default_threshold_keeps_iou_point_two() {
    assert_eq!(DEFAULT_IOU_THRESHOLD, 0.45);
    // Second box lies inside the first: IoU = 20 / 100 = 0.2.
    let kept = Deduplicator::new(DEFAULT_IOU_THRESHOLD).run(vec![
        detection((0.0, 0.0, 10.0, 10.0), 0.9, 0),
        detection((0.0, 0.0, 4.0, 5.0), 0.8, 1),
    ]);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].tile_index, 0);
    assert_eq!(kept[1].tile_index, 1);
}

#[test]
fn test_default_threshold_suppresses_iou_point_five() {
    // IoU = 50 / 100 = 0.5, above 0.45.
    let kept = Deduplicator::new(DEFAULT_IOU_THRESHOLD).run(vec![
        detection((0.0, 0.0, 10.0, 5.0), 0.7, 2),
        detection((0.0, 0.0, 10.0, 10.0), 0.9, 0),
        detection((0.0, 0.0, 4.0, 5.0), 0.8, 1),
    ]);
    let tiles: Vec<usize> = kept.iter().map(|d| d.tile_index).collect();
    assert_eq!(tiles, vec![0, 1]);
}
