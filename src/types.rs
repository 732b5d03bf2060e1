use std::time::Instant;

use crate::landmarks::FaceLandmarks68;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn display_size(&self) -> DisplaySize {
        DisplaySize {
            width: self.width,
            height: self.height,
        }
    }
}

/// A 2D point in display pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
        }
    }
}

/// Size of the overlay canvas. Matches the native pixel size of the video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0.0),
            height: (y2 - y1).max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn scaled(self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    /// Output order of the expression net.
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceExpressions {
    scores: [f32; 7],
}

impl FaceExpressions {
    pub fn from_scores(scores: [f32; 7]) -> Self {
        Self { scores }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Expression, f32)> + '_ {
        Expression::ALL.iter().copied().zip(self.scores.iter().copied())
    }

    /// Expressions strictly above `min_confidence`, strongest first.
    pub fn sorted_above(&self, min_confidence: f32) -> Vec<(Expression, f32)> {
        let mut kept: Vec<(Expression, f32)> = self
            .iter()
            .filter(|(_, score)| *score > min_confidence)
            .collect();
        kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        kept
    }
}

/// One face as reported by the detector for a single frame.
#[derive(Clone, Debug)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub score: f32,
    pub landmarks: FaceLandmarks68,
    pub expressions: FaceExpressions,
}

impl FaceDetection {
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            bbox: self.bbox.scaled(sx, sy),
            score: self.score,
            landmarks: self.landmarks.scaled(sx, sy),
            expressions: self.expressions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expressions_above_threshold_are_sorted_descending() {
        let expressions =
            FaceExpressions::from_scores([0.05, 0.6, 0.0, 0.25, 0.0, 0.0, 0.1]);
        let kept = expressions.sorted_above(0.1);
        let labels: Vec<&str> = kept.iter().map(|(e, _)| e.label()).collect();
        assert_eq!(labels, vec!["happy", "angry"]);
    }

    #[test]
    fn expression_at_exactly_the_threshold_is_dropped() {
        let expressions = FaceExpressions::from_scores([0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1]);
        let kept = expressions.sorted_above(0.1);
        assert_eq!(kept, vec![(Expression::Neutral, 0.9)]);
    }

    #[test]
    fn bbox_scaling_scales_origin_and_extent() {
        let bbox = BoundingBox::from_corners(10.0, 20.0, 30.0, 60.0).scaled(2.0, 0.5);
        assert_eq!(bbox, BoundingBox {
            x: 20.0,
            y: 10.0,
            width: 40.0,
            height: 20.0,
        });
        assert_eq!(bbox.right(), 60.0);
        assert_eq!(bbox.bottom(), 30.0);
    }
}
