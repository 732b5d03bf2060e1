//! 68-point facial landmark layout and the named regions carved out of it.

use crate::types::Point;

pub const NUM_FACE_LANDMARKS: usize = 68;

/// Facial regions used for the centroid distance overlay, in the fixed order
/// the annotator enumerates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceRegion {
    LeftEye,
    RightEye,
    Nose,
    Mouth,
    Jawline,
    LeftEyebrow,
    RightEyebrow,
}

impl FaceRegion {
    pub const ALL: [FaceRegion; 7] = [
        FaceRegion::LeftEye,
        FaceRegion::RightEye,
        FaceRegion::Nose,
        FaceRegion::Mouth,
        FaceRegion::Jawline,
        FaceRegion::LeftEyebrow,
        FaceRegion::RightEyebrow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FaceRegion::LeftEye => "Left Eye",
            FaceRegion::RightEye => "Right Eye",
            FaceRegion::Nose => "Nose",
            FaceRegion::Mouth => "Mouth",
            FaceRegion::Jawline => "Jawline",
            FaceRegion::LeftEyebrow => "Left Eyebrow",
            FaceRegion::RightEyebrow => "Right Eyebrow",
        }
    }

    fn indices(&self) -> std::ops::Range<usize> {
        match self {
            FaceRegion::Jawline => 0..17,
            FaceRegion::LeftEyebrow => 17..22,
            FaceRegion::RightEyebrow => 22..27,
            FaceRegion::Nose => 27..36,
            FaceRegion::LeftEye => 36..42,
            FaceRegion::RightEye => 42..48,
            FaceRegion::Mouth => 48..68,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks68 {
    points: Vec<Point>,
}

impl FaceLandmarks68 {
    /// Returns `None` unless exactly 68 points are given.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        (points.len() == NUM_FACE_LANDMARKS).then_some(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn region(&self, region: FaceRegion) -> &[Point] {
        &self.points[region.indices()]
    }

    /// Named groups in `FaceRegion::ALL` order.
    pub fn groups(&self) -> Vec<(&'static str, &[Point])> {
        FaceRegion::ALL
            .iter()
            .map(|region| (region.name(), self.region(*region)))
            .collect()
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            points: self.points.iter().map(|p| p.scaled(sx, sy)).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn indexed_landmarks() -> FaceLandmarks68 {
        let points = (0..NUM_FACE_LANDMARKS)
            .map(|i| Point::new(i as f32, (i * 2) as f32))
            .collect();
        FaceLandmarks68::new(points).expect("68 points")
    }

    #[test]
    fn rejects_wrong_point_count() {
        assert!(FaceLandmarks68::new(vec![Point::default(); 67]).is_none());
        assert!(FaceLandmarks68::new(vec![Point::default(); 69]).is_none());
    }

    #[test]
    fn regions_cover_all_points_exactly_once() {
        let landmarks = indexed_landmarks();
        let mut seen: Vec<usize> = FaceRegion::ALL
            .iter()
            .flat_map(|r| landmarks.region(*r).iter().map(|p| p.x as usize))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..NUM_FACE_LANDMARKS).collect::<Vec<_>>());
    }

    #[test]
    fn groups_follow_fixed_order() {
        let landmarks = indexed_landmarks();
        let names: Vec<&str> = landmarks.groups().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "Left Eye",
                "Right Eye",
                "Nose",
                "Mouth",
                "Jawline",
                "Left Eyebrow",
                "Right Eyebrow"
            ]
        );
        assert_eq!(landmarks.region(FaceRegion::LeftEye)[0], Point::new(36.0, 72.0));
        assert_eq!(landmarks.region(FaceRegion::Mouth).len(), 20);
    }
}
