//! Centroid distances between facial regions.

use crate::{
    overlay::{Surface, TextStyle},
    types::Point,
};

pub const DISTANCE_TEXT_COLOR: [u8; 4] = [0, 0, 255, 255];
pub const DISTANCE_FONT_SIZE: f32 = 12.0;

#[derive(Clone, Debug, PartialEq)]
pub struct DistanceLabel {
    pub from: &'static str,
    pub to: &'static str,
    pub distance: f32,
    pub position: Point,
}

impl DistanceLabel {
    pub fn text(&self) -> String {
        format!("{:.1}", self.distance)
    }
}

/// Mean of the points. An empty slice yields a NaN point.
pub fn centroid(points: &[Point]) -> Point {
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0_f32, 0.0_f32), |acc, p| (acc.0 + p.x, acc.1 + p.y));
    let n = points.len() as f32;
    Point::new(sum_x / n, sum_y / n)
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// One label per unordered pair `(i, j)`, `i < j`, in the order of `groups`.
pub fn distance_labels(groups: &[(&'static str, &[Point])]) -> Vec<DistanceLabel> {
    let centers: Vec<(&'static str, Point)> = groups
        .iter()
        .map(|(name, points)| (*name, centroid(points)))
        .collect();

    let mut labels = Vec::with_capacity(centers.len() * centers.len().saturating_sub(1) / 2);
    for i in 0..centers.len() {
        for j in (i + 1)..centers.len() {
            let (from, a) = centers[i];
            let (to, b) = centers[j];
            labels.push(DistanceLabel {
                from,
                to,
                distance: distance(a, b),
                position: midpoint(a, b),
            });
        }
    }
    labels
}

pub fn annotate<S: Surface>(surface: &mut S, groups: &[(&'static str, &[Point])]) {
    surface.set_text_style(TextStyle {
        color: DISTANCE_TEXT_COLOR,
        font_size: DISTANCE_FONT_SIZE,
    });
    for label in distance_labels(groups) {
        log::trace!("{} -> {}: {}", label.from, label.to, label.text());
        surface.fill_text(&label.text(), label.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        landmarks::tests::indexed_landmarks,
        overlay::{DisplayList, DrawCommand},
    };

    #[test]
    fn centroid_is_coordinate_mean() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(2.0, 7.0),
        ];
        assert_eq!(centroid(&points), Point::new(2.0, 3.0));
    }

    #[test]
    fn centroid_of_single_point_is_that_point() {
        let p = Point::new(12.5, -3.25);
        assert_eq!(centroid(&[p]), p);
    }

    #[test]
    fn centroid_of_empty_group_is_nan() {
        let c = centroid(&[]);
        assert!(c.x.is_nan() && c.y.is_nan());
    }

    #[test]
    fn identical_centroids_are_zero_apart() {
        let p = Point::new(3.0, 9.0);
        assert_eq!(distance(p, p), 0.0);
    }

    #[test]
    fn three_four_five_triangle() {
        let a = [Point::new(0.0, 0.0)];
        let b = [Point::new(3.0, 4.0)];
        let labels = distance_labels(&[("A", &a), ("B", &b)]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].distance, 5.0);
        assert_eq!(labels[0].position, Point::new(1.5, 2.0));
        assert_eq!(labels[0].text(), "5.0");
    }

    #[test]
    fn seven_groups_yield_21_pairs_in_fixed_order() {
        let landmarks = indexed_landmarks();
        let labels = distance_labels(&landmarks.groups());
        assert_eq!(labels.len(), 21);

        let pairs: Vec<(&str, &str)> = labels.iter().map(|l| (l.from, l.to)).collect();
        assert_eq!(pairs[0], ("Left Eye", "Right Eye"));
        assert_eq!(pairs[5], ("Left Eye", "Right Eyebrow"));
        assert_eq!(pairs[6], ("Right Eye", "Nose"));
        assert_eq!(pairs[20], ("Left Eyebrow", "Right Eyebrow"));

        let mut unique = pairs.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 21);
    }

    #[test]
    fn annotate_draws_rounded_labels_at_midpoints() {
        let a = [Point::new(0.0, 0.0), Point::new(2.0, 0.0)];
        let b = [Point::new(1.0, 1.234)];
        let mut surface = DisplayList::new();
        annotate(&mut surface, &[("A", &a), ("B", &b)]);

        assert_eq!(surface.commands(), &[DrawCommand::Text {
            text: "1.2".to_string(),
            position: Point::new(1.0, 0.617),
            style: TextStyle {
                color: DISTANCE_TEXT_COLOR,
                font_size: DISTANCE_FONT_SIZE,
            },
        }]);
    }

    #[test]
    fn labels_are_stable_across_frames() {
        let landmarks = indexed_landmarks();
        let first = distance_labels(&landmarks.groups());
        let second = distance_labels(&landmarks.groups());
        assert_eq!(first, second);
    }
}
