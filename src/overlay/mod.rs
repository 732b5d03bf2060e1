//! Immediate-mode overlay drawing.
//!
//! `Surface` is the narrow drawing interface the detection loop and the
//! annotator talk to. `DisplayList` records the calls so the UI can rasterize
//! shapes into the frame and lay out text on top of it.

pub mod raster;

use crate::{
    landmarks::FaceRegion,
    types::{BoundingBox, FaceDetection, Point},
};

pub type Color = [u8; 4];

pub const BOX_COLOR: Color = [0, 0, 255, 255];
pub const BOX_LINE_WIDTH: i32 = 2;
pub const LANDMARK_LINE_COLOR: Color = [0, 255, 255, 255];
pub const LANDMARK_POINT_COLOR: Color = [255, 0, 255, 255];
pub const LANDMARK_POINT_RADIUS: i32 = 2;
pub const LABEL_COLOR: Color = [255, 255, 255, 255];
pub const LABEL_FONT_SIZE: f32 = 14.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub font_size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            font_size: 10.0,
        }
    }
}

pub trait Surface {
    fn clear(&mut self);
    fn stroke_rect(&mut self, rect: BoundingBox, color: Color, line_width: i32);
    fn stroke_line(&mut self, from: Point, to: Point, color: Color, line_width: i32);
    fn fill_circle(&mut self, center: Point, radius: i32, color: Color);
    fn set_text_style(&mut self, style: TextStyle);
    /// Draws `text` with its baseline starting at `position`.
    fn fill_text(&mut self, text: &str, position: Point);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear,
    Rect {
        rect: BoundingBox,
        color: Color,
        line_width: i32,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        line_width: i32,
    },
    Circle {
        center: Point,
        radius: i32,
        color: Color,
    },
    Text {
        text: String,
        position: Point,
        style: TextStyle,
    },
}

#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
    text_style: TextStyle,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn texts(&self) -> impl Iterator<Item = (&str, Point, TextStyle)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text {
                text,
                position,
                style,
            } => Some((text.as_str(), *position, *style)),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_rect(&mut self, rect: BoundingBox, color: Color, line_width: i32) {
        self.commands.push(DrawCommand::Rect {
            rect,
            color,
            line_width,
        });
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: Color, line_width: i32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            line_width,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: i32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn set_text_style(&mut self, style: TextStyle) {
        self.text_style = style;
    }

    fn fill_text(&mut self, text: &str, position: Point) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            style: self.text_style,
        });
    }
}

/// Draws boxes, landmark contours and expression labels for every face.
pub fn draw_overlay<S: Surface>(surface: &mut S, faces: &[FaceDetection], min_expression: f32) {
    for face in faces {
        draw_detection_box(surface, face);
    }
    for face in faces {
        draw_face_landmarks(surface, face);
    }
    for face in faces {
        draw_face_expressions(surface, face, min_expression);
    }
}

fn draw_detection_box<S: Surface>(surface: &mut S, face: &FaceDetection) {
    surface.stroke_rect(face.bbox, BOX_COLOR, BOX_LINE_WIDTH);
    surface.set_text_style(TextStyle {
        color: LABEL_COLOR,
        font_size: LABEL_FONT_SIZE,
    });
    // Score sits on top of the box, like a caption.
    surface.fill_text(
        &format!("{:.2}", face.score),
        Point::new(face.bbox.x, face.bbox.y - BOX_LINE_WIDTH as f32),
    );
}

fn draw_face_landmarks<S: Surface>(surface: &mut S, face: &FaceDetection) {
    for region in FaceRegion::ALL {
        let points = face.landmarks.region(region);
        for pair in points.windows(2) {
            surface.stroke_line(pair[0], pair[1], LANDMARK_LINE_COLOR, 1);
        }
        if is_closed_contour(region) {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                surface.stroke_line(*last, *first, LANDMARK_LINE_COLOR, 1);
            }
        }
    }
    for point in face.landmarks.points() {
        surface.fill_circle(*point, LANDMARK_POINT_RADIUS, LANDMARK_POINT_COLOR);
    }
}

fn is_closed_contour(region: FaceRegion) -> bool {
    matches!(
        region,
        FaceRegion::LeftEye | FaceRegion::RightEye | FaceRegion::Mouth
    )
}

fn draw_face_expressions<S: Surface>(surface: &mut S, face: &FaceDetection, min_confidence: f32) {
    let expressions = face.expressions.sorted_above(min_confidence);
    if expressions.is_empty() {
        return;
    }
    surface.set_text_style(TextStyle {
        color: LABEL_COLOR,
        font_size: LABEL_FONT_SIZE,
    });
    let line_height = LABEL_FONT_SIZE + 2.0;
    for (row, (expression, score)) in expressions.iter().enumerate() {
        let y = face.bbox.bottom() + line_height * (row as f32 + 1.0);
        surface.fill_text(
            &format!("{} ({:.2})", expression.label(), score),
            Point::new(face.bbox.x, y),
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        landmarks::tests::indexed_landmarks,
        types::{BoundingBox, FaceExpressions},
    };

    pub(crate) fn sample_face() -> FaceDetection {
        FaceDetection {
            bbox: BoundingBox::from_corners(10.0, 20.0, 110.0, 140.0),
            score: 0.876,
            landmarks: indexed_landmarks(),
            expressions: FaceExpressions::from_scores([0.7, 0.2, 0.0, 0.0, 0.05, 0.0, 0.05]),
        }
    }

    #[test]
    fn clear_drops_earlier_commands() {
        let mut list = DisplayList::new();
        list.fill_text("stale", Point::new(1.0, 1.0));
        list.clear();
        assert_eq!(list.commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn text_uses_style_active_at_call_time() {
        let mut list = DisplayList::new();
        let blue = TextStyle {
            color: [0, 0, 255, 255],
            font_size: 12.0,
        };
        list.set_text_style(blue);
        list.fill_text("a", Point::new(0.0, 0.0));
        list.set_text_style(TextStyle::default());
        list.fill_text("b", Point::new(0.0, 0.0));

        let styles: Vec<TextStyle> = list.texts().map(|(_, _, s)| s).collect();
        assert_eq!(styles, vec![blue, TextStyle::default()]);
    }

    #[test]
    fn overlay_draws_box_landmarks_and_expressions() {
        let mut list = DisplayList::new();
        draw_overlay(&mut list, &[sample_face()], 0.1);

        let rects = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .count();
        let circles = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .count();
        // 68 points, open contours lose one segment each, closed ones keep all.
        let lines = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count();
        assert_eq!(rects, 1);
        assert_eq!(circles, 68);
        assert_eq!(lines, 68 - 4);

        let texts: Vec<&str> = list.texts().map(|(t, _, _)| t).collect();
        assert_eq!(texts, vec!["0.88", "neutral (0.70)", "happy (0.20)"]);
    }

    #[test]
    fn expression_labels_need_more_than_min_confidence() {
        let mut face = sample_face();
        face.score = 0.9;
        face.expressions = FaceExpressions::from_scores([0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1]);
        let mut list = DisplayList::new();
        draw_overlay(&mut list, &[face], 0.1);

        let texts: Vec<&str> = list.texts().map(|(t, _, _)| t).collect();
        assert_eq!(texts, vec!["0.90", "neutral (0.90)"]);
    }

    #[test]
    fn overlay_of_no_faces_draws_nothing() {
        let mut list = DisplayList::new();
        draw_overlay(&mut list, &[], 0.1);
        assert!(list.commands().is_empty());
    }
}
