//! Burns the shape commands of a display list into an RGBA frame buffer.
//! Text is left to the UI.

use super::{Color, DrawCommand};
use crate::types::{BoundingBox, Point};

pub fn rasterize(commands: &[DrawCommand], buffer: &mut [u8], width: u32, height: u32) {
    let mut canvas = Canvas {
        buffer,
        width,
        height,
    };
    for command in commands {
        match command {
            DrawCommand::Rect {
                rect,
                color,
                line_width,
            } => canvas.rect(rect, *color, *line_width),
            DrawCommand::Line {
                from,
                to,
                color,
                line_width,
            } => canvas.line(*from, *to, *color, *line_width),
            DrawCommand::Circle {
                center,
                radius,
                color,
            } => canvas.circle(
                (center.x.round() as i32, center.y.round() as i32),
                *radius,
                *color,
            ),
            // The overlay starts transparent over every new frame.
            DrawCommand::Clear | DrawCommand::Text { .. } => {}
        }
    }
}

struct Canvas<'a> {
    buffer: &'a mut [u8],
    width: u32,
    height: u32,
}

impl Canvas<'_> {
    fn rect(&mut self, rect: &BoundingBox, color: Color, thickness: i32) {
        let (x1, y1, x2, y2) = (rect.x, rect.y, rect.right(), rect.bottom());
        self.line(Point::new(x1, y1), Point::new(x2, y1), color, thickness);
        self.line(Point::new(x2, y1), Point::new(x2, y2), color, thickness);
        self.line(Point::new(x2, y2), Point::new(x1, y2), color, thickness);
        self.line(Point::new(x1, y2), Point::new(x1, y1), color, thickness);
    }

    fn line(&mut self, p0: Point, p1: Point, color: Color, thickness: i32) {
        if !(p0.x.is_finite() && p0.y.is_finite() && p1.x.is_finite() && p1.y.is_finite()) {
            return;
        }
        let radius = (thickness.max(1) - 1) / 2;
        // Step count is bounded by the clipped length, not the raw coordinates.
        let margin = radius as f64 + 1.0;
        let Some((p0, p1)) = clip_segment(
            p0,
            p1,
            (-margin, -margin),
            (self.width as f64 + margin, self.height as f64 + margin),
        ) else {
            return;
        };
        let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
        let (x1, y1) = (p1.0 as i32, p1.1 as i32);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put_pixel(x0, y0, color);
            if radius > 0 {
                for ox in -radius..=radius {
                    for oy in -radius..=radius {
                        if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                            self.put_pixel(x0 + ox, y0 + oy, color);
                        }
                    }
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn circle(&mut self, center: (i32, i32), radius: i32, color: Color) {
        let (cx, cy) = center;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put_pixel(cx.saturating_add(dx), cy.saturating_add(dy), color);
                }
            }
        }
    }

    fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.width || uy >= self.height {
            return;
        }
        let idx = ((uy * self.width + ux) as usize) * 4;
        if idx + 3 < self.buffer.len() {
            self.buffer[idx..idx + 4].copy_from_slice(&color);
        }
    }
}

/// Liang-Barsky clip of `p0..p1` against the box `min..max`.
fn clip_segment(
    p0: Point,
    p1: Point,
    min: (f64, f64),
    max: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (x0, y0) = (p0.x as f64, p0.y as f64);
    let (dx, dy) = (p1.x as f64 - x0, p1.y as f64 - y0);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-dx, x0 - min.0),
        (dx, max.0 - x0),
        (-dy, y0 - min.1),
        (dy, max.1 - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        (x0 + t0 * dx, y0 + t0 * dy),
        (x0 + t1 * dx, y0 + t1 * dy),
    ))
}
