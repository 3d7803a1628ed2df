use foundation::bounds::Aabb2;
use foundation::math::Vec2;

use crate::labels::LabelStyle;
use crate::symbology::{Rgba, Stroke};

/// Immediate-mode 2-D drawing target.
///
/// Coordinates are canvas pixels with `+y` down.
pub trait Surface {
    fn clear(&mut self, width: f64, height: f64, color: Rgba);

    fn polyline(&mut self, points: &[Vec2], stroke: Stroke);

    fn line(&mut self, a: Vec2, b: Vec2, stroke: Stroke) {
        self.polyline(&[a, b], stroke);
    }

    fn polygon(&mut self, ring: &[Vec2], fill: Option<Rgba>, stroke: Option<Stroke>);

    fn circle(&mut self, center: Vec2, radius: f64, fill: Option<Rgba>, stroke: Option<Stroke>);

    /// `rotation` is clockwise on screen, in radians.
    fn ellipse(&mut self, center: Vec2, radii: [f64; 2], rotation: f64, stroke: Stroke);

    fn rect(&mut self, rect: Aabb2, stroke: Stroke);

    fn text(&mut self, center: Vec2, text: &str, style: &LabelStyle);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
        color: Rgba,
    },
    Polyline {
        points: Vec<Vec2>,
        stroke: Stroke,
    },
    Polygon {
        ring: Vec<Vec2>,
        fill: Option<Rgba>,
        stroke: Option<Stroke>,
    },
    Circle {
        center: Vec2,
        radius: f64,
        fill: Option<Rgba>,
        stroke: Option<Stroke>,
    },
    Ellipse {
        center: Vec2,
        radii: [f64; 2],
        rotation: f64,
        stroke: Stroke,
    },
    Rect {
        rect: Aabb2,
        stroke: Stroke,
    },
    Text {
        center: Vec2,
        text: String,
        style: LabelStyle,
    },
}

/// Records drawing commands in paint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, width: f64, height: f64, color: Rgba) {
        self.width = width;
        self.height = height;
        self.commands.clear();
        self.commands.push(DrawCommand::Clear {
            width,
            height,
            color,
        });
    }

    fn polyline(&mut self, points: &[Vec2], stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            stroke,
        });
    }

    fn polygon(&mut self, ring: &[Vec2], fill: Option<Rgba>, stroke: Option<Stroke>) {
        if ring.len() < 3 {
            return;
        }
        self.commands.push(DrawCommand::Polygon {
            ring: ring.to_vec(),
            fill,
            stroke,
        });
    }

    fn circle(&mut self, center: Vec2, radius: f64, fill: Option<Rgba>, stroke: Option<Stroke>) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    fn ellipse(&mut self, center: Vec2, radii: [f64; 2], rotation: f64, stroke: Stroke) {
        self.commands.push(DrawCommand::Ellipse {
            center,
            radii,
            rotation,
            stroke,
        });
    }

    fn rect(&mut self, rect: Aabb2, stroke: Stroke) {
        self.commands.push(DrawCommand::Rect { rect, stroke });
    }

    fn text(&mut self, center: Vec2, text: &str, style: &LabelStyle) {
        self.commands.push(DrawCommand::Text {
            center,
            text: text.to_string(),
            style: style.clone(),
        });
    }
}
