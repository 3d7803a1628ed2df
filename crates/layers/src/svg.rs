//! SVG export of a [`DisplayList`].

use std::fmt::Write;

use foundation::math::Vec2;

use crate::surface::{DisplayList, DrawCommand};
use crate::symbology::{Rgba, Stroke};

fn color(c: Rgba) -> String {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({},{},{},{:.3})",
        channel(c[0]),
        channel(c[1]),
        channel(c[2]),
        c[3].clamp(0.0, 1.0)
    )
}

fn stroke_attrs(stroke: Option<Stroke>) -> String {
    match stroke {
        Some(s) => format!(r#"stroke="{}" stroke-width="{:.2}""#, color(s.color), s.width),
        None => r#"stroke="none""#.to_string(),
    }
}

fn fill_attr(fill: Option<Rgba>) -> String {
    match fill {
        Some(c) => format!(r#"fill="{}""#, color(c)),
        None => r#"fill="none""#.to_string(),
    }
}

fn points_attr(points: &[Vec2]) -> String {
    points
        .iter()
        .map(|p| format!("{:.2},{:.2}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders the display list as a standalone SVG document.
pub fn to_svg(list: &DisplayList) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = list.width,
        h = list.height
    );
    for cmd in &list.commands {
        let _ = match cmd {
            DrawCommand::Clear {
                width,
                height,
                color: c,
            } => writeln!(
                out,
                r#"<rect x="0" y="0" width="{width}" height="{height}" fill="{}"/>"#,
                color(*c)
            ),
            DrawCommand::Polyline { points, stroke } => writeln!(
                out,
                r#"<polyline points="{}" fill="none" {}/>"#,
                points_attr(points),
                stroke_attrs(Some(*stroke))
            ),
            DrawCommand::Polygon { ring, fill, stroke } => writeln!(
                out,
                r#"<polygon points="{}" {} {}/>"#,
                points_attr(ring),
                fill_attr(*fill),
                stroke_attrs(*stroke)
            ),
            DrawCommand::Circle {
                center,
                radius,
                fill,
                stroke,
            } => writeln!(
                out,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" {} {}/>"#,
                center.x,
                center.y,
                radius,
                fill_attr(*fill),
                stroke_attrs(*stroke)
            ),
            DrawCommand::Ellipse {
                center,
                radii,
                rotation,
                stroke,
            } => writeln!(
                out,
                r#"<ellipse cx="{:.2}" cy="{:.2}" rx="{:.2}" ry="{:.2}" transform="rotate({:.2} {:.2} {:.2})" fill="none" {}/>"#,
                center.x,
                center.y,
                radii[0],
                radii[1],
                rotation.to_degrees(),
                center.x,
                center.y,
                stroke_attrs(Some(*stroke))
            ),
            DrawCommand::Rect { rect, stroke } => writeln!(
                out,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" {}/>"#,
                rect.min[0],
                rect.min[1],
                rect.width(),
                rect.height(),
                stroke_attrs(Some(*stroke))
            ),
            DrawCommand::Text {
                center,
                text,
                style,
            } => writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" font-size="{:.1}" text-anchor="middle" dominant-baseline="middle" fill="{}" stroke="{}" stroke-width="{:.1}" paint-order="stroke">{}</text>"#,
                center.x,
                center.y,
                style.font_size_px,
                color(style.color),
                color(style.halo_color),
                style.halo_width_px,
                escape(text)
            ),
        };
    }
    out.push_str("</svg>\n");
    out
}
