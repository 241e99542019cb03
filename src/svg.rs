//! SVG visualization of a card plan.
//!
//! Draws the frame, the content region, the three padding gaps, both image
//! rects and both caption boxes, each annotated with its geometry. Useful for
//! checking a custom [`Template`](crate::Template) before running a batch.
//!
//! # Example
//!
//! ```
//! use coverstack::{Size, Template, plan_card, svg::render_card_svg};
//!
//! let plan = plan_card(&Template::STOCK, Size::new(400, 600), Size::new(1000, 100)).unwrap();
//! let svg = render_card_svg(&plan);
//! assert!(svg.starts_with("<svg"));
//! assert!(svg.contains("589×58"));
//! ```

use std::fmt::Write as _;

use crate::constraint::Rect;
use crate::plan::CardPlan;
use crate::template::TextAlign;

/// Frame height on the diagram, in SVG user units.
const PANEL_H: f64 = 640.0;
/// Margin around the frame.
const MARGIN: f64 = 30.0;
/// Width of the annotation column right of the frame.
const NOTES_W: f64 = 260.0;
/// Line height of annotation text.
const NOTE_LINE_H: f64 = 16.0;

/// Render a complete SVG document for `plan`.
pub fn render_card_svg(plan: &CardPlan) -> String {
    let frame_w = plan.frame.width.max(1) as f64;
    let frame_h = plan.frame.height.max(1) as f64;
    let scale = PANEL_H / frame_h;
    let panel_w = frame_w * scale;

    let total_w = MARGIN * 3.0 + panel_w + NOTES_W;
    let total_h = MARGIN * 2.0 + PANEL_H;

    let mut svg = String::with_capacity(4096);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {total_w} {total_h}">"#,
        total_w as u32, total_h as u32,
    );

    // Light and dark palettes via prefers-color-scheme
    svg.push_str(
        r##"<style>
  text { font-family: "DejaVu Sans Mono", "Consolas", monospace; }
  .label { font-size: 12px; font-weight: bold; fill: #333; }
  .note { font-size: 11px; fill: #555; }
  .frame { fill: #f4f4f4; stroke: #999; stroke-width: 1; }
  .region { fill: none; stroke: #c07a2c; stroke-width: 1; stroke-dasharray: 5,3; }
  .gap { fill: #f3d9a4; opacity: 0.6; }
  .cover { fill: #6ba3d6; stroke: #2c6faa; stroke-width: 1.5; }
  .marquee { fill: #8cc08a; stroke: #3f8a3c; stroke-width: 1.5; }
  .caption { fill: none; stroke: #888; stroke-width: 1; stroke-dasharray: 2,2; }
  @media (prefers-color-scheme: dark) {
    .label { fill: #e0e0e0; }
    .note { fill: #aaa; }
    .frame { fill: #2d2d2d; stroke: #555; }
    .gap { fill: #6b5426; }
    .cover { fill: #3a72a4; stroke: #5a9fd4; }
    .marquee { fill: #3f6e3d; stroke: #6fb86b; }
    .caption { stroke: #777; }
  }
</style>
"##,
    );

    let ox = MARGIN;
    let oy = MARGIN;
    let place = |r: &Rect| {
        (
            ox + r.x as f64 * scale,
            oy + r.y as f64 * scale,
            r.width as f64 * scale,
            r.height as f64 * scale,
        )
    };

    push_rect(&mut svg, (ox, oy, panel_w, PANEL_H), "frame");

    // Padding gaps: above marquee, between, below cover.
    let s = &plan.stack;
    let gaps = [
        (plan.region.y, s.marquee_top),
        (s.marquee_top + s.marquee.height, s.cover_top),
        (s.content_bottom(), plan.region.bottom()),
    ];
    for (top, bottom) in gaps {
        if bottom > top {
            let gap = Rect::new(0, top, plan.frame.width, bottom - top);
            push_rect(&mut svg, place(&gap), "gap");
        }
    }

    push_rect(&mut svg, place(&plan.region), "region");
    push_rect(&mut svg, place(&plan.marquee), "marquee");
    push_rect(&mut svg, place(&plan.cover), "cover");
    for caption in plan.captions() {
        let (x, y, w, h) = place(&caption.style.rect);
        push_rect(&mut svg, (x, y, w, h), "caption");
        let (tx, anchor) = match caption.style.align {
            TextAlign::Left => (x + 3.0, "start"),
            TextAlign::Center => (x + w / 2.0, "middle"),
            TextAlign::Right => (x + w - 3.0, "end"),
        };
        let text = if caption.style.uppercase { "CATEGORY" } else { "Title" };
        let _ = writeln!(
            svg,
            r#"<text x="{tx:.1}" y="{:.1}" class="note" text-anchor="{anchor}">{text}</text>"#,
            y + h / 2.0 + 4.0,
        );
    }

    // Annotation column
    let nx = ox + panel_w + MARGIN;
    let mut ny = oy + 12.0;
    push_note(&mut svg, nx, &mut ny, "label", &format!("Frame  {}", plan.frame));
    push_note(
        &mut svg,
        nx,
        &mut ny,
        "note",
        &format!("region y {}..{} ({}px)", plan.region.y, plan.region.bottom(), plan.region.height),
    );
    push_note(&mut svg, nx, &mut ny, "note", &format!("padding {}px ×3", s.padding));
    ny += NOTE_LINE_H / 2.0;
    push_note(&mut svg, nx, &mut ny, "label", &format!("Marquee  {}", s.marquee));
    push_note(
        &mut svg,
        nx,
        &mut ny,
        "note",
        &format!("at ({}, {}), center y {}", plan.marquee.x, plan.marquee.y, s.marquee_y_center),
    );
    ny += NOTE_LINE_H / 2.0;
    push_note(&mut svg, nx, &mut ny, "label", &format!("Cover  {}", s.cover));
    push_note(
        &mut svg,
        nx,
        &mut ny,
        "note",
        &format!("at ({}, {}), center y {}", plan.cover.x, plan.cover.y, s.cover_y_center),
    );
    ny += NOTE_LINE_H / 2.0;
    for caption in plan.captions() {
        let r = caption.style.rect;
        let text = format!(
            "caption {}×{} at ({}, {}), ≤{}px {:?}",
            r.width, r.height, r.x, r.y, caption.style.max_px, caption.style.align
        );
        push_note(&mut svg, nx, &mut ny, "note", &text);
    }

    svg.push_str("</svg>\n");
    svg
}

fn push_note(svg: &mut String, x: f64, y: &mut f64, class: &str, text: &str) {
    let _ = writeln!(
        svg,
        r#"<text x="{x:.1}" y="{:.1}" class="{class}">{}</text>"#,
        *y,
        escape_xml(text)
    );
    *y += NOTE_LINE_H;
}

fn push_rect(svg: &mut String, (x, y, w, h): (f64, f64, f64, f64), class: &str) {
    let _ = writeln!(
        svg,
        r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" class="{class}"/>"#
    );
}

/// Escape special characters for XML text content.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
