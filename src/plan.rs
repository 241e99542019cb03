//! Card planning: from two source sizes to absolute placements.
//!
//! [`plan_card`] runs the stack constraint of a [`Template`] and converts the
//! resulting Y centers into frame-centered rects. [`CardPlan::image_layers`]
//! lists the image operations in compositing order (cover first, marquee on
//! top); captions follow as a separate stage.

use crate::color::Color;
use crate::constraint::{LayoutError, Rect, Size};
use crate::stack::StackLayout;
use crate::template::{CaptionStyle, Template};

/// Which source image a layer draws.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayerSource {
    /// The item's cover.
    Cover,
    /// The item's marquee.
    Marquee,
}

/// How a layer combines with the pixels below it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositeMode {
    /// Source-over alpha blending.
    #[default]
    Over,
}

/// One resized image placed on the frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageLayer {
    /// Image to draw.
    pub source: LayerSource,
    /// Target rect on the frame; the source is resized to `rect.size()`.
    pub rect: Rect,
    /// Blend mode.
    pub mode: CompositeMode,
}

/// One caption line, ready for a text renderer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaptionBox {
    /// Box and type settings.
    pub style: CaptionStyle,
    /// Fill color.
    pub color: Color,
}

/// Everything needed to composite one card, in frame coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CardPlan {
    /// Frame dimensions.
    pub frame: Size,
    /// Content region rect spanning the frame width.
    pub region: Rect,
    /// Stack solution (sizes, padding, Y centers).
    pub stack: StackLayout,
    /// Cover rect, frame-centered.
    pub cover: Rect,
    /// Marquee rect, frame-centered.
    pub marquee: Rect,
    /// Title caption.
    pub title: CaptionBox,
    /// Category caption.
    pub category: CaptionBox,
}

impl CardPlan {
    /// Image layers in compositing order.
    pub const fn image_layers(&self) -> [ImageLayer; 2] {
        [
            ImageLayer {
                source: LayerSource::Cover,
                rect: self.cover,
                mode: CompositeMode::Over,
            },
            ImageLayer {
                source: LayerSource::Marquee,
                rect: self.marquee,
                mode: CompositeMode::Over,
            },
        ]
    }

    /// Caption boxes in drawing order.
    pub const fn captions(&self) -> [CaptionBox; 2] {
        [self.title, self.category]
    }

    /// Centers of the marquee and cover as `(x, y)` frame coordinates.
    pub const fn centers(&self) -> ((u32, u32), (u32, u32)) {
        let x = self.frame.width / 2;
        (
            (x, self.stack.marquee_y_center),
            (x, self.stack.cover_y_center),
        )
    }
}

/// Plan a card for the given cover and marquee source sizes.
pub fn plan_card(
    template: &Template,
    cover_source: Size,
    marquee_source: Size,
) -> Result<CardPlan, LayoutError> {
    let stack = template
        .stack_constraint()
        .compute(cover_source, marquee_source)?;
    let caption = |style: CaptionStyle| CaptionBox {
        style,
        color: template.text_color,
    };
    Ok(CardPlan {
        frame: template.frame,
        region: Rect::new(0, template.region.top, template.frame.width, template.region.height),
        stack,
        cover: stack.cover_rect(template.frame.width),
        marquee: stack.marquee_rect(template.frame.width),
        title: caption(template.title),
        category: caption(template.category),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ContentRegion;

    #[test]
    fn stock_plan_places_both_images() {
        let plan = plan_card(&Template::STOCK, Size::new(400, 600), Size::new(1000, 100)).unwrap();
        assert_eq!(plan.cover, Rect::new(81, 144, 475, 713));
        assert_eq!(plan.marquee, Rect::new(24, 69, 589, 58));
        assert!(plan.region.contains(&plan.cover));
        assert!(plan.region.contains(&plan.marquee));
        assert!(!plan.cover.intersects(&plan.marquee));
    }

    #[test]
    fn layers_draw_cover_then_marquee() {
        let plan = plan_card(&Template::STOCK, Size::new(400, 600), Size::new(1000, 100)).unwrap();
        let [first, second] = plan.image_layers();
        assert_eq!(first.source, LayerSource::Cover);
        assert_eq!(second.source, LayerSource::Marquee);
        assert_eq!(first.rect.size(), plan.stack.cover);
        assert_eq!(second.mode, CompositeMode::Over);
    }

    #[test]
    fn centers_match_stack() {
        let plan = plan_card(&Template::STOCK, Size::new(400, 600), Size::new(1000, 400)).unwrap();
        let ((mx, my), (cx, cy)) = plan.centers();
        assert_eq!(mx, 319);
        assert_eq!(cx, 319);
        assert_eq!(my, plan.stack.marquee_y_center);
        assert_eq!(cy, plan.stack.cover_y_center);
        // Top-left recovered from the center is the stacked top.
        assert_eq!(my - plan.marquee.height / 2, plan.marquee.y);
        assert_eq!(cy - plan.cover.height / 2, plan.cover.y);
    }

    #[test]
    fn captions_use_template_color() {
        let mut t = Template::STOCK;
        t.text_color = Color::rgb(10, 20, 30);
        let plan = plan_card(&t, Size::new(10, 10), Size::new(10, 1)).unwrap();
        let [title, category] = plan.captions();
        assert_eq!(title.color, Color::rgb(10, 20, 30));
        assert!(category.style.uppercase);
    }

    #[test]
    fn infeasible_template_propagates() {
        let mut t = Template::STOCK;
        t.region = ContentRegion::new(52, 720);
        // Cover fills 713 of 720, floor 30 leaves nothing.
        assert!(matches!(
            plan_card(&t, Size::new(400, 600), Size::new(1000, 400)),
            Err(LayoutError::Infeasible { .. })
        ));
    }
}
