//! Card template geometry.
//!
//! Every pixel constant of a card lives here rather than in the layout code,
//! so alternate template artwork only needs a different [`Template`] value.
//! [`Template::default`] describes the stock 638×1012 frame.

use crate::color::Color;
use crate::constraint::{Rect, Size};
use crate::stack::{ContentRegion, DEFAULT_PADDING_FLOOR, StackConstraint};

/// Horizontal alignment of caption text inside its box.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Fixed box and type settings for one caption line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(deny_unknown_fields)
)]
pub struct CaptionStyle {
    /// Text box in frame coordinates. Text never leaves it.
    pub rect: Rect,
    /// Starting glyph height in pixels; shrunk until the text fits `rect`.
    pub max_px: u32,
    /// Alignment inside `rect`.
    pub align: TextAlign,
    /// Upper-case the text before rendering.
    pub uppercase: bool,
}

impl CaptionStyle {
    /// Stock title line: left-aligned under the content region.
    pub const TITLE: Self = Self {
        rect: Rect::new(24, 890, 590, 48),
        max_px: 32,
        align: TextAlign::Left,
        uppercase: false,
    };

    /// Stock category line: upper-cased, right-aligned under the title.
    pub const CATEGORY: Self = Self {
        rect: Rect::new(24, 944, 590, 40),
        max_px: 26,
        align: TextAlign::Right,
        uppercase: true,
    };
}

/// Geometry and colors of a card.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default, deny_unknown_fields)
)]
pub struct Template {
    /// Frame (canvas) dimensions; the template artwork must match.
    pub frame: Size,
    /// Vertical band holding marquee, cover and padding.
    pub region: ContentRegion,
    /// Maximum cover dimensions.
    pub cover_box: Size,
    /// Maximum marquee dimensions.
    pub marquee_box: Size,
    /// Combined padding reserved when the marquee has to shrink.
    pub padding_floor: u32,
    /// Item title caption.
    pub title: CaptionStyle,
    /// Category label caption.
    pub category: CaptionStyle,
    /// Caption fill.
    pub text_color: Color,
    /// Outline drawn along the template's alpha edge.
    pub border_color: Color,
    /// Outline thickness in pixels. `0` disables it.
    pub border_width: u32,
    /// Alpha erosion radius applied to the template. `0` disables it.
    pub alpha_erode: u32,
}

impl Template {
    /// The stock template.
    pub const STOCK: Self = Self {
        frame: Size::new(638, 1012),
        region: ContentRegion::DEFAULT,
        cover_box: StackConstraint::DEFAULT_COVER_BOUNDS,
        marquee_box: StackConstraint::DEFAULT_MARQUEE_BOUNDS,
        padding_floor: DEFAULT_PADDING_FLOOR,
        title: CaptionStyle::TITLE,
        category: CaptionStyle::CATEGORY,
        text_color: Color::BLACK,
        border_color: Color::BLACK,
        border_width: 1,
        alpha_erode: 1,
    };

    /// Stack constraint built from this template's boxes and region.
    pub const fn stack_constraint(&self) -> StackConstraint {
        StackConstraint::new(self.cover_box, self.marquee_box, self.region)
            .padding_floor(self.padding_floor)
    }

    /// Frame as a rect at the origin.
    pub const fn frame_rect(&self) -> Rect {
        Rect::new(0, 0, self.frame.width, self.frame.height)
    }

    /// First geometry problem found, if any.
    ///
    /// Checks that the region, both boxes and both caption boxes fit the
    /// frame and that no dimension is zero.
    pub fn problem(&self) -> Option<&'static str> {
        let frame = self.frame_rect();
        if self.frame.is_empty() {
            return Some("frame has a zero dimension");
        }
        let Some(region_bottom) = self.region.checked_bottom() else {
            return Some("content region extends past the coordinate range");
        };
        if self.region.height == 0 || region_bottom > self.frame.height {
            return Some("content region is empty or extends past the frame");
        }
        if self.cover_box.is_empty() || self.marquee_box.is_empty() {
            return Some("cover and marquee boxes must be non-empty");
        }
        if self.cover_box.width > self.frame.width || self.marquee_box.width > self.frame.width {
            return Some("cover and marquee boxes must not be wider than the frame");
        }
        if self.cover_box.height > self.region.height
            || self.marquee_box.height > self.region.height
        {
            return Some("cover and marquee boxes must not be taller than the content region");
        }
        for caption in [&self.title, &self.category] {
            if caption.rect.size().is_empty()
                || !caption.rect.is_addressable()
                || !frame.contains(&caption.rect)
            {
                return Some("caption boxes must be non-empty and inside the frame");
            }
            if caption.max_px == 0 {
                return Some("caption max_px must be positive");
            }
        }
        None
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::STOCK
    }
}
