//! Vertical stacking of a marquee above a cover inside a content region.
//!
//! Two steps, both pure integer geometry:
//!
//! 1. [`MarqueeFit`] decides the marquee size given the already-resolved
//!    cover height. The marquee prefers the full box width; when that would
//!    overflow the region, it is re-fit under a height cap that reserves a
//!    minimum combined padding.
//! 2. [`solve_stack`] splits the remaining space into three equal gaps
//!    (above the marquee, between the two images, below the cover) and
//!    returns absolute Y coordinates.
//!
//! [`StackConstraint`] runs the cover fit, the marquee fit and the solver in
//! one call.
//!
//! ```text
//!   region.top ─┬───────────────┐
//!               │    padding    │
//!               ├───────────────┤ ← marquee_top
//!               │    marquee    │
//!               ├───────────────┤
//!               │    padding    │
//!               ├───────────────┤ ← cover_top
//!               │     cover     │
//!               ├───────────────┤
//!               │  padding (+r) │
//!  region.bottom┴───────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use coverstack::{ContentRegion, Size, StackConstraint};
//!
//! let layout = StackConstraint::default()
//!     .compute(Size::new(400, 600), Size::new(1000, 100))
//!     .unwrap();
//!
//! assert_eq!(layout.cover, Size::new(475, 713));
//! assert_eq!(layout.marquee, Size::new(589, 58));
//! assert!(layout.marquee_y_center < layout.cover_y_center);
//! ```

use crate::constraint::{LayoutError, Rect, Size, fit_checked, fit_inside, height_at_width};

/// Default minimum combined padding reserved when the marquee is shrunk.
pub const DEFAULT_PADDING_FLOOR: u32 = 30;

/// Vertical band of the frame reserved for marquee, cover and padding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ContentRegion {
    /// Y of the first row of the region.
    pub top: u32,
    /// Height of the region in pixels.
    pub height: u32,
}

impl ContentRegion {
    /// Region of the stock 638×1012 template: rows 52 through 875.
    pub const DEFAULT: Self = Self::new(52, 823);

    pub const fn new(top: u32, height: u32) -> Self {
        Self { top, height }
    }

    /// Build a region from its top and (exclusive) bottom rows.
    pub const fn from_bounds(top: u32, bottom: u32) -> Self {
        Self {
            top,
            height: bottom.saturating_sub(top),
        }
    }

    /// Exclusive bottom row, saturating at `u32::MAX`.
    pub const fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }

    /// Exclusive bottom row, or `None` when it does not fit in `u32`.
    pub const fn checked_bottom(&self) -> Option<u32> {
        self.top.checked_add(self.height)
    }
}

impl Default for ContentRegion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Marquee sizing policy.
///
/// The marquee is scaled to the full box width when the stacked content
/// still fits the region. Otherwise its height is capped at
/// `available - cover_height - padding_floor` and it is aspect-fit again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarqueeFit {
    /// Maximum marquee dimensions.
    pub bounds: Size,
    /// Height of the content region.
    pub available: u32,
    /// Combined padding kept free when the marquee has to shrink.
    pub padding_floor: u32,
}

impl MarqueeFit {
    /// Policy for the given marquee box, default region height and floor.
    pub const fn new(bounds: Size) -> Self {
        Self {
            bounds,
            available: ContentRegion::DEFAULT.height,
            padding_floor: DEFAULT_PADDING_FLOOR,
        }
    }

    /// Set the available region height.
    pub const fn available(mut self, available: u32) -> Self {
        self.available = available;
        self
    }

    /// Set the padding floor reserved on overflow.
    pub const fn padding_floor(mut self, floor: u32) -> Self {
        self.padding_floor = floor;
        self
    }

    /// Resolve the marquee size for a cover of `cover_height` pixels.
    pub fn compute(&self, source: Size, cover_height: u32) -> Result<Size, LayoutError> {
        if source.is_empty() {
            return Err(LayoutError::ZeroSourceDimension);
        }
        if self.bounds.is_empty() {
            return Err(LayoutError::ZeroBoundingBox);
        }

        let full_width_height = height_at_width(source, self.bounds.width);
        let total = full_width_height as u64 + cover_height as u64;

        if total <= self.available as u64 {
            if full_width_height <= self.bounds.height {
                return Ok(Size::new(self.bounds.width, full_width_height));
            }
            // Fits the region but not the marquee box: the box still wins.
            return Ok(fit_inside(source, self.bounds));
        }

        let max_height =
            self.available as i64 - cover_height as i64 - self.padding_floor as i64;
        if max_height <= 0 {
            return Err(LayoutError::Infeasible {
                cover_height,
                available: self.available,
            });
        }
        let capped = Size::new(self.bounds.width, self.bounds.height.min(max_height as u32));
        Ok(fit_inside(source, capped))
    }
}

/// [`MarqueeFit::compute`] with every parameter spelled out.
pub fn fit_marquee(
    source: Size,
    cover_height: u32,
    available: u32,
    bounds: Size,
    padding_floor: u32,
) -> Result<Size, LayoutError> {
    MarqueeFit::new(bounds)
        .available(available)
        .padding_floor(padding_floor)
        .compute(source, cover_height)
}

/// Resolved vertical layout of a marquee stacked above a cover.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackLayout {
    /// Final marquee size.
    pub marquee: Size,
    /// Final cover size.
    pub cover: Size,
    /// Each of the three equal gaps.
    pub padding: u32,
    /// First row of the marquee.
    pub marquee_top: u32,
    /// Row of the marquee's vertical center (`marquee_top + height / 2`).
    pub marquee_y_center: u32,
    /// First row of the cover.
    pub cover_top: u32,
    /// Row of the cover's vertical center (`cover_top + height / 2`).
    pub cover_y_center: u32,
}

impl StackLayout {
    /// Marquee rect, horizontally centered in a frame of `frame_width`.
    pub const fn marquee_rect(&self, frame_width: u32) -> Rect {
        Rect::new(
            center_offset(frame_width, self.marquee.width),
            self.marquee_top,
            self.marquee.width,
            self.marquee.height,
        )
    }

    /// Cover rect, horizontally centered in a frame of `frame_width`.
    pub const fn cover_rect(&self, frame_width: u32) -> Rect {
        Rect::new(
            center_offset(frame_width, self.cover.width),
            self.cover_top,
            self.cover.width,
            self.cover.height,
        )
    }

    /// Exclusive bottom row of the cover.
    pub const fn content_bottom(&self) -> u32 {
        self.cover_top + self.cover.height
    }
}

const fn center_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// Place an already-sized marquee and cover inside `region`.
///
/// The free space is divided by three and truncated; any remainder ends up
/// below the cover. Content taller than the region is rejected.
pub fn solve_stack(
    marquee: Size,
    cover: Size,
    region: ContentRegion,
) -> Result<StackLayout, LayoutError> {
    if region.checked_bottom().is_none() {
        return Err(LayoutError::RegionOutOfRange);
    }
    let total = marquee.height as u64 + cover.height as u64;
    if total > region.height as u64 {
        return Err(LayoutError::Overflow {
            content: total.min(u32::MAX as u64) as u32,
            available: region.height,
        });
    }

    let padding = (region.height - total as u32) / 3;
    let marquee_top = region.top + padding;
    let cover_top = marquee_top + marquee.height + padding;

    Ok(StackLayout {
        marquee,
        cover,
        padding,
        marquee_top,
        marquee_y_center: marquee_top + marquee.height / 2,
        cover_top,
        cover_y_center: cover_top + cover.height / 2,
    })
}

/// Cover box, marquee policy and content region bundled together.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackConstraint {
    /// Maximum cover dimensions.
    pub cover_bounds: Size,
    /// Maximum marquee dimensions.
    pub marquee_bounds: Size,
    /// Content region inside the frame.
    pub region: ContentRegion,
    /// Padding floor used when the marquee must shrink.
    pub padding_floor: u32,
}

impl StackConstraint {
    /// Stock cover box.
    pub const DEFAULT_COVER_BOUNDS: Size = Size::new(589, 713);
    /// Stock marquee box.
    pub const DEFAULT_MARQUEE_BOUNDS: Size = Size::new(589, 109);

    pub const fn new(cover_bounds: Size, marquee_bounds: Size, region: ContentRegion) -> Self {
        Self {
            cover_bounds,
            marquee_bounds,
            region,
            padding_floor: DEFAULT_PADDING_FLOOR,
        }
    }

    /// Set the padding floor reserved on overflow.
    pub const fn padding_floor(mut self, floor: u32) -> Self {
        self.padding_floor = floor;
        self
    }

    /// Fit both sources and stack them.
    pub fn compute(&self, cover_source: Size, marquee_source: Size) -> Result<StackLayout, LayoutError> {
        let cover = fit_checked(cover_source, self.cover_bounds)?;
        let marquee = MarqueeFit::new(self.marquee_bounds)
            .available(self.region.height)
            .padding_floor(self.padding_floor)
            .compute(marquee_source, cover.height)?;
        solve_stack(marquee, cover, self.region)
    }
}

impl Default for StackConstraint {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_COVER_BOUNDS,
            Self::DEFAULT_MARQUEE_BOUNDS,
            ContentRegion::DEFAULT,
        )
    }
}
