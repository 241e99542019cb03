//! Aspect-fit sizing for a source image inside a bounding box.
//!
//! Pure integer geometry: no pixel operations, no allocations, `no_std`
//! compatible. All scaling uses 64-bit cross products and truncates toward
//! zero, so results are reproducible across platforms.
//!
//! # Example
//!
//! ```
//! use coverstack::{Size, fit_inside};
//!
//! // Portrait cover into the default 589×713 cover box: height limits.
//! let resolved = fit_inside(Size::new(400, 600), Size::new(589, 713));
//! assert_eq!(resolved, Size::new(475, 713));
//! ```

use core::fmt;

/// Width × height dimensions in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either axis is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether this size fits inside `bounds` on both axes.
    pub const fn fits_within(&self, bounds: Size) -> bool {
        self.width <= bounds.width && self.height <= bounds.height
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rect.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Dimensions of the rect.
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether both edges are representable without saturating.
    pub const fn is_addressable(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    /// Whether `other` lies entirely inside this rect.
    pub const fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether the two rects share any pixel.
    pub const fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Layout computation error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// Source image has zero width or height.
    ZeroSourceDimension,
    /// Bounding box has zero width or height.
    ZeroBoundingBox,
    /// The cover leaves no room for a marquee once the padding floor is
    /// reserved.
    Infeasible {
        /// Resolved cover height.
        cover_height: u32,
        /// Height of the content region.
        available: u32,
    },
    /// Stacked content is taller than the content region.
    Overflow {
        /// Combined marquee and cover height.
        content: u32,
        /// Height of the content region.
        available: u32,
    },
    /// The content region ends past `u32::MAX`.
    RegionOutOfRange,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ZeroSourceDimension => f.write_str("source image has a zero dimension"),
            Self::ZeroBoundingBox => f.write_str("bounding box has a zero dimension"),
            Self::Infeasible {
                cover_height,
                available,
            } => write!(
                f,
                "cover height {cover_height} leaves no room for a marquee in {available}px"
            ),
            Self::Overflow { content, available } => write!(
                f,
                "stacked content {content}px overflows the {available}px content region"
            ),
            Self::RegionOutOfRange => f.write_str("content region ends past the coordinate range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LayoutError {}

/// Largest size with the source's aspect ratio that fits inside `bounds`.
///
/// Width limits when `source.w * bounds.h > source.h * bounds.w`; otherwise
/// height limits, so equal ratios resolve to the height branch. The free
/// axis is truncated but never below one pixel, so extreme aspect ratios
/// still produce a drawable size. The caller guarantees non-zero source
/// dimensions; see [`fit_checked`] for a validating variant.
pub const fn fit_inside(source: Size, bounds: Size) -> Size {
    let cross_w = source.width as u64 * bounds.height as u64;
    let cross_h = source.height as u64 * bounds.width as u64;
    if cross_w > cross_h {
        // Width constrains, derive height.
        Size::new(bounds.width, height_at_width(source, bounds.width))
    } else {
        // Height constrains, derive width.
        let w = source.width as u64 * bounds.height as u64 / source.height as u64;
        Size::new(at_least_one(w), bounds.height)
    }
}

/// [`fit_inside`] with zero-dimension validation.
pub fn fit_checked(source: Size, bounds: Size) -> Result<Size, LayoutError> {
    if source.is_empty() {
        return Err(LayoutError::ZeroSourceDimension);
    }
    if bounds.is_empty() {
        return Err(LayoutError::ZeroBoundingBox);
    }
    Ok(fit_inside(source, bounds))
}

/// Height of `source` when scaled to exactly `width`, truncated to at
/// least one pixel.
pub(crate) const fn height_at_width(source: Size, width: u32) -> u32 {
    at_least_one(source.height as u64 * width as u64 / source.width as u64)
}

const fn at_least_one(v: u64) -> u32 {
    if v == 0 { 1 } else { v as u32 }
}
