//! Cover + marquee card layout, and a batch compositor for game catalogs.
//!
//! The layout core is pure integer geometry: no pixel operations, no
//! allocations, `no_std` compatible. The `batch` feature adds the glue that
//! turns layouts into images: directory discovery, metadata title lookup, a
//! raster compositor and an interruptible batch runner.
//!
//! # Modules
//!
//! - [`constraint`]: `Size`/`Rect` and the aspect-fit resizer
//! - [`stack`]: marquee fit policy and the vertical stack solver
//! - [`template`]: card geometry as data
//! - [`color`]: caption and border colors
//! - [`plan`]: per-card placements and compositing layers
//! - `svg`: SVG diagram of a card plan (feature `svg`)
//! - `config`, `metadata`, `compose`, `batch`: batch glue (feature `batch`)

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod color;
pub mod constraint;
pub mod plan;
pub mod stack;
pub mod template;

#[cfg(feature = "svg")]
pub mod svg;

#[cfg(feature = "batch")]
pub mod batch;
#[cfg(feature = "batch")]
pub mod compose;
#[cfg(feature = "batch")]
pub mod config;
#[cfg(feature = "batch")]
pub mod metadata;

// Re-exports: core types
pub use color::Color;
pub use constraint::{LayoutError, Rect, Size, fit_checked, fit_inside};
pub use plan::{CardPlan, CaptionBox, CompositeMode, ImageLayer, LayerSource, plan_card};
pub use stack::{
    ContentRegion, MarqueeFit, StackConstraint, StackLayout, fit_marquee, solve_stack,
};
pub use template::{CaptionStyle, Template, TextAlign};
