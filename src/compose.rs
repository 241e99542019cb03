//! Pixel compositing behind the [`Compositor`] capability.
//!
//! The batch driver only ever talks to a `Compositor`: one call builds the
//! base card (prepared template plus image layers), a second draws captions
//! onto it. [`RasterCompositor`] implements both in memory with `image` and
//! `rusttype`; tests substitute their own implementations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use rusttype::{Font, Scale, point};
use thiserror::Error;

use crate::color::Color;
use crate::constraint::{Rect, Size};
use crate::plan::{CaptionBox, CardPlan, CompositeMode, ImageLayer, LayerSource};
use crate::template::{Template, TextAlign};

/// Smallest glyph height tried when shrinking a caption to fit its box.
const MIN_CAPTION_PX: u32 = 8;

/// Failure inside a compositing backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to load '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("template '{}' is {actual}, expected {expected}", path.display())]
    TemplateSize {
        path: PathBuf,
        expected: Size,
        actual: Size,
    },
    #[error("no usable font at '{}'", path.display())]
    FontUnavailable { path: PathBuf },
}

/// A source image placed by an [`ImageLayer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcedLayer {
    /// Image file to draw.
    pub path: PathBuf,
    /// Placement and blend mode.
    pub layer: ImageLayer,
}

/// Base card request: template preparation plus layered images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeSpec {
    /// Template artwork.
    pub base: PathBuf,
    /// Expected template dimensions.
    pub frame: Size,
    /// Alpha erosion radius for the template.
    pub alpha_erode: u32,
    /// Outline color along the eroded alpha edge.
    pub border_color: Color,
    /// Outline thickness; `0` disables it.
    pub border_width: u32,
    /// Image layers in drawing order.
    pub layers: Vec<SourcedLayer>,
}

impl CompositeSpec {
    /// Request for one planned card.
    pub fn for_card(
        template_path: &Path,
        template: &Template,
        plan: &CardPlan,
        cover: &Path,
        marquee: &Path,
    ) -> Self {
        let layers = plan
            .image_layers()
            .into_iter()
            .map(|layer| SourcedLayer {
                path: match layer.source {
                    LayerSource::Cover => cover.to_path_buf(),
                    LayerSource::Marquee => marquee.to_path_buf(),
                },
                layer,
            })
            .collect();
        Self {
            base: template_path.to_path_buf(),
            frame: plan.frame,
            alpha_erode: template.alpha_erode,
            border_color: template.border_color,
            border_width: template.border_width,
            layers,
        }
    }
}

/// One caption line to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionLayer {
    /// Text as given; upper-casing follows `caption.style.uppercase`.
    pub text: String,
    /// Box, type settings and color.
    pub caption: CaptionBox,
}

impl CaptionLayer {
    /// Text after applying the style's case transform.
    pub fn rendered_text(&self) -> String {
        if self.caption.style.uppercase {
            self.text.to_uppercase()
        } else {
            self.text.clone()
        }
    }
}

/// Compositing capability used by the batch driver.
pub trait Compositor: Sync {
    /// Prepare the template and draw every image layer onto it.
    fn compose_base(&self, spec: &CompositeSpec) -> Result<RgbaImage, BackendError>;

    /// Draw captions onto an already composed card.
    fn overlay_captions(
        &self,
        canvas: &mut RgbaImage,
        captions: &[CaptionLayer],
    ) -> Result<(), BackendError>;
}

type BaseKey = (PathBuf, u32, Color, u32);

/// In-memory raster backend.
///
/// The prepared template is cached per (path, erosion, border) so a batch
/// decodes and erodes it once.
pub struct RasterCompositor {
    font: Option<Font<'static>>,
    font_path: PathBuf,
    bases: Mutex<HashMap<BaseKey, Arc<RgbaImage>>>,
}

impl RasterCompositor {
    /// Backend using the font at `font_path`.
    ///
    /// A missing or unparsable font is not an error here: base composites
    /// still work and every caption request fails with
    /// [`BackendError::FontUnavailable`].
    pub fn load(font_path: &Path) -> Self {
        let font = match fs::read(font_path) {
            Ok(bytes) => {
                let font = Font::try_from_vec(bytes);
                if font.is_none() {
                    warn!("'{}' is not a usable font", font_path.display());
                }
                font
            }
            Err(e) => {
                warn!("cannot read font '{}': {e}", font_path.display());
                None
            }
        };
        Self {
            font,
            font_path: font_path.to_path_buf(),
            bases: Mutex::new(HashMap::new()),
        }
    }

    /// Whether captions can be drawn.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn prepared_base(&self, spec: &CompositeSpec) -> Result<Arc<RgbaImage>, BackendError> {
        let key = (
            spec.base.clone(),
            spec.alpha_erode,
            spec.border_color,
            spec.border_width,
        );
        if let Some(hit) = self.cache().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let template = load_rgba(&spec.base)?;
        let actual = Size::new(template.width(), template.height());
        if actual != spec.frame {
            return Err(BackendError::TemplateSize {
                path: spec.base.clone(),
                expected: spec.frame,
                actual,
            });
        }
        let mut base = erode_alpha(&template, spec.alpha_erode);
        draw_alpha_outline(&mut base, spec.border_color, spec.border_width);
        debug!("prepared template {}", spec.base.display());

        let base = Arc::new(base);
        self.cache().insert(key, Arc::clone(&base));
        Ok(base)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<BaseKey, Arc<RgbaImage>>> {
        // A poisoned cache only ever holds fully built entries.
        self.bases.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Compositor for RasterCompositor {
    fn compose_base(&self, spec: &CompositeSpec) -> Result<RgbaImage, BackendError> {
        let mut canvas = (*self.prepared_base(spec)?).clone();
        for sourced in &spec.layers {
            draw_layer(&mut canvas, &sourced.path, &sourced.layer)?;
        }
        Ok(canvas)
    }

    fn overlay_captions(
        &self,
        canvas: &mut RgbaImage,
        captions: &[CaptionLayer],
    ) -> Result<(), BackendError> {
        let font = self.font.as_ref().ok_or_else(|| BackendError::FontUnavailable {
            path: self.font_path.clone(),
        })?;
        for caption in captions {
            draw_caption(canvas, font, caption);
        }
        Ok(())
    }
}

fn load_rgba(path: &Path) -> Result<RgbaImage, BackendError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| BackendError::Load {
            path: path.to_path_buf(),
            source,
        })
}

fn draw_layer(canvas: &mut RgbaImage, path: &Path, layer: &ImageLayer) -> Result<(), BackendError> {
    let Rect {
        x,
        y,
        width,
        height,
    } = layer.rect;
    if width == 0 || height == 0 {
        return Ok(());
    }
    let source = load_rgba(path)?;
    let resized = if source.dimensions() == (width, height) {
        source
    } else {
        imageops::resize(&source, width, height, FilterType::Lanczos3)
    };
    match layer.mode {
        CompositeMode::Over => imageops::overlay(canvas, &resized, x as i64, y as i64),
    }
    Ok(())
}

/// Copy of `img` whose alpha is the minimum over a (2r+1)² window.
///
/// Pixels outside the image count as transparent, so the outer `radius`
/// rows and columns always clear.
pub fn erode_alpha(img: &RgbaImage, radius: u32) -> RgbaImage {
    let mut out = img.clone();
    if radius == 0 {
        return out;
    }
    let (w, h) = img.dimensions();
    let alpha: Vec<u8> = img.pixels().map(|p| p[3]).collect();
    let horizontal = min_filter_1d(&alpha, w, h, radius, true);
    let eroded = min_filter_1d(&horizontal, w, h, radius, false);
    for (pixel, a) in out.pixels_mut().zip(eroded) {
        pixel[3] = a;
    }
    out
}

fn min_filter_1d(src: &[u8], w: u32, h: u32, radius: u32, horizontal: bool) -> Vec<u8> {
    let (w, h, r) = (w as i64, h as i64, radius as i64);
    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut m = u8::MAX;
            for d in -r..=r {
                let (sx, sy) = if horizontal { (x + d, y) } else { (x, y + d) };
                let v = if sx < 0 || sy < 0 || sx >= w || sy >= h {
                    0
                } else {
                    src[(sy * w + sx) as usize]
                };
                m = m.min(v);
                if m == 0 {
                    break;
                }
            }
            out[(y * w + x) as usize] = m;
        }
    }
    out
}

/// Paint `color` over the innermost `width` pixels of the visible shape.
///
/// The outline follows the alpha mask, so rounded or cut corners keep
/// their shape. The pixel's own alpha is preserved.
pub fn draw_alpha_outline(img: &mut RgbaImage, color: Color, width: u32) {
    if width == 0 {
        return;
    }
    let inner = erode_alpha(img, width);
    for (pixel, kept) in img.pixels_mut().zip(inner.pixels()) {
        if pixel[3] > 0 && kept[3] == 0 {
            let mut outline = color.to_array();
            outline[3] = pixel[3];
            *pixel = Rgba(outline);
        }
    }
}

/// Horizontal advance of `text` at `scale`.
fn text_width(font: &Font<'_>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Largest glyph height ≤ `max_px` at which `text` fits `rect`.
fn fit_scale(font: &Font<'_>, text: &str, rect: Rect, max_px: u32) -> Scale {
    let max_px = max_px.min(rect.height).max(MIN_CAPTION_PX);
    let mut px = max_px;
    while px > MIN_CAPTION_PX {
        let scale = Scale::uniform(px as f32);
        if text_width(font, scale, text) <= rect.width as f32 {
            return scale;
        }
        px -= 1;
    }
    Scale::uniform(MIN_CAPTION_PX as f32)
}

fn draw_caption(canvas: &mut RgbaImage, font: &Font<'_>, caption: &CaptionLayer) {
    let text = caption.rendered_text();
    let style = caption.caption.style;
    let rect = style.rect;
    if text.is_empty() || rect.width == 0 || rect.height == 0 {
        return;
    }

    let scale = fit_scale(font, &text, rect, style.max_px);
    let width = text_width(font, scale, &text);
    let free = (rect.width as f32 - width).max(0.0);
    let x = rect.x as f32
        + match style.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (free / 2.0).floor(),
            TextAlign::Right => free,
        };
    let v = font.v_metrics(scale);
    let line_h = v.ascent - v.descent;
    let top = rect.y as f32 + ((rect.height as f32 - line_h) / 2.0).max(0.0).floor();
    let baseline = top + v.ascent;

    let color = caption.caption.color;
    for glyph in font.layout(&text, scale, point(x, baseline)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = bb.min.x + gx as i32;
            let py = bb.min.y + gy as i32;
            if px < rect.x as i32
                || py < rect.y as i32
                || px >= rect.right() as i32
                || py >= rect.bottom() as i32
                || px >= canvas.width() as i32
                || py >= canvas.height() as i32
            {
                return;
            }
            blend(canvas.get_pixel_mut(px as u32, py as u32), color, coverage);
        });
    }
}

/// Source-over blend of `color` at `coverage` onto `dst`.
fn blend(dst: &mut Rgba<u8>, color: Color, coverage: f32) {
    let sa = coverage.clamp(0.0, 1.0) * color.a as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let src = [color.r, color.g, color.b];
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
