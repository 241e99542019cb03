//! End-to-end batch runs over generated catalogs.
//!
//! A recording backend checks discovery, pairing, titles and counters
//! without touching pixels; the raster backend checks real output.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use coverstack::batch::{Batch, BatchError, CategoryStatus, SkipReason};
use coverstack::compose::{BackendError, CaptionLayer, CompositeSpec, Compositor, RasterCompositor};
use coverstack::config::Config;
use coverstack::{ContentRegion, Rect, Size};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn png(path: &Path, w: u32, h: u32, px: [u8; 4]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(w, h, Rgba(px)).save(path).unwrap();
}

fn jpg(path: &Path, w: u32, h: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(w, h, Rgb([200, 100, 50])).save(path).unwrap();
}

/// Root with:
/// - `snes`: alpha (titled in gamelist), beta (jpg marquee), gamma (no
///   marquee), delta (corrupt cover)
/// - `nes`: covers but no marquees
/// - `empty`: no covers
fn catalog() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    png(&root.join("template.png"), 638, 1012, [240, 240, 240, 255]);

    let snes = root.join("snes");
    png(&snes.join("covers/alpha.png"), 400, 600, [255, 0, 0, 255]);
    png(&snes.join("marquees/alpha.png"), 1000, 100, [0, 0, 255, 255]);
    png(&snes.join("covers/beta.png"), 300, 400, [0, 255, 0, 255]);
    jpg(&snes.join("marquees/beta.jpg"), 1000, 400);
    png(&snes.join("covers/gamma.png"), 200, 300, [9, 9, 9, 255]);
    fs::write(snes.join("covers/delta.png"), b"not an image").unwrap();
    png(&snes.join("marquees/delta.png"), 100, 10, [1, 1, 1, 255]);
    fs::write(snes.join("covers/readme.txt"), b"ignored").unwrap();
    fs::write(
        snes.join("gamelist.xml"),
        r#"<gameList>
             <game><name> Alpha   Quest </name><thumbnail>./media/ALPHA.png</thumbnail></game>
           </gameList>"#,
    )
    .unwrap();

    png(&root.join("nes/covers/x.png"), 10, 10, [0, 0, 0, 255]);
    fs::create_dir_all(root.join("empty")).unwrap();
    dir
}

#[derive(Default)]
struct Recording {
    bases: Mutex<Vec<CompositeSpec>>,
    captions: Mutex<Vec<(String, String)>>,
    fail_base_for: Option<&'static str>,
    fail_captions_for: Option<&'static str>,
}

impl Compositor for Recording {
    fn compose_base(&self, spec: &CompositeSpec) -> Result<RgbaImage, BackendError> {
        self.bases.lock().unwrap().push(spec.clone());
        let cover = &spec.layers[0].path;
        if self.fail_base_for.is_some_and(|stem| cover.file_stem() == Some(OsStr::new(stem))) {
            return Err(BackendError::Load {
                path: cover.clone(),
                source: image::ImageError::IoError(io::Error::other("decoder gave up")),
            });
        }
        Ok(RgbaImage::new(spec.frame.width, spec.frame.height))
    }

    fn overlay_captions(
        &self,
        _canvas: &mut RgbaImage,
        captions: &[CaptionLayer],
    ) -> Result<(), BackendError> {
        let title = captions[0].rendered_text();
        if self.fail_captions_for == Some(title.as_str()) {
            return Err(BackendError::FontUnavailable {
                path: PathBuf::from("font.ttf"),
            });
        }
        self.captions
            .lock()
            .unwrap()
            .push((title, captions[1].rendered_text()));
        Ok(())
    }
}

/// Raster base with the caption stage turned off.
struct Uncaptioned(RasterCompositor);

impl Compositor for Uncaptioned {
    fn compose_base(&self, spec: &CompositeSpec) -> Result<RgbaImage, BackendError> {
        self.0.compose_base(spec)
    }

    fn overlay_captions(&self, _: &mut RgbaImage, _: &[CaptionLayer]) -> Result<(), BackendError> {
        Ok(())
    }
}

// ── discovery and counting ──────────────────────────────────────────────

#[test]
fn counts_and_statuses() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording::default();
    let report = Batch::new(dir.path(), &config, &backend).jobs(2).run().unwrap();

    let summary: Vec<_> = report
        .categories
        .iter()
        .map(|c| (c.name.as_str(), c.status))
        .collect();
    assert_eq!(
        summary,
        [
            ("empty", CategoryStatus::NoCovers),
            ("nes", CategoryStatus::MissingMarquees),
            ("snes", CategoryStatus::Processed),
        ]
    );

    let snes = &report.categories[2].tally;
    assert_eq!(snes.processed, 2);
    assert_eq!(snes.skipped(), 2);
    assert_eq!(snes.skipped_for(SkipReason::NoMarquee), 1);
    assert_eq!(snes.skipped_for(SkipReason::UnreadableSource), 1);
    assert_eq!(report.total, *snes);
    assert!(!report.interrupted);

    assert!(dir.path().join("snes/output/alpha.png").is_file());
    assert!(dir.path().join("snes/output/beta.png").is_file());
    assert!(!dir.path().join("snes/output/gamma.png").exists());
    assert!(!dir.path().join("snes/output/delta.png").exists());
}

#[test]
fn missing_marquees_leaves_no_output() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording::default();
    let report = Batch::new(dir.path(), &config, &backend)
        .only(["nes"])
        .run()
        .unwrap();
    assert_eq!(report.categories.len(), 1);
    assert_eq!(report.categories[0].status, CategoryStatus::MissingMarquees);
    assert_eq!(report.total.processed, 0);
    assert_eq!(report.total.skipped(), 0);
    assert!(!dir.path().join("nes/output").exists());
    assert!(backend.bases.lock().unwrap().is_empty());
}

#[test]
fn titles_and_categories_reach_captions() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording::default();
    Batch::new(dir.path(), &config, &backend).run().unwrap();

    let mut captions = backend.captions.lock().unwrap().clone();
    captions.sort();
    assert_eq!(
        captions,
        [
            ("Alpha Quest".to_owned(), "SNES".to_owned()),
            ("beta".to_owned(), "SNES".to_owned()),
        ]
    );
}

#[test]
fn composite_spec_carries_plan() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording::default();
    Batch::new(dir.path(), &config, &backend).jobs(1).run().unwrap();

    let bases = backend.bases.lock().unwrap();
    let beta = bases
        .iter()
        .find(|s| s.layers[0].path.ends_with("beta.png"))
        .unwrap();
    assert_eq!(beta.base, dir.path().join("template.png"));
    assert!(beta.layers[1].path.ends_with("marquees/beta.jpg"));
    // Cover 300×400 → 534×713; marquee capped at 823 - 713 - 30 = 80.
    assert_eq!(beta.layers[0].layer.rect.size(), Size::new(534, 713));
    assert_eq!(beta.layers[1].layer.rect.size(), Size::new(200, 80));
}

#[test]
fn caption_failure_is_a_text_skip() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording {
        fail_captions_for: Some("beta"),
        ..Recording::default()
    };
    let report = Batch::new(dir.path(), &config, &backend).run().unwrap();
    assert_eq!(report.total.processed, 1);
    assert_eq!(report.total.skipped_for(SkipReason::TextError), 1);
    assert!(!dir.path().join("snes/output/beta.png").exists());
}

#[test]
fn composite_failure_is_a_composite_skip() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording {
        fail_base_for: Some("alpha"),
        ..Recording::default()
    };
    let report = Batch::new(dir.path(), &config, &backend).run().unwrap();
    assert_eq!(report.total.processed, 1);
    assert_eq!(report.total.skipped_for(SkipReason::CompositeError), 1);
    assert!(!dir.path().join("snes/output/alpha.png").exists());
    // A failed base never reaches the caption stage.
    let captions = backend.captions.lock().unwrap();
    assert!(captions.iter().all(|(title, _)| title != "Alpha Quest"));
}

#[test]
fn very_wide_marquee_still_gets_a_row() {
    init();
    let dir = catalog();
    png(&dir.path().join("snes/marquees/gamma.png"), 10_000, 5, [7, 7, 7, 255]);
    let config = Config::default();
    let backend = Recording::default();
    let report = Batch::new(dir.path(), &config, &backend).run().unwrap();
    assert_eq!(report.total.skipped_for(SkipReason::NoMarquee), 0);
    let bases = backend.bases.lock().unwrap();
    let gamma = bases
        .iter()
        .find(|s| s.layers[0].path.ends_with("gamma.png"))
        .unwrap();
    assert_eq!(gamma.layers[1].layer.rect.size(), Size::new(589, 1));
}

#[test]
fn infeasible_layout_is_skipped() {
    init();
    let dir = catalog();
    let mut config = Config::default();
    // Room for a 713px cover plus 17px: beta's marquee cannot shrink enough.
    config.layout.region = ContentRegion::new(52, 730);
    config.validate().unwrap();
    let backend = Recording::default();
    let report = Batch::new(dir.path(), &config, &backend).run().unwrap();
    let t = report.total;
    // alpha: 58 + 713 > 730, cap 730 - 713 - 30 < 0 as well.
    assert_eq!(t.skipped_for(SkipReason::LayoutInfeasible), 2);
    assert_eq!(t.processed, 0);
}

#[test]
fn cancelled_run_starts_nothing() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Recording::default();
    let cancel = AtomicBool::new(true);
    let report = Batch::new(dir.path(), &config, &backend)
        .cancel_flag(&cancel)
        .run()
        .unwrap();
    assert!(report.interrupted);
    assert_eq!(report.total.processed, 0);
    assert!(backend.bases.lock().unwrap().is_empty());
}

// ── preconditions ───────────────────────────────────────────────────────

#[test]
fn missing_template_is_fatal() {
    init();
    let dir = catalog();
    fs::remove_file(dir.path().join("template.png")).unwrap();
    let config = Config::default();
    let err = Batch::new(dir.path(), &config, &Recording::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, BatchError::Template { .. }));
}

#[test]
fn wrong_template_size_is_fatal() {
    init();
    let dir = catalog();
    png(&dir.path().join("template.png"), 100, 100, [0, 0, 0, 255]);
    let config = Config::default();
    let err = Batch::new(dir.path(), &config, &Recording::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, BatchError::TemplateSize { .. }));
}

#[test]
fn unknown_category_is_fatal() {
    init();
    let dir = catalog();
    let config = Config::default();
    let err = Batch::new(dir.path(), &config, &Recording::default())
        .only(["genesis"])
        .run()
        .unwrap_err();
    assert!(matches!(err, BatchError::UnknownCategory(name) if name == "genesis"));
}

// ── raster output ───────────────────────────────────────────────────────

#[test]
fn raster_runs_are_byte_identical() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = Uncaptioned(RasterCompositor::load(&config.font_path(dir.path())));
    let out = dir.path().join("snes/output/alpha.png");

    let first = Batch::new(dir.path(), &config, &backend).run().unwrap();
    let bytes = fs::read(&out).unwrap();
    let second = Batch::new(dir.path(), &config, &backend).run().unwrap();

    assert_eq!(first.total, second.total);
    assert_eq!(fs::read(&out).unwrap(), bytes);

    let card = image::open(&out).unwrap().to_rgba8();
    assert_eq!(card.dimensions(), (638, 1012));
    // alpha cover center (frame center, y 144 + 356) is red.
    assert_eq!(*card.get_pixel(319, 500), Rgba([255, 0, 0, 255]));
}

#[test]
fn raster_captioned_cards_are_reproducible() {
    init();
    let dir = catalog();
    fs::copy(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono-Bold.ttf"),
        dir.path().join("font.ttf"),
    )
    .unwrap();
    let config = Config::default();
    let backend = RasterCompositor::load(&config.font_path(dir.path()));
    assert!(backend.has_font());
    let out = dir.path().join("snes/output/alpha.png");

    let first = Batch::new(dir.path(), &config, &backend).run().unwrap();
    assert_eq!(first.total.processed, 2);
    let bytes = fs::read(&out).unwrap();
    let second = Batch::new(dir.path(), &config, &backend).run().unwrap();
    assert_eq!(first.total, second.total);
    assert_eq!(fs::read(&out).unwrap(), bytes);

    let card = image::open(&out).unwrap().to_rgba8();
    let inked = |r: Rect| {
        (r.y..r.bottom())
            .flat_map(|y| (r.x..r.right()).map(move |x| (x, y)))
            .filter(|&(x, y)| card.get_pixel(x, y)[0] < 128)
            .count()
    };
    let layout = &config.layout;
    assert!(inked(layout.title.rect) > 0, "title rendered");
    assert!(inked(layout.category.rect) > 0, "category rendered");
    // Between the two caption boxes the template stays untouched.
    let gap = Rect::new(24, 938, 590, 6);
    assert_eq!(inked(gap), 0);
}

#[test]
fn raster_without_font_skips_for_text() {
    init();
    let dir = catalog();
    let config = Config::default();
    let backend = RasterCompositor::load(&config.font_path(dir.path()));
    assert!(!backend.has_font());
    let report = Batch::new(dir.path(), &config, &backend).run().unwrap();
    assert_eq!(report.total.processed, 0);
    assert_eq!(report.total.skipped_for(SkipReason::TextError), 2);
    assert!(!dir.path().join("snes/output").exists());
}
