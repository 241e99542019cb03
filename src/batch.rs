//! Batch runner: category discovery, cover/marquee pairing and the per-item
//! pipeline.
//!
//! ```text
//! <root>/
//!   template.png
//!   <category>/
//!     covers/      a.png b.jpg ...
//!     marquees/    a.png b.webp ...
//!     gamelist.xml (optional titles)
//!     output/      created on the first written card
//! ```
//!
//! Categories run one after another in name order. Items inside a category
//! run on a rayon pool; each one ends as [`ItemOutcome::Done`] or
//! [`ItemOutcome::Skipped`], and the outcomes fold into a [`RunTally`].
//! Only precondition failures ([`BatchError`]) abort a run.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, info, warn};
use rayon::prelude::*;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::compose::{CaptionLayer, CompositeSpec, Compositor};
use crate::config::Config;
use crate::constraint::Size;
use crate::metadata::Gamelist;
use crate::plan::plan_card;

/// File extensions accepted as cover or marquee images (case-insensitive).
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Failure that stops a run before any item is processed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot read template '{}': {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("template '{}' is {actual}, layout frame is {expected}", path.display())]
    TemplateSize {
        path: PathBuf,
        expected: Size,
        actual: Size,
    },
    #[error("cannot read root directory '{}': {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no category named '{0}'")]
    UnknownCategory(String),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure writing one card.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("unsupported output format for '{}'", path.display())]
    Format { path: PathBuf },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

/// Why an item produced no card.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No marquee shares the cover's file stem.
    NoMarquee,
    /// A source image's dimensions could not be read.
    UnreadableSource,
    /// The cover leaves no room for the marquee and the padding floor.
    LayoutInfeasible,
    /// The base composite failed.
    CompositeError,
    /// Caption rendering failed.
    TextError,
    /// The finished card could not be written.
    WriteError,
}

impl SkipReason {
    /// Every reason, in tally order.
    pub const ALL: [Self; 6] = [
        Self::NoMarquee,
        Self::UnreadableSource,
        Self::LayoutInfeasible,
        Self::CompositeError,
        Self::TextError,
        Self::WriteError,
    ];

    const fn index(self) -> usize {
        match self {
            Self::NoMarquee => 0,
            Self::UnreadableSource => 1,
            Self::LayoutInfeasible => 2,
            Self::CompositeError => 3,
            Self::TextError => 4,
            Self::WriteError => 5,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoMarquee => "no matching marquee",
            Self::UnreadableSource => "unreadable source image",
            Self::LayoutInfeasible => "layout infeasible",
            Self::CompositeError => "composite failed",
            Self::TextError => "caption rendering failed",
            Self::WriteError => "write failed",
        })
    }
}

/// One cover and what belongs with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    /// Cover image.
    pub cover: PathBuf,
    /// Marquee with the same stem, if any.
    pub marquee: Option<PathBuf>,
    /// Display title: metadata name, else the cover's file stem.
    pub title: String,
    /// Category label (the category directory name).
    pub category: String,
}

/// Terminal state of an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Card written to this path.
    Done(PathBuf),
    /// No card; counted and logged.
    Skipped(SkipReason),
}

/// Outcome counts, folded across items and categories.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Cards written.
    pub processed: usize,
    /// Skips per reason, indexed like [`SkipReason::ALL`].
    pub skips: [usize; 6],
    /// Items never started because the run was interrupted.
    pub not_started: usize,
}

impl RunTally {
    /// Tally of a single outcome.
    pub fn of(outcome: &ItemOutcome) -> Self {
        let mut tally = Self::default();
        match outcome {
            ItemOutcome::Done(_) => tally.processed = 1,
            ItemOutcome::Skipped(reason) => tally.skips[reason.index()] = 1,
        }
        tally
    }

    /// Tally of an item left unstarted.
    pub fn not_started() -> Self {
        Self {
            not_started: 1,
            ..Self::default()
        }
    }

    /// Sum of two tallies.
    pub fn merge(mut self, other: Self) -> Self {
        self.processed += other.processed;
        for (a, b) in self.skips.iter_mut().zip(other.skips) {
            *a += b;
        }
        self.not_started += other.not_started;
        self
    }

    /// Total skipped items.
    pub fn skipped(&self) -> usize {
        self.skips.iter().sum()
    }

    /// Skips for one reason.
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skips[reason.index()]
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed, {} skipped", self.processed, self.skipped())?;
        let mut first = true;
        for reason in SkipReason::ALL {
            let n = self.skipped_for(reason);
            if n > 0 {
                f.write_str(if first { " (" } else { ", " })?;
                write!(f, "{reason}: {n}")?;
                first = false;
            }
        }
        if !first {
            f.write_str(")")?;
        }
        if self.not_started > 0 {
            write!(f, ", {} not started", self.not_started)?;
        }
        Ok(())
    }
}

/// How a category was handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CategoryStatus {
    /// Items were discovered and run.
    Processed,
    /// `covers/` exists but `marquees/` does not; nothing was attempted.
    MissingMarquees,
    /// No `covers/` directory.
    NoCovers,
}

/// Result of one category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryReport {
    /// Directory name.
    pub name: String,
    pub status: CategoryStatus,
    pub tally: RunTally,
}

/// Result of a whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Categories in processing order.
    pub categories: Vec<CategoryReport>,
    /// Sum over all categories.
    pub total: RunTally,
    /// Whether the cancel flag stopped the run early.
    pub interrupted: bool,
}

/// A configured batch run over one root directory.
///
/// ```no_run
/// use std::path::Path;
/// use coverstack::batch::Batch;
/// use coverstack::compose::RasterCompositor;
/// use coverstack::config::Config;
///
/// let config = Config::default();
/// let root = Path::new("/data/catalog");
/// let backend = RasterCompositor::load(&config.font_path(root));
/// let report = Batch::new(root, &config, &backend).jobs(4).run()?;
/// println!("{}", report.total);
/// # Ok::<(), coverstack::batch::BatchError>(())
/// ```
pub struct Batch<'a> {
    root: PathBuf,
    config: &'a Config,
    backend: &'a dyn Compositor,
    cancel: Option<&'a AtomicBool>,
    jobs: usize,
    only: Vec<String>,
}

impl<'a> Batch<'a> {
    pub fn new(root: &Path, config: &'a Config, backend: &'a dyn Compositor) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            backend,
            cancel: None,
            jobs: 0,
            only: Vec::new(),
        }
    }

    /// Stop accepting items once `flag` is set.
    pub fn cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Worker count; `0` uses the available parallelism.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Restrict the run to the named categories.
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = names.into_iter().map(Into::into).collect();
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Check preconditions, then process every selected category.
    pub fn run(&self) -> Result<BatchReport, BatchError> {
        self.check_template()?;

        let mut categories = discover_categories(&self.root).map_err(|source| BatchError::Root {
            path: self.root.clone(),
            source,
        })?;
        if !self.only.is_empty() {
            if let Some(missing) = self
                .only
                .iter()
                .find(|name| !categories.iter().any(|dir| dir_name(dir) == name.as_str()))
            {
                return Err(BatchError::UnknownCategory(missing.clone()));
            }
            categories.retain(|dir| self.only.iter().any(|name| dir_name(dir) == name.as_str()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("coverstack-{i}"))
            .build()?;
        info!(
            "{} categor{} under {}, {} worker(s)",
            categories.len(),
            if categories.len() == 1 { "y" } else { "ies" },
            self.root.display(),
            pool.current_num_threads()
        );

        let mut report = BatchReport::default();
        for dir in &categories {
            if self.cancelled() {
                break;
            }
            let category = pool.install(|| self.run_category(dir));
            report.total = report.total.merge(category.tally);
            report.categories.push(category);
        }
        report.interrupted = self.cancelled();
        Ok(report)
    }

    fn check_template(&self) -> Result<(), BatchError> {
        let path = self.config.template_path(&self.root);
        let (w, h) = image::image_dimensions(&path).map_err(|source| BatchError::Template {
            path: path.clone(),
            source,
        })?;
        let actual = Size::new(w, h);
        let expected = self.config.layout.frame;
        if actual != expected {
            return Err(BatchError::TemplateSize {
                path,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Discover, pair and process the items of one category directory.
    pub fn run_category(&self, dir: &Path) -> CategoryReport {
        let name = dir_name(dir).to_owned();
        let covers_dir = dir.join(&self.config.covers_dir);
        let marquees_dir = dir.join(&self.config.marquees_dir);

        if !covers_dir.is_dir() {
            debug!("{name}: no {} directory", self.config.covers_dir);
            return CategoryReport {
                name,
                status: CategoryStatus::NoCovers,
                tally: RunTally::default(),
            };
        }
        if !marquees_dir.is_dir() {
            warn!(
                "{name}: {} present but {} missing, skipping category",
                self.config.covers_dir, self.config.marquees_dir
            );
            return CategoryReport {
                name,
                status: CategoryStatus::MissingMarquees,
                tally: RunTally::default(),
            };
        }

        let gamelist = Gamelist::load(&dir.join(&self.config.metadata_file));
        let items = pair_items(
            &name,
            &list_images(&covers_dir),
            &list_images(&marquees_dir),
            &gamelist,
        );
        info!("{name}: {} cover(s)", items.len());

        let out_dir = dir.join(&self.config.output_dir);
        let tally = items
            .par_iter()
            .map(|item| {
                if self.cancelled() {
                    return RunTally::not_started();
                }
                RunTally::of(&self.process(item, &out_dir))
            })
            .reduce(RunTally::default, RunTally::merge);

        info!("{name}: {tally}");
        CategoryReport {
            name,
            status: CategoryStatus::Processed,
            tally,
        }
    }

    /// Run one item through layout, compositing and output.
    pub fn process(&self, item: &Item, out_dir: &Path) -> ItemOutcome {
        let file_name = item.cover.file_name().unwrap_or_default().to_os_string();
        let label = format!("{}/{}", item.category, file_name.to_string_lossy());
        let skip = |reason: SkipReason, detail: &dyn fmt::Display| {
            warn!("{label}: skipped, {reason}: {detail}");
            ItemOutcome::Skipped(reason)
        };

        let Some(marquee) = &item.marquee else {
            return skip(SkipReason::NoMarquee, &"no marquee with the same stem");
        };
        let cover_size = match read_size(&item.cover) {
            Ok(size) => size,
            Err(e) => return skip(SkipReason::UnreadableSource, &e),
        };
        let marquee_size = match read_size(marquee) {
            Ok(size) => size,
            Err(e) => return skip(SkipReason::UnreadableSource, &e),
        };

        let layout = &self.config.layout;
        let plan = match plan_card(layout, cover_size, marquee_size) {
            Ok(plan) => plan,
            Err(e) => return skip(SkipReason::LayoutInfeasible, &e),
        };
        debug!(
            "{label}: cover {} at y {}, marquee {} at y {}",
            plan.stack.cover, plan.stack.cover_y_center, plan.stack.marquee, plan.stack.marquee_y_center
        );

        let spec = CompositeSpec::for_card(
            &self.config.template_path(&self.root),
            layout,
            &plan,
            &item.cover,
            marquee,
        );
        let mut card = match self.backend.compose_base(&spec) {
            Ok(card) => card,
            Err(e) => return skip(SkipReason::CompositeError, &e),
        };

        let captions = [
            CaptionLayer {
                text: item.title.clone(),
                caption: plan.title,
            },
            CaptionLayer {
                text: item.category.clone(),
                caption: plan.category,
            },
        ];
        if let Err(e) = self.backend.overlay_captions(&mut card, &captions) {
            return skip(SkipReason::TextError, &e);
        }

        let dest = out_dir.join(&file_name);
        if let Err(e) = fs::create_dir_all(out_dir)
            .map_err(OutputError::from)
            .and_then(|()| write_atomic(&card, &dest))
        {
            return skip(SkipReason::WriteError, &e);
        }
        info!("{label}: \"{}\" done", item.title);
        ItemOutcome::Done(dest)
    }
}

fn read_size(path: &Path) -> Result<Size, image::ImageError> {
    image::image_dimensions(path).map(|(w, h)| Size::new(w, h))
}

fn dir_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Whether `path` has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Subdirectories of `root`, sorted by name.
pub fn discover_categories(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Image files directly inside `dir`, sorted. An unreadable directory is
/// logged and treated as empty.
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot list {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    files.sort();
    files
}

/// Build items for `covers`, matching marquees by file stem.
///
/// `marquees` must be sorted; when several share a stem the first wins.
pub fn pair_items(
    category: &str,
    covers: &[PathBuf],
    marquees: &[PathBuf],
    gamelist: &Gamelist,
) -> Vec<Item> {
    let mut by_stem: HashMap<OsString, &PathBuf> = HashMap::with_capacity(marquees.len());
    for path in marquees {
        if let Some(stem) = path.file_stem() {
            by_stem.entry(stem.to_os_string()).or_insert(path);
        }
    }

    covers
        .iter()
        .map(|cover| {
            let stem = cover.file_stem().unwrap_or_default();
            let file_name = cover.file_name().unwrap_or_default().to_string_lossy();
            let title = gamelist
                .title_for(&file_name)
                .map(str::to_owned)
                .unwrap_or_else(|| stem.to_string_lossy().into_owned());
            Item {
                cover: cover.clone(),
                marquee: by_stem.get(stem).map(|p| (*p).clone()),
                title,
                category: category.to_owned(),
            }
        })
        .collect()
}

/// Encode `image` next to `dest` and rename it into place.
///
/// The format follows the extension; JPEG drops the alpha channel.
pub fn write_atomic(image: &RgbaImage, dest: &Path) -> Result<(), OutputError> {
    let format = ImageFormat::from_path(dest).map_err(|_| OutputError::Format {
        path: dest.to_path_buf(),
    })?;
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
                .to_rgb8()
                .write_to(&mut out, format)?,
            _ => image.write_to(&mut out, format)?,
        }
        out.flush()?;
    }
    tmp.persist(dest)?;
    Ok(())
}
