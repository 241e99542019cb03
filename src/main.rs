//! `coverstack` command line: batch card generation and layout preview.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, info, warn};

use coverstack::Size;
use coverstack::batch::{Batch, BatchReport, CategoryStatus};
use coverstack::compose::RasterCompositor;
use coverstack::config::Config;
use coverstack::plan_card;
use coverstack::svg::render_card_svg;

/// Config file picked up from the root directory when `--config` is absent.
const ROOT_CONFIG: &str = "coverstack.toml";

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "coverstack", version, about = "Stack game covers and marquees onto card templates")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate cards for every category under ROOT.
    Run(RunArgs),
    /// Print the layout for one pair of source sizes.
    Plan(PlanArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Directory holding the template and one subdirectory per category.
    root: PathBuf,

    /// TOML config (default: ROOT/coverstack.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads; 0 uses every core.
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Only process this category (repeatable).
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,
}

#[derive(Args)]
struct PlanArgs {
    /// Cover source size, e.g. 400x600.
    #[arg(long, value_parser = parse_size)]
    cover: Size,

    /// Marquee source size, e.g. 1000x100.
    #[arg(long, value_parser = parse_size)]
    marquee: Size,

    /// TOML config with a custom layout.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write an annotated SVG diagram here.
    #[arg(long)]
    svg: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Plan(args) => plan(args),
    };
    result.unwrap_or_else(|e| {
        error!("{e:#}");
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn parse_size(s: &str) -> std::result::Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let dim = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("'{v}' is not a positive integer"))
    };
    Ok(Size::new(dim(w)?, dim(h)?))
}

fn load_config(explicit: Option<&Path>, root: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(Config::load(path)?);
    }
    if let Some(path) = root.map(|r| r.join(ROOT_CONFIG)).filter(|p| p.is_file()) {
        info!("using {}", path.display());
        return Ok(Config::load(&path)?);
    }
    Ok(Config::default())
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref(), Some(&args.root))?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, letting running items finish");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let report = tokio::task::spawn_blocking(move || {
        let backend = RasterCompositor::load(&config.font_path(&args.root));
        Batch::new(&args.root, &config, &backend)
            .cancel_flag(&cancel)
            .jobs(args.jobs)
            .only(args.categories)
            .run()
    })
    .await
    .context("batch task failed")??;

    print_summary(&report);
    Ok(if report.interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::SUCCESS
    })
}

fn print_summary(report: &BatchReport) {
    for category in &report.categories {
        let status = match category.status {
            CategoryStatus::Processed => category.tally.to_string(),
            CategoryStatus::MissingMarquees => String::from("skipped, no marquees directory"),
            CategoryStatus::NoCovers => String::from("skipped, no covers directory"),
        };
        println!("{:<24} {status}", category.name);
    }
    println!("{:<24} {}", "total", report.total);
    if report.interrupted {
        println!("run interrupted");
    }
}

fn plan(args: PlanArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref(), None)?;
    let plan = plan_card(&config.layout, args.cover, args.marquee).with_context(|| {
        format!(
            "no layout for cover {} and marquee {}",
            args.cover, args.marquee
        )
    })?;

    let s = &plan.stack;
    println!("frame    {}", plan.frame);
    println!(
        "region   y {}..{} ({}px)",
        plan.region.y,
        plan.region.bottom(),
        plan.region.height
    );
    println!("padding  {}px", s.padding);
    println!(
        "marquee  {} at ({}, {}), center y {}",
        s.marquee, plan.marquee.x, plan.marquee.y, s.marquee_y_center
    );
    println!(
        "cover    {} at ({}, {}), center y {}",
        s.cover, plan.cover.x, plan.cover.y, s.cover_y_center
    );

    if let Some(path) = args.svg {
        fs::write(&path, render_card_svg(&plan))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_parse() {
        assert_eq!(parse_size("400x600"), Ok(Size::new(400, 600)));
        assert_eq!(parse_size("1000X100"), Ok(Size::new(1000, 100)));
        assert_eq!(parse_size("638×1012"), Ok(Size::new(638, 1012)));
        assert!(parse_size("400").is_err());
        assert!(parse_size("0x5").is_err());
        assert!(parse_size("ax5").is_err());
    }

    #[test]
    fn cli_parses_run() {
        let cli = Cli::try_parse_from([
            "coverstack", "-v", "run", "/data", "--jobs", "2", "--category", "snes", "--category", "nes",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.root, PathBuf::from("/data"));
        assert_eq!(args.jobs, 2);
        assert_eq!(args.categories, ["snes", "nes"]);
    }

    #[test]
    fn cli_parses_plan() {
        let cli =
            Cli::try_parse_from(["coverstack", "plan", "--cover", "400x600", "--marquee", "1000x400"])
                .unwrap();
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.cover, Size::new(400, 600));
        assert_eq!(args.svg, None);
    }

    #[test]
    fn root_config_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(None, Some(dir.path())).unwrap(), Config::default());
        fs::write(dir.path().join(ROOT_CONFIG), "[layout]\npadding_floor = 12\n").unwrap();
        assert_eq!(load_config(None, Some(dir.path())).unwrap().layout.padding_floor, 12);
    }
}
