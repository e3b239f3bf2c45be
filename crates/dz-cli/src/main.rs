#![forbid(unsafe_code)]

//! Deep-zoom viewport engine CLI.
//!
//! # Commands
//!
//! - `resolve`: Turn tile-source references into normalized descriptors
//! - `layout`: Resolve references and lay them out as one composite
//! - `measure`: Compute display geometry for images inside a container
//! - `view`: Run a full viewer session and report its state
//! - `hit-test`: Classify a pointer position against a rectangle

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dz_core::{
    ImageSize, Point, Rect, SingleImageSource, Size, TileSource, ViewerConfig,
    parse_viewer_config_value,
};
use dz_layout::{composite_bounds, image_transforms, layout, layout_composite};
use dz_overlay::{HitArea, RecordingHost, hit};
use dz_session::{SessionStatus, ViewerEvent, ViewerSession};
use dz_tilesource::{Resolver, TileSourceReference, expand_references};
use dz_viewport::{BoxContainer, MeasureOptions, ViewportMargins, ViewportMeasures};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Deep-zoom viewport engine CLI.
#[derive(Debug, Parser)]
#[command(
    name = "dz-cli",
    version,
    about = "Resolve, lay out and measure deep-zoom tile sources",
    long_about = "Geometry engine of a deep-zoom image viewer.\n\n\
        Resolves IIIF info.json and legacy pyramid references, lays out\n\
        multi-image composites and computes viewport measures."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Viewer configuration file (JSON or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve tile-source references to descriptors.
    Resolve {
        /// URI, JSON text, or path to a JSON file
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Resolve references and print the composite layout.
    Layout {
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Compute measures for images inside a container.
    Measure {
        /// Container content box, e.g. 800x600
        #[arg(long, value_parser = parse_container)]
        container: Size,

        /// Image size, repeat for composites, e.g. 2000x1000
        #[arg(long = "image", required = true, value_parser = parse_image_size)]
        images: Vec<ImageSize>,

        /// Rotation in degrees
        #[arg(long, default_value_t = 0.0)]
        rotation: f64,

        /// Grow the container to the image height
        #[arg(long)]
        adapt: bool,

        /// Footer height in pixels
        #[arg(long)]
        footer: Option<f64>,
    },

    /// Resolve references, open them in a viewer session and print its state.
    View {
        #[arg(required = true)]
        references: Vec<String>,

        #[arg(long, value_parser = parse_container, default_value = "800x600")]
        container: Size,

        /// Sizes reported by the viewer, for references without known sizes
        #[arg(long = "image", value_parser = parse_image_size)]
        images: Vec<ImageSize>,

        #[arg(long)]
        rotation: Option<f64>,
    },

    /// Classify a pointer position against a rectangle.
    HitTest {
        /// Rectangle as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        rect: Rect,

        /// Pointer as x,y
        #[arg(long, value_parser = parse_point)]
        point: Point,

        /// Tolerance in viewport units (defaults to the configured one)
        #[arg(long)]
        tolerance: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeasureResult {
    measures: ViewportMeasures,
    fit_mode: &'static str,
    excess_height: f64,
    margins: ViewportMargins,
    home_zoom: f64,
    container_height: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewResult {
    status: SessionStatus,
    image_count: usize,
    measures: Option<ViewportMeasures>,
    home_zoom: f64,
    zoom: f64,
    center: Point,
    rotation: f64,
    visible: Rect,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HitTestResult {
    hit: Option<HitArea>,
    tolerance: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ViewerConfig::default(),
    };

    match cli.command {
        Command::Resolve { references } => cmd_resolve(&references, &config),
        Command::Layout { references } => cmd_layout(&references, &config),
        Command::Measure {
            container,
            images,
            rotation,
            adapt,
            footer,
        } => cmd_measure(container, &images, rotation, adapt, footer, &config),
        Command::View {
            references,
            container,
            images,
            rotation,
        } => cmd_view(&references, container, &images, rotation, config),
        Command::HitTest {
            rect,
            point,
            tolerance,
        } => cmd_hit_test(rect, point, tolerance.unwrap_or(config.hit_tolerance)),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn load_config(path: &Path) -> Result<ViewerConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let value: serde_json::Value = if path.extension().is_some_and(|ext| ext == "toml") {
        let parsed: toml::Value =
            toml::from_str(&source).with_context(|| format!("Invalid TOML: {}", path.display()))?;
        serde_json::to_value(parsed)?
    } else {
        serde_json::from_str(&source)
            .with_context(|| format!("Invalid JSON: {}", path.display()))?
    };

    let parsed = parse_viewer_config_value(&value);
    for warning in &parsed.warnings {
        warn!("Config warning: {warning}");
    }
    if !parsed.is_valid() {
        let details: Vec<String> = parsed
            .errors
            .iter()
            .map(|err| format!("{}: {} ({})", err.field, err.message, err.value))
            .collect();
        bail!("Invalid config {}: {}", path.display(), details.join("; "));
    }
    info!("Loaded config from {}", path.display());
    Ok(parsed.config)
}

/// A reference argument: inline JSON, a JSON file, or a URI/text.
fn load_references(args: &[String]) -> Result<Vec<TileSourceReference>> {
    let mut references = Vec::new();
    for arg in args {
        let trimmed = arg.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            let value: serde_json::Value =
                serde_json::from_str(arg).context("Invalid inline JSON reference")?;
            references.extend(expand_references(value));
        } else if Path::new(arg).is_file() {
            let source = std::fs::read_to_string(arg)
                .with_context(|| format!("Failed to read file: {arg}"))?;
            let value: serde_json::Value = serde_json::from_str(&source)
                .with_context(|| format!("Invalid JSON in {arg}"))?;
            references.extend(expand_references(value));
        } else {
            references.push(TileSourceReference::from(arg.as_str()));
        }
    }
    debug!("Loaded {} references", references.len());
    Ok(references)
}

fn resolve_references(args: &[String], config: &ViewerConfig) -> Result<Vec<TileSource>> {
    let references = load_references(args)?;
    let resolver = Resolver::from_config(config);
    resolver
        .resolve_all(&references)
        .context("Failed to resolve tile sources")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{output}");
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_resolve(args: &[String], config: &ViewerConfig) -> Result<()> {
    let descriptors = resolve_references(args, config)?;
    print_json(&descriptors)
}

fn cmd_layout(args: &[String], config: &ViewerConfig) -> Result<()> {
    let descriptors = resolve_references(args, config)?;
    let composite = layout_composite(descriptors).context("Failed to lay out tile sources")?;
    print_json(&composite)
}

fn cmd_measure(
    container: Size,
    images: &[ImageSize],
    rotation: f64,
    adapt: bool,
    footer: Option<f64>,
    config: &ViewerConfig,
) -> Result<()> {
    let options = MeasureOptions {
        adapt_container_height: adapt || config.adapt_container_height,
        footer_height: footer.unwrap_or(config.footer_height),
    };
    let mut container = BoxContainer::new(container.x, container.y);

    let mut measures = ViewportMeasures::compute(&container, images, options, rotation)
        .context("Failed to measure images")?;
    if options.adapt_container_height {
        measures = measures.resize_canvas(&mut container)?;
    }

    let sources = images
        .iter()
        .map(|&size| {
            TileSource::SingleImage(SingleImageSource {
                url: String::new(),
                size: Some(size),
            })
        })
        .collect();
    let slots = layout(sources)?;
    let world = composite_bounds(&image_transforms(&slots)?)
        .context("Composite has no images")?;

    print_json(&MeasureResult {
        fit_mode: measures.fit_mode.as_str(),
        excess_height: measures.calculate_excess_height(),
        margins: measures.viewport_margins(),
        home_zoom: measures.home_zoom(world.size()),
        container_height: measures.inner_container_size.y,
        measures,
    })
}

fn cmd_view(
    args: &[String],
    container: Size,
    images: &[ImageSize],
    rotation: Option<f64>,
    config: ViewerConfig,
) -> Result<()> {
    let references = load_references(args)?;
    let resolver = Resolver::from_config(&config);
    let mut session = ViewerSession::new(config);
    let mut container = BoxContainer::new(container.x, container.y);
    let mut host = RecordingHost::new();

    session
        .resolve_and_open(&resolver, &references)
        .context("Failed to open view")?;

    let image_sizes = if images.is_empty() {
        session
            .slots()
            .iter()
            .map(|slot| slot.tile_source.size())
            .collect::<Option<Vec<_>>>()
            .context("Image sizes unknown; pass them with --image")?
    } else {
        images.to_vec()
    };
    session
        .handle_event(ViewerEvent::Open { image_sizes }, &mut container, &mut host)
        .context("Failed to measure view")?;
    if let Some(degrees) = rotation {
        session.handle_event(ViewerEvent::Rotate { degrees }, &mut container, &mut host)?;
    }

    let state = session.controls.state();
    print_json(&ViewResult {
        status: session.status().clone(),
        image_count: session.slots().len(),
        measures: session.measures().copied(),
        home_zoom: session.controls.home_zoom(),
        zoom: state.zoom,
        center: state.center,
        rotation: state.rotation,
        visible: session.visible_bounds(),
    })
}

fn cmd_hit_test(rect: Rect, point: Point, tolerance: f64) -> Result<()> {
    print_json(&HitTestResult {
        hit: hit::hit_test(rect, point, tolerance),
        tolerance,
    })
}

// =============================================================================
// Argument parsers
// =============================================================================

fn parse_numbers(text: &str, separator: char, count: usize) -> Result<Vec<f64>, String> {
    let numbers = text
        .split(separator)
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|err| format!("invalid number `{part}`: {err}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if numbers.len() != count {
        return Err(format!(
            "expected {count} values separated by `{separator}`, got {}",
            numbers.len()
        ));
    }
    Ok(numbers)
}

fn parse_container(text: &str) -> Result<Size, String> {
    let numbers = parse_numbers(text, 'x', 2)?;
    let (width, height) = (numbers[0], numbers[1]);
    if !(width.is_finite() && width > 0.0 && height.is_finite() && height >= 0.0) {
        return Err(format!("container must have a positive width, got `{text}`"));
    }
    Ok(Size::new(width, height))
}

fn parse_image_size(text: &str) -> Result<ImageSize, String> {
    let (width, height) = text
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{text}`"))?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid width `{width}`: {err}"))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid height `{height}`: {err}"))?;
    ImageSize::checked(width, height).map_err(|err| err.to_string())
}

fn parse_rect(text: &str) -> Result<Rect, String> {
    let numbers = parse_numbers(text, ',', 4)?;
    Ok(Rect::new(numbers[0], numbers[1], numbers[2], numbers[3]))
}

fn parse_point(text: &str) -> Result<Point, String> {
    let numbers = parse_numbers(text, ',', 2)?;
    Ok(Point::new(numbers[0], numbers[1]))
}
