use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use mapbook::{BookletConfig, GeoPoint, ImagePolicy, MapView};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mapbook", version, about = "Capture a city map and export it as a PDF booklet")]
struct Cli {
    /// JSON configuration file; unset fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the map and write the booklet
    Export(ExportArgs),
    /// List the configured markers
    Markers,
}

#[derive(Args)]
struct ExportArgs {
    /// Directory the booklet is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Do not fetch tiles or pictures over the network
    #[arg(long)]
    offline: bool,

    /// Map center as LAT,LON
    #[arg(long)]
    center: Option<GeoPoint>,

    #[arg(long)]
    zoom: Option<u8>,

    /// Map region width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Map region height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Open the label of marker N (zero-based) before capturing
    #[arg(long, value_name = "N")]
    open_popup: Option<usize>,

    /// Fail instead of omitting pictures that cannot be loaded
    #[arg(long)]
    strict_images: bool,

    /// Capture without cross-origin safety (foreign resources then fail the capture)
    #[arg(long)]
    no_cors: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BookletConfig> {
    match path {
        Some(p) => BookletConfig::from_json_file(p)
            .with_context(|| format!("loading configuration from {}", p.display())),
        None => Ok(BookletConfig::default()),
    }
}

fn export(mut config: BookletConfig, args: ExportArgs) -> anyhow::Result<()> {
    config.offline |= args.offline;
    if let Some(center) = args.center {
        config.map.center = center;
    }
    if let Some(zoom) = args.zoom {
        config.map.zoom = zoom;
    }
    if let Some(w) = args.width {
        config.map.viewport.width = w;
    }
    if let Some(h) = args.height {
        config.map.viewport.height = h;
    }
    if args.strict_images {
        config.export.image_policy = ImagePolicy::Fail;
    }
    if args.no_cors {
        config.export.capture.cross_origin_safe = false;
    }

    let mut view = MapView::new(config.map.clone()).context("invalid map configuration")?;
    view.mount();
    if let Some(n) = args.open_popup {
        if view.click_marker(n).is_none() {
            bail!("no marker with index {}", n);
        }
    }

    let exporter = mapbook::new_exporter(&config)?;
    let doc = exporter
        .export(view.root().as_ref())
        .context("export failed")?;
    let path = doc.save_to(&args.out_dir)?;

    println!("{} ({} pages, sha256 {})", path.display(), doc.page_count, doc.sha256_hex());
    for url in &doc.omitted_images {
        println!("  omitted picture: {}", url);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Export(args) => export(config, args),
        Command::Markers => {
            for (i, m) in config.map.markers.iter().enumerate() {
                println!("{}: {} ({}, {})", i, m.label, m.position.lat, m.position.lon);
            }
            Ok(())
        }
    }
}
