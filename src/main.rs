use clap::Parser;
use image::ImageReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tabletop_vision::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "tabletop-vision")]
#[command(about = "Locate color-coded objects on a work surface from a camera frame")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Write the annotated detection frame to this file
    #[arg(long, value_name = "FILE")]
    annotated: Option<PathBuf>,

    /// Print detections as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {:?}", path);
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::default(),
    };

    info!("Loading image: {:?}", args.image_path);
    let frame = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgb8();
    info!("Image loaded: {}x{}", frame.width(), frame.height());

    let mut pipeline = Pipeline::new(config)?;
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let result = pipeline.run(&frame)?;

    if let Some(path) = &args.annotated {
        result.debug_frame.save(path)?;
        info!("Annotated frame written to {:?}", path);
    }

    if args.json {
        println!("{}", result.to_json()?);
        return Ok(());
    }

    println!("\n=== Detection Results ===");
    println!("Total detections: {}", result.total());
    for class in &result.classes {
        println!("\n{} ({}):", class.class, class.objects.len());
        for object in &class.objects {
            let p = object.position;
            println!(
                "  x={:.2} y={:.2} z={:.2} cm, yaw={:.2} rad",
                p.x, p.y, p.z, object.orientation.yaw
            );
        }
    }

    Ok(())
}
