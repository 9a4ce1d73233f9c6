/*!
 * Hotspot Connection Setter CLI
 * Scriptable access to Wi-Fi, crop, gallery and env file operations
 */

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use hotspot_setter::config::AppConfig;
use hotspot_setter::connectivity::has_internet;
use hotspot_setter::crop::{self, CropState, Direction};
use hotspot_setter::envfile::EnvFile;
use hotspot_setter::gallery;
use hotspot_setter::network::select_backend;

#[derive(Parser)]
#[command(name = "hotspot-setter")]
#[command(about = "Wi-Fi setup, image cropping and env file editing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for Wi-Fi networks
    Scan {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
        /// Also print the raw tool output
        #[arg(long)]
        raw: bool,
    },
    /// Connect to a Wi-Fi network
    Connect {
        ssid: String,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Crop a fixed-size window out of an image
    Crop(CropArgs),
    /// Manage saved crops
    Images {
        #[command(subcommand)]
        action: ImagesAction,
    },
    /// Edit the env file
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },
    /// Check internet connectivity
    Status,
}

#[derive(clap::Args)]
struct CropArgs {
    image: PathBuf,
    /// Crop width (defaults to config)
    #[arg(long)]
    width: Option<u32>,
    /// Crop height (defaults to config)
    #[arg(long)]
    height: Option<u32>,
    /// Start offset X instead of centering
    #[arg(short, long)]
    x: Option<u32>,
    /// Start offset Y instead of centering
    #[arg(short, long)]
    y: Option<u32>,
    /// Moves applied after positioning, in order
    #[arg(short = 'm', long = "move", value_enum)]
    moves: Vec<MoveArg>,
    /// Pixels per move (defaults to config)
    #[arg(long)]
    step: Option<u32>,
    /// Output directory (defaults to config)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Also write the outlined preview to this file
    #[arg(long)]
    preview: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MoveArg {
    Up,
    Down,
    Left,
    Right,
}

impl From<MoveArg> for Direction {
    fn from(arg: MoveArg) -> Self {
        match arg {
            MoveArg::Up => Direction::Up,
            MoveArg::Down => Direction::Down,
            MoveArg::Left => Direction::Left,
            MoveArg::Right => Direction::Right,
        }
    }
}

#[derive(Subcommand)]
enum ImagesAction {
    /// List saved crops
    List,
    /// Delete a saved crop by file name
    Delete { name: String },
}

#[derive(Subcommand)]
enum EnvAction {
    /// Print all entries
    List,
    /// Set a key, updating the first match or appending
    Set { key: String, value: String },
    /// Remove every entry with a key
    Unset { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("hotspot_setter={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)?;

    match cli.command {
        Commands::Scan { json, raw } => scan(&config, json, raw),
        Commands::Connect { ssid, password } => connect(&config, &ssid, password.as_deref()),
        Commands::Crop(args) => crop_image(&config, args),
        Commands::Images { action } => images(&config, action),
        Commands::Env { action } => env(&config, action),
        Commands::Status => status(&config).await,
    }
}

fn scan(config: &AppConfig, json: bool, raw: bool) -> Result<()> {
    let backend = select_backend(config.network.backend, std::env::consts::OS)?;
    let result = backend.scan();

    if json {
        println!("{}", serde_json::to_string_pretty(&result.records)?);
    } else if result.records.is_empty() {
        println!("No networks parsed.");
    } else {
        for record in &result.records {
            println!("{}", record);
        }
    }

    if raw || result.records.is_empty() {
        eprintln!("--- raw {} output ---\n{}", backend.tool(), result.raw_output);
    }
    Ok(())
}

fn connect(config: &AppConfig, ssid: &str, password: Option<&str>) -> Result<()> {
    let backend = select_backend(config.network.backend, std::env::consts::OS)?;
    println!("{}", backend.connect(ssid, password));
    Ok(())
}

fn crop_image(config: &AppConfig, args: CropArgs) -> Result<()> {
    let source = crop::load_image(&args.image)?;
    let requested_width = args.width.unwrap_or(config.crop.width);
    let requested_height = args.height.unwrap_or(config.crop.height);
    let step = args.step.unwrap_or(config.crop.step);

    let mut state = CropState::new(source.width(), source.height(), requested_width, requested_height);
    if state.is_reduced(requested_width, requested_height) {
        eprintln!(
            "Image is smaller than {}x{}. Using crop size {}x{} instead.",
            requested_width, requested_height, state.crop_width, state.crop_height
        );
    }
    if args.x.is_some() || args.y.is_some() {
        state.move_to(args.x.unwrap_or(state.x), args.y.unwrap_or(state.y));
    }
    for direction in args.moves {
        state.nudge(direction.into(), step);
    }

    if let Some(preview) = &args.preview {
        crop::save_preview(&source, &state, preview)?;
        println!("Saved preview to: {}", preview.display());
    }

    let output_dir = args.output.unwrap_or_else(|| config.storage.output_dir.clone());
    let path = crop::save_crop(&source, &state, &output_dir)?;
    println!("Saved cropped image to: {}", path.display());
    Ok(())
}

fn images(config: &AppConfig, action: ImagesAction) -> Result<()> {
    let folder = &config.storage.output_dir;

    match action {
        ImagesAction::List => {
            let saved = gallery::list_saved_images(folder)?;
            if saved.is_empty() {
                println!("No saved images found in {}", folder.display());
            }
            for image in saved {
                let dimensions = match gallery::image_dimensions(&image) {
                    Ok((w, h)) => format!("{}x{}", w, h),
                    Err(e) => format!("unreadable: {}", e),
                };
                let modified = image
                    .modified
                    .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", image.name, dimensions, modified);
            }
        }
        ImagesAction::Delete { name } => {
            let Some(image) = gallery::find_saved_image(folder, &name)? else {
                bail!("no saved image named {} in {}", name, folder.display());
            };
            gallery::delete_saved_image(&image)?;
            println!("Deleted {}", name);
        }
    }
    Ok(())
}

fn env(config: &AppConfig, action: EnvAction) -> Result<()> {
    let mut env = EnvFile::load(&config.storage.env_file)?;

    match action {
        EnvAction::List => {
            for entry in env.entries() {
                println!("{}={}", entry.key, entry.value);
            }
        }
        EnvAction::Set { key, value } => {
            if key.trim().is_empty() {
                bail!("key must not be empty");
            }
            env.set(&key, &value)?;
            env.save()
                .with_context(|| format!("could not save {}", env.path().display()))?;
            info!("Set {} in {}", key, env.path().display());
        }
        EnvAction::Unset { key } => {
            let removed = env.unset(&key);
            env.save()
                .with_context(|| format!("could not save {}", env.path().display()))?;
            println!("Removed {} entr{}", removed, if removed == 1 { "y" } else { "ies" });
        }
    }
    Ok(())
}

async fn status(config: &AppConfig) -> Result<()> {
    let probe = &config.connectivity;
    if has_internet(&probe.probe_address, probe.timeout()).await {
        println!("Internet: online");
    } else {
        println!("Internet: offline");
    }
    Ok(())
}
