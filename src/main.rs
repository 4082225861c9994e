// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::ImageFormat;
use log::info;
use std::path::PathBuf;

use crate::acquire::permissions::{Capability, CapabilityBroker, DesktopBroker};
use crate::api::client::{PredictionClient, DEFAULT_SERVER_URL};
use crate::api::connector::Predictor;

mod acquire;
mod api;
mod gui;
mod session;

#[derive(Parser)]
#[command(name = "helmetsnap")]
#[command(about = "Helmet detection client with camera capture and gallery upload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image file and save the annotated result
    Predict {
        /// Image file to submit
        image: PathBuf,

        /// Detection server URL (default: hosted model endpoint)
        #[arg(long)]
        server_url: Option<String>,

        /// Where to write the annotated image
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Capture a photo, then upload it
    Capture {
        /// Detection server URL (default: hosted model endpoint)
        #[arg(long)]
        server_url: Option<String>,

        /// Where to write the annotated image
        #[arg(long)]
        save: Option<PathBuf>,

        /// Skip the upload - just capture and keep the photo
        #[arg(long)]
        no_upload: bool,
    },
    /// Check that the detection server is reachable
    CheckServer {
        /// Detection server URL (default: hosted model endpoint)
        #[arg(long)]
        server_url: Option<String>,
    },
    /// Run graphical user interface
    Gui {
        /// Detection server URL (default: hosted model endpoint)
        #[arg(long)]
        server_url: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            image,
            server_url,
            save,
        } => run_predict_cli(image, server_url, save),
        Commands::Capture {
            server_url,
            save,
            no_upload,
        } => run_capture_cli(server_url, save, no_upload),
        Commands::CheckServer { server_url } => check_server(server_url),
        Commands::Gui { server_url } => gui::run_gui(get_server_url(server_url)),
    }
}

fn get_server_url(url_arg: Option<String>) -> String {
    url_arg.unwrap_or_else(|| {
        std::env::var("HELMET_API_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
    })
}

fn run_predict_cli(
    image: PathBuf,
    server_url: Option<String>,
    save: Option<PathBuf>,
) -> Result<()> {
    let url = get_server_url(server_url);
    info!("Submitting {} to {}", image.display(), url);

    let client = PredictionClient::new(&url)?;
    submit_and_save(&client, &image, save)
}

fn run_capture_cli(
    server_url: Option<String>,
    save: Option<PathBuf>,
    no_upload: bool,
) -> Result<()> {
    info!("Starting headless capture mode");
    DesktopBroker.ensure(Capability::Camera)?;

    let photo = acquire::camera::capture_photo()?;
    println!("Photo captured: {}", photo.path().display());

    if no_upload {
        return Ok(());
    }

    let url = get_server_url(server_url);
    let client = PredictionClient::new(&url)?;
    submit_and_save(&client, photo.path(), save)
}

fn submit_and_save(
    client: &PredictionClient,
    image: &std::path::Path,
    save: Option<PathBuf>,
) -> Result<()> {
    let annotated = client.predict_file(image).context("prediction failed")?;
    let out = save.unwrap_or_else(default_output_path);
    annotated
        .save_with_format(&out, ImageFormat::Png)
        .with_context(|| format!("failed to save annotated image to {}", out.display()))?;
    println!("Annotated image saved to: {}", out.display());
    Ok(())
}

fn default_output_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("detection_{}.png", stamp))
}

fn check_server(server_url: Option<String>) -> Result<()> {
    let url = get_server_url(server_url);
    info!("Checking detection server at {}...", url);

    let client = PredictionClient::new(&url)?;
    match client.check_server() {
        Ok(message) => {
            println!("Server is running at {}", url);
            println!("  {}", message);
        }
        Err(e) => {
            println!("Could not reach detection server at {}", url);
            println!("  Error: {}", e);
        }
    }
    Ok(())
}
