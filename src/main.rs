use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod data;
mod domain;
mod inputter;
mod model;
mod record;
mod screens;
mod session;
mod ui;
mod upload;
mod view;

use controller::Controller;
use domain::{AdminConfig, AdminError};
use model::{Model, Status};
use session::{EnvProfileSource, Session};
use upload::{UploadFile, UploadOutcome, UploadPolicy};

#[derive(Parser)]
#[command(name = "stayadmin", version, about = "Back office console for rental data")]
struct Cli {
    /// Log file (stdout belongs to the ui)
    #[arg(long, default_value = "stayadmin.log")]
    log_file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse a record collection (csv, parquet or arrow)
    Browse {
        file: String,

        /// Built-in screen to use: properties, neighborhoods, blog-posts,
        /// inquiries. Without it the columns are derived from the file.
        #[arg(long)]
        screen: Option<String>,

        /// Rows per page
        #[arg(long, default_value_t = view::DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },
    /// Upload images into the media directory, one after another
    Upload {
        files: Vec<String>,

        #[arg(long, default_value = "media")]
        media_dir: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), AdminError> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;

    match cli.command {
        Command::Browse {
            file,
            screen,
            page_size,
        } => browse(&file, screen.as_deref(), page_size),
        Command::Upload { files, media_dir } => upload_files(&files, &media_dir),
    }
}

fn browse(file: &str, screen: Option<&str>, page_size: usize) -> Result<(), AdminError> {
    let path = expand_path(file)?;
    let collection = data::load_collection(path)?;
    let screen = screens::resolve(screen, &collection.field_names)?;

    let config = AdminConfig {
        page_size: page_size.max(1),
        ..AdminConfig::default()
    };
    let session = Session::initialize(&EnvProfileSource);

    let mut model = Model::new(config.clone(), screen, session);
    model.load_records(Some(collection.records));

    let controller = Controller::new(&config);
    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui::draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    ratatui::restore();
    Ok(())
}

/// Sequential upload with a local copy as the transport. Validation and
/// fire-and-continue semantics live in the upload module.
fn upload_files(files: &[String], media_dir: &str) -> Result<(), AdminError> {
    let media_dir = expand_path(media_dir)?;
    std::fs::create_dir_all(&media_dir)?;

    let mut queue = Vec::with_capacity(files.len());
    for file in files {
        let path = expand_path(file)?;
        let metadata = std::fs::metadata(&path)?;
        queue.push(UploadFile {
            name: path.to_string_lossy().into_owned(),
            size_bytes: metadata.len(),
        });
    }

    let report = upload::upload_all(
        &queue,
        &UploadPolicy::default(),
        |file| transfer(Path::new(&file.name), &media_dir),
        |pct| println!("{pct}%"),
    );

    for outcome in &report.outcomes {
        match outcome {
            UploadOutcome::Uploaded { name, url } => println!("ok      {name} -> {url}"),
            UploadOutcome::Rejected { name, reason } => println!("skipped {name}: {reason}"),
            UploadOutcome::Failed { name, reason } => println!("failed  {name}: {reason}"),
        }
    }
    info!(
        "Upload finished, {} stored, {} skipped or failed",
        report.urls().len(),
        report.failure_count()
    );
    Ok(())
}

fn transfer(source: &Path, media_dir: &Path) -> Result<String, String> {
    let file_name = source
        .file_name()
        .ok_or_else(|| "no file name".to_string())?;
    let destination = media_dir.join(file_name);
    std::fs::copy(source, &destination).map_err(|e| e.to_string())?;
    Ok(destination.to_string_lossy().into_owned())
}

fn expand_path(path: &str) -> Result<PathBuf, AdminError> {
    Ok(shellexpand::full(path)
        .map_err(|e| AdminError::LoadingFailed(e.to_string()))?
        .into_owned()
        .into())
}

fn init_tracing(log_file: &str) -> Result<(), AdminError> {
    let file = File::create(log_file)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
