use std::fs::File;
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod columns;
mod controller;
mod domain;
mod export;
mod inputter;
mod model;
mod table;
mod ui;
mod viewer;

use cli::{Args, CliSurface, load_input};
use controller::Controller;
use domain::{DVConfig, DVError};
use model::{Model, Status};
use ui::TableUI;
use viewer::DataViewer;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = args.config();

    if let Err(e) = init_logging(&config, args.headless()) {
        eprintln!("Error: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = if args.headless() {
        run_headless(&args, &config)
    } else {
        run_interactive(&args, &config)
    };

    match result {
        Err(e) => {
            error!("{e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(false) => ExitCode::FAILURE,
        Ok(true) => ExitCode::SUCCESS,
    }
}

/// Headless runs log to stderr, the terminal UI logs to a file.
fn init_logging(config: &DVConfig, headless: bool) -> Result<(), DVError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    if headless {
        registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .init();
    } else {
        let path = config
            .log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("dv.log"));
        let file = File::create(&path)?;
        registry
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .init();
    }
    Ok(())
}

fn run_headless(args: &Args, config: &DVConfig) -> Result<bool, DVError> {
    let viewer = DataViewer::new(&config.data_type, &load_input(&args.input)?);
    let stdout = args.print.then(io::stdout);
    let mut surface = CliSurface::new(args.output.clone(), stdout);

    viewer.show(&mut surface);
    if args.output.is_some() {
        viewer.download_csv(&mut surface);
    }
    Ok(!surface.failed)
}

fn run_interactive(args: &Args, config: &DVConfig) -> Result<bool, DVError> {
    let viewer = DataViewer::new(&config.data_type, &load_input(&args.input)?);
    info!("Starting {}", viewer.title());

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, config, viewer);
    ratatui::restore();
    result
}

fn run(terminal: &mut DefaultTerminal, config: &DVConfig, viewer: DataViewer) -> Result<bool, DVError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, viewer, size.width as usize, size.height as usize);
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    Ok(true)
}
