use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};

use crate::domain::{DVConfig, DVError};
use crate::export::write_csv;
use crate::table::TableGrid;
use crate::viewer::ViewerSurface;

/// View chat history, member or keyword exports as a table and download them as CSV.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// JSON file to show, "-" reads from stdin
    pub input: String,

    /// History, Members, Keywords or any other label
    #[arg(short = 't', long, default_value = "History")]
    pub data_type: String,

    /// Export the table as CSV to this path and exit
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the table as CSV to stdout and exit
    #[arg(short, long)]
    pub print: bool,

    /// Log file used while the terminal UI is running
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Input poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Width cap of a rendered column
    #[arg(long, default_value_t = 40)]
    pub max_column_width: usize,
}

impl Args {
    pub fn headless(&self) -> bool {
        self.output.is_some() || self.print
    }

    pub fn config(&self) -> DVConfig {
        let config = DVConfig::default()
            .data_type(self.data_type.clone())
            .event_poll_time(self.poll_ms)
            .max_column_width(self.max_column_width);
        match &self.log_file {
            Some(path) => config.log_file(path.clone()),
            None => config,
        }
    }
}

/// Reads the raw JSON text. `-` means stdin; paths get `~` and `$VAR` expanded.
pub fn load_input(input: &str) -> Result<String, DVError> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    let path = shellexpand::full(input).map_err(|e| DVError::PathExpansion(e.to_string()))?;
    let path = PathBuf::from(path.into_owned());
    info!("Reading {}", path.display());
    fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DVError::FileNotFound,
        ErrorKind::PermissionDenied => DVError::PermissionDenied,
        _ => DVError::IoError(e),
    })
}

/// Surface for runs without a terminal UI.
///
/// The "picked" file is the `--output` argument and notifications go to the
/// log, which headless runs write to stderr.
pub struct CliSurface<W: Write> {
    output: Option<PathBuf>,
    print: Option<W>,
    pub failed: bool,
}

impl<W: Write> CliSurface<W> {
    pub fn new(output: Option<PathBuf>, print: Option<W>) -> Self {
        Self {
            output,
            print,
            failed: false,
        }
    }
}

impl<W: Write> ViewerSurface for CliSurface<W> {
    fn pick_save_file(&mut self, _suggested: &Path) -> Option<PathBuf> {
        self.output.take()
    }

    fn render_grid(&mut self, title: &str, grid: &TableGrid) {
        info!("{title}: {} rows, {} columns", grid.nrows(), grid.ncolumns());
        if let Some(out) = self.print.as_mut()
            && let Err(e) = write_csv(grid, out).and_then(|_| out.flush())
        {
            self.notify("Error", &format!("Failed to print table: {e}"), true);
        }
    }

    fn notify(&mut self, title: &str, message: &str, is_error: bool) {
        if is_error {
            self.failed = true;
            error!("{title}: {message}");
        } else {
            info!("{title}: {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::DataViewer;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parses_headless_arguments() {
        let args = Args::try_parse_from(["dv", "data.json", "-t", "members", "-o", "out"]).unwrap();
        assert_eq!(args.input, "data.json");
        assert_eq!(args.data_type, "members");
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.headless());

        let config = args.config();
        assert_eq!(config.data_type, "members");
        assert_eq!(config.event_poll_time, 100);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn interactive_defaults() {
        let args = Args::try_parse_from(["dv", "-", "--log-file", "/tmp/x.log", "--poll-ms", "50"])
            .unwrap();
        assert!(!args.headless());
        assert_eq!(args.data_type, "History");
        let config = args.config();
        assert_eq!(config.event_poll_time, 50);
        assert_eq!(config.max_column_width, 40);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/x.log")));
    }

    #[test]
    fn input_is_required() {
        assert!(Args::try_parse_from(["dv"]).is_err());
    }

    #[test]
    fn missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let err = load_input(&path.to_string_lossy()).unwrap_err();
        assert!(matches!(err, DVError::FileNotFound));
    }

    #[test]
    fn reads_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.json");
        fs::write(&path, include_str!("../tests/fixtures/keywords.json")).unwrap();
        let text = load_input(&path.to_string_lossy()).unwrap();
        assert!(text.contains("\"keyword\": \"halo\""));
    }

    #[test]
    fn print_writes_csv_document() {
        let viewer = DataViewer::new("Keywords", include_str!("../tests/fixtures/keywords.json"));
        let mut surface = CliSurface::new(None, Some(Vec::new()));
        viewer.show(&mut surface);
        let printed = String::from_utf8(surface.print.take().unwrap()).unwrap();
        assert!(printed.starts_with("keyword,response,usage_count,created_at\n"));
        assert_eq!(printed.lines().count(), 3);
        assert!(!surface.failed);
    }

    #[test]
    fn headless_export_and_failure_flag() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = DataViewer::new("History", include_str!("../tests/fixtures/history.json"));

        let mut ok = CliSurface::<Vec<u8>>::new(Some(dir.path().join("out")), None);
        assert_eq!(viewer.download_csv(&mut ok), Some(dir.path().join("out.csv")));
        assert!(!ok.failed);

        let mut bad = CliSurface::<Vec<u8>>::new(Some(dir.path().join("a").join("b")), None);
        assert_eq!(viewer.download_csv(&mut bad), None);
        assert!(bad.failed);
    }

    #[test]
    fn notifications_are_logged_once() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut surface = CliSurface::<Vec<u8>>::new(None, None);
        tracing::subscriber::with_default(subscriber, || {
            surface.notify("Error", "Failed to save file: disk full", true);
        });

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logged.matches("Failed to save file: disk full").count(), 1);
        assert!(logged.contains("ERROR"));
        assert!(surface.failed);
    }
}
