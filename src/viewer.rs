//! The data viewer and the surface it is shown on.
//!
//! A [`DataViewer`] is built once from a data-type label and raw JSON and is
//! immutable afterwards. Everything interactive (showing the table, asking
//! for a destination, reporting results) goes through [`ViewerSurface`], so
//! the same viewer drives the terminal UI and the headless command line.

use std::path::{Path, PathBuf};

use tracing::{error, info};
use tracing_error::SpanTrace;

use crate::export::export_csv;
use crate::table::TableGrid;

pub trait ViewerSurface {
    /// Asks for a destination. `None` means the user cancelled.
    fn pick_save_file(&mut self, suggested: &Path) -> Option<PathBuf>;

    fn render_grid(&mut self, title: &str, grid: &TableGrid);

    fn notify(&mut self, title: &str, message: &str, is_error: bool);
}

#[derive(Debug)]
pub struct DataViewer {
    data_type: String,
    grid: TableGrid,
}

impl DataViewer {
    pub fn new(data_type: &str, json: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            grid: TableGrid::from_json(data_type, json),
        }
    }

    pub fn title(&self) -> String {
        format!("Data Viewer - {}", self.data_type)
    }

    pub fn grid(&self) -> &TableGrid {
        &self.grid
    }

    /// File name offered by the save prompt, e.g. `history.csv`.
    pub fn suggested_file_name(&self) -> PathBuf {
        let stem = self.data_type.trim().to_lowercase();
        if stem.is_empty() {
            PathBuf::from("data.csv")
        } else {
            PathBuf::from(format!("{stem}.csv"))
        }
    }

    pub fn show<S: ViewerSurface + ?Sized>(&self, surface: &mut S) {
        surface.render_grid(&self.title(), &self.grid);
    }

    /// The "Download CSV" action: pick a destination, export, report.
    ///
    /// Returns the written path, or `None` if the user cancelled or the
    /// export failed. Failures are reported through `notify` only.
    pub fn download_csv<S: ViewerSurface + ?Sized>(&self, surface: &mut S) -> Option<PathBuf> {
        let Some(destination) = surface.pick_save_file(&self.suggested_file_name()) else {
            info!("CSV download cancelled");
            return None;
        };

        match export_csv(&self.grid, &destination) {
            Ok(path) => {
                surface.notify(
                    "Success",
                    &format!("Data saved to {}", path.display()),
                    false,
                );
                Some(path)
            }
            Err(e) => {
                error!(
                    "CSV export to {} failed: {e}\n{}",
                    destination.display(),
                    SpanTrace::capture()
                );
                surface.notify("Error", &format!("Failed to save file: {e}"), true);
                None
            }
        }
    }
}
