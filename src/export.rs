use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::DVError;
use crate::table::{TableGrid, cell_text};

// Other_Symbol plus emoticons, misc symbols and pictographs, transport and map,
// supplemental symbols and pictographs, misc symbols and dingbats.
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\p{So}",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{2600}-\x{26FF}",
        r"\x{2700}-\x{27BF}",
        r"]+"
    ))
    .expect("emoji pattern is valid")
});

pub fn strip_emoji(text: &str) -> String {
    EMOJI.replace_all(text, "").into_owned()
}

/// Strips emoji, doubles quotes and wraps the field if it holds a comma or quote.
pub fn escape_field(text: &str) -> String {
    let out = strip_emoji(text).replace('"', "\"\"");
    if out.contains(',') || out.contains('"') {
        format!("\"{out}\"")
    } else {
        out
    }
}

fn csv_line(cells: &[Value]) -> String {
    cells
        .iter()
        .map(|cell| escape_field(&cell_text(cell)))
        .collect::<Vec<String>>()
        .join(",")
}

/// Row `row` of `grid` as a CSV line, without terminator.
pub fn csv_row(grid: &TableGrid, row: usize) -> String {
    grid.rows().get(row).map(|cells| csv_line(cells)).unwrap_or_default()
}

pub fn write_csv<W: Write>(grid: &TableGrid, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", grid.columns().as_slice().join(","))?;
    for cells in grid.rows() {
        writeln!(out, "{}", csv_line(cells))?;
    }
    Ok(())
}

/// Appends `.csv` unless the file name already ends with it (any case).
///
/// Trailing separators are dropped, so `out/` becomes `out.csv`.
pub fn with_csv_extension(path: &Path) -> PathBuf {
    let Some(name) = path.file_name() else {
        let mut name = OsString::from(path.as_os_str());
        name.push(".csv");
        return PathBuf::from(name);
    };
    if name.to_string_lossy().to_lowercase().ends_with(".csv") {
        return path.with_file_name(name);
    }
    let mut name = name.to_os_string();
    name.push(".csv");
    path.with_file_name(name)
}

/// Writes `grid` to `destination`, replacing any existing file.
///
/// Returns the path that was actually written.
#[instrument(skip(grid), fields(rows = grid.nrows()))]
pub fn export_csv(grid: &TableGrid, destination: &Path) -> Result<PathBuf, DVError> {
    let path = with_csv_extension(destination);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_csv(grid, &mut writer)?;
    writer.flush()?;
    info!("Exported {} rows to {}", grid.nrows(), path.display());
    Ok(path)
}
