//! MET `.stat` file reading
//!
//! Stat files are whitespace-delimited text with a header line naming the
//! columns (`VERSION MODEL DESC FCST_LEAD ... LINE_TYPE` followed by the
//! line-type columns). Files are loaded once and queried per forecast hour.

use crate::error::{PlotError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One parsed stat file
#[derive(Debug, Clone)]
pub struct StatFile {
    pub path: PathBuf,
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl StatFile {
    /// Parse stat file text
    ///
    /// Rows whose field count differs from the header are dropped; the number
    /// dropped is reported as a warning.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header: Vec<String> = match lines.next() {
            Some(line) => line.split_whitespace().map(|s| s.to_uppercase()).collect(),
            None => {
                return Ok(StatFile {
                    path,
                    columns: HashMap::new(),
                    rows: Vec::new(),
                })
            }
        };
        if header.first().map(String::as_str) != Some("VERSION") {
            return Err(PlotError::StatFile {
                path: path.display().to_string(),
                message: "missing header line starting with VERSION".to_string(),
            });
        }

        let columns: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if fields.len() == header.len() {
                rows.push(fields);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            log::warn!(
                "Skipped {} malformed row(s) in {} (expected {} fields)",
                skipped,
                path.display(),
                header.len()
            );
        }

        Ok(StatFile {
            path,
            columns,
            rows,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Value of a column in a row (None if the column is absent)
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = *self.columns.get(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }
}

/// All stat files of a run
#[derive(Debug, Clone, Default)]
pub struct StatStore {
    pub files: Vec<StatFile>,
}

impl StatStore {
    /// Load every `.stat` file in `dir` whose name contains `grid`
    ///
    /// An empty grid reads every stat file. Files that fail to parse are
    /// skipped with a warning; an unreadable directory is an error.
    pub fn load_dir(dir: &Path, grid: &str) -> Result<Self> {
        let grid = grid.trim().to_lowercase();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| p.extension().map(|e| e == "stat").unwrap_or(false))
            .filter(|p| {
                grid.is_empty()
                    || p.file_name()
                        .map(|n| n.to_string_lossy().to_lowercase().contains(&grid))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut files = Vec::new();
        for path in paths {
            match StatFile::read(&path) {
                Ok(file) => {
                    log::debug!("Read {} row(s) from {}", file.len(), path.display());
                    files.push(file);
                }
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        if files.is_empty() {
            log::warn!(
                "No stat files in {} matched grid '{}'",
                dir.display(),
                grid
            );
        }

        Ok(StatStore { files })
    }

    pub fn total_rows(&self) -> usize {
        self.files.iter().map(StatFile::len).sum()
    }
}

/// MET lead time string (`HHMMSS`, hours unbounded) for a forecast hour
pub fn format_lead(forecast_hour: u32) -> String {
    format!("{:02}0000", forecast_hour)
}
