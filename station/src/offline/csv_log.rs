use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Header plus string cells of a comma-separated log. Quoting is not
/// supported; the logger never writes quoted fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLog {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvLog {
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .map(split_row)
            .ok_or_else(|| anyhow::anyhow!("empty CSV log"))?;
        let width = header.len();
        let rows = lines
            .map(|line| {
                let mut row = split_row(line);
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Ok(Self { header, rows })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading log {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing log {}", path.display()))
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str) -> anyhow::Result<usize> {
        self.column(name)
            .ok_or_else(|| anyhow::anyhow!("log has no '{name}' column"))
    }

    /// Cell parsed as a number; blank or unparsable cells are `None`.
    pub fn number(row: &[String], index: usize) -> Option<f64> {
        row.get(index)?.trim().parse().ok()
    }

    /// Rows where both columns hold numbers, as `(a, b)` pairs.
    pub fn numeric_pairs(&self, a: usize, b: usize) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| Some((Self::number(row, a)?, Self::number(row, b)?)))
            .collect()
    }

    pub fn to_csv_string(&self) -> String {
        let mut out = self.header.join(",");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_csv_string())
            .with_context(|| format!("writing log {}", path.display()))
    }
}

fn split_row(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(',')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// `<stem>_calibrated.<ext>` next to `input`.
pub fn calibrated_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}_calibrated.{}", ext.to_string_lossy()),
        None => format!("{stem}_calibrated"),
    };
    input.with_file_name(name)
}
