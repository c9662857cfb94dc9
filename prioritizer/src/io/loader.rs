// src/io/loader.rs

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{PrioritizerError, Result};

pub const EVIDENCE_COL: &str = "Evidence";
pub const EFFECT_COL: &str = "Effect";
pub const GENE_COL: &str = "Gene";
pub const AA_POSITION_COL: &str = "Amino_Acid_Position";
pub const SPECIES_COL: &str = "Bacterial_Species";

pub const REQUIRED_COLUMNS: [&str; 4] = [EVIDENCE_COL, AA_POSITION_COL, EFFECT_COL, GENE_COL];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Excel,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "txt" => Some(Self::Tsv),
            "xlsx" | "xls" => Some(Self::Excel),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Excel => "xlsx",
        }
    }
}

/// Anything that can hand the pipeline a variant table.
pub trait Dataset {
    fn load(&self) -> Result<DataFrame>;
}

/// A variant table on disk, in any supported format.
pub struct VariantFile {
    pub path: PathBuf,
}

impl Dataset for VariantFile {
    fn load(&self) -> Result<DataFrame> {
        let format = TableFormat::from_path(&self.path).ok_or_else(|| {
            PrioritizerError::UnsupportedFormat(
                self.path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_else(|| self.path.display().to_string()),
            )
        })?;
        debug!("Loading data from {} (format: {:?})", self.path.display(), format);

        let df = match format {
            TableFormat::Csv => read_delimited(&self.path, b',')?,
            TableFormat::Tsv => read_delimited(&self.path, b'\t')?,
            TableFormat::Excel => read_excel(&self.path, 0)?,
        };
        validate_columns(&df)?;

        info!("Loaded {} SNPs from {}", df.height(), self.path.display());
        Ok(df)
    }
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub fn validate_columns(df: &DataFrame) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !has_column(df, col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PrioritizerError::MissingColumns {
            missing,
            required: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        })
    }
}

/// Every column is read as String so passthrough values survive verbatim.
pub fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|mut o| {
            o.separator = separator;
            o.truncate_ragged_lines = true;
            o
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Text of one worksheet cell, or `None` for blanks and error cells.
/// Whole-number floats print without a fraction, so a count stored as a
/// number reads back as `"123"` rather than `"123.0"`.
fn excel_cell(cell: &calamine::DataType) -> Option<String> {
    use calamine::DataType as Cell;
    match cell {
        Cell::Empty | Cell::Error(_) => None,
        Cell::String(s) => Some(s.clone()),
        Cell::Int(i) => Some(i.to_string()),
        Cell::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Cell::Float(n) | Cell::Duration(n) | Cell::DateTime(n) => Some(n.to_string()),
        Cell::Bool(b) => Some(b.to_string()),
        Cell::DateTimeIso(s) | Cell::DurationIso(s) => Some(s.clone()),
    }
}

/// Header cells as column names. Blank headers become `Unnamed: <i>` and
/// repeats get a `.1`, `.2`, ... suffix so every name is unique.
fn header_names(cells: &[calamine::DataType]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let base = excel_cell(cell)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("Unnamed: {i}"));
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

/// Variant table from one worksheet. The first row is the header and every
/// cell is read as text.
pub fn read_excel(path: &Path, sheet_idx: usize) -> Result<DataFrame> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook =
        open_workbook_auto(path).map_err(|e| PrioritizerError::Excel(e.to_string()))?;
    let sheet = workbook
        .worksheet_range_at(sheet_idx)
        .ok_or_else(|| {
            PrioritizerError::Excel(format!("{} has no sheet {sheet_idx}", path.display()))
        })?
        .map_err(|e| PrioritizerError::Excel(e.to_string()))?;

    let mut rows = sheet.rows();
    let names = match rows.next() {
        Some(header) => header_names(header),
        None => {
            return Err(PrioritizerError::Excel(format!(
                "{} has an empty sheet",
                path.display()
            )))
        }
    };
    debug!("Excel columns: {:?}", names);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).and_then(excel_cell));
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Series::new(PlSmallStr::from(name), values).into())
        .collect();
    Ok(DataFrame::new(columns)?)
}
