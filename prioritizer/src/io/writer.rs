// src/io/writer.rs

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::io::loader::TableFormat;

/// Write the scored table in the format named by the extension. `.xls` is
/// written as `.xlsx`, and unknown extensions fall back to CSV. Returns the
/// path actually written.
pub fn save_table(df: &mut DataFrame, path: &Path) -> Result<PathBuf> {
    let (format, out_path) = match TableFormat::from_path(path) {
        Some(format) => {
            let is_xls = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("xls"));
            if is_xls {
                let xlsx = path.with_extension(format.extension());
                warn!("Legacy .xls output is not supported; writing {}", xlsx.display());
                (format, xlsx)
            } else {
                (format, path.to_path_buf())
            }
        }
        None => {
            let fallback = path.with_extension(TableFormat::Csv.extension());
            warn!(
                "Unrecognized output extension for {}; defaulting to CSV at {}",
                path.display(),
                fallback.display()
            );
            (TableFormat::Csv, fallback)
        }
    };

    debug!("Saving data to {} as {:?}", out_path.display(), format);
    match format {
        TableFormat::Csv => write_delimited(df, &out_path, b',')?,
        TableFormat::Tsv => write_delimited(df, &out_path, b'\t')?,
        TableFormat::Excel => write_xlsx(df, &out_path)?,
    }

    info!("Saved {} SNPs to {}", df.height(), out_path.display());
    Ok(out_path)
}

fn write_delimited(df: &mut DataFrame, path: &Path, separator: u8) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(separator)
        .finish(df)?;
    Ok(())
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// One sheet, header in the first row. Numeric columns become number cells
/// and nulls stay blank.
pub fn write_xlsx(df: &DataFrame, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (c, column) in df.get_columns().iter().enumerate() {
        let c = c as u16;
        sheet.write_string(0, c, column.name().as_str())?;

        if is_numeric(column.dtype()) {
            let values = column.cast(&DataType::Float64)?;
            for (r, v) in values.f64()?.into_iter().enumerate() {
                if let Some(v) = v {
                    sheet.write_number(r as u32 + 1, c, v)?;
                }
            }
        } else {
            let values = column.cast(&DataType::String)?;
            for (r, v) in values.str()?.into_iter().enumerate() {
                if let Some(v) = v {
                    sheet.write_string(r as u32 + 1, c, v)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
