// src/error.rs

use std::fmt;

use polars::error::PolarsError;
use thiserror::Error;

/// Errors that stop a run. Everything that can go wrong with a single row is a
/// [`RowWarning`] instead.
#[derive(Debug, Error)]
pub enum PrioritizerError {
    #[error("invalid weight configuration: {0}")]
    InvalidWeightConfiguration(String),

    #[error("missing/incorrect columns: {} (required headers are exactly: {})", .missing.join("  "), .required.join("  "))]
    MissingColumns {
        missing: Vec<String>,
        required: Vec<String>,
    },

    #[error("unsupported file format `{0}` (supported: .csv, .tsv, .txt, .xlsx, .xls)")]
    UnsupportedFormat(String),

    #[error("invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("excel error: {0}")]
    Excel(String),

    #[error("writing workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PrioritizerError>;

/// Why a row's derived fields fell back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    SpeciesNotFound,
    MalformedEvidence,
    UnparsableEffect,
    UnknownAminoAcid,
    MalformedPosition,
    NoEligibleMatch,
    RepositoryUnavailable,
}

impl WarningKind {
    /// Lookup failures are logged once per species or gene when they happen;
    /// everything else is logged for each row.
    pub fn is_logged_per_key(self) -> bool {
        matches!(
            self,
            WarningKind::SpeciesNotFound | WarningKind::RepositoryUnavailable
        )
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WarningKind::SpeciesNotFound => "SpeciesNotFound",
            WarningKind::MalformedEvidence => "MalformedEvidence",
            WarningKind::UnparsableEffect => "UnparsableEffect",
            WarningKind::UnknownAminoAcid => "UnknownAminoAcid",
            WarningKind::MalformedPosition => "MalformedPosition",
            WarningKind::NoEligibleMatch => "NoEligibleMatch",
            WarningKind::RepositoryUnavailable => "RepositoryUnavailable",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowWarning {
    pub kind: WarningKind,
    pub detail: String,
}

impl RowWarning {
    pub fn new(kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}
