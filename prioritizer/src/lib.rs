//! Prioritize SNPs from metagenomic samples by read depth, amino acid change
//! severity and overlap with UniProt domains.
//!
//! ```ignore
//! let prioritizer = Prioritizer::new(
//!     ScoringConfig::default(),
//!     Box::new(EutilsTaxonomy::new()?),
//!     Box::new(UniProtRepository::new()?),
//! )?;
//! let input = VariantFile { path: "snps.xlsx".into() };
//! let (scored, _) = prioritizer.run(&input, "Bacteroides uniformis", None)?;
//! ```

pub mod api_handler;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod scoring;

pub use config::ScoringConfig;
pub use error::{PrioritizerError, RowWarning, WarningKind};
pub use io::loader::{Dataset, VariantFile};
pub use pipeline::Prioritizer;
pub use processors::taxonomy::{EutilsTaxonomy, NamesDmpTaxonomy, TaxonomyLookup};
pub use processors::uniprot::{ProteinRepository, UniProtRepository};
