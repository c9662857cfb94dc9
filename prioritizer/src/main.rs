use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use snp_prioritizer::io::loader::TableFormat;
use snp_prioritizer::{
    EutilsTaxonomy, NamesDmpTaxonomy, Prioritizer, ScoringConfig, TaxonomyLookup,
    UniProtRepository, VariantFile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Excel,
    Csv,
    Tsv,
}

impl From<OutputFormat> for TableFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Excel => TableFormat::Excel,
            OutputFormat::Csv => TableFormat::Csv,
            OutputFormat::Tsv => TableFormat::Tsv,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "snp-prioritizer", version)]
#[command(about = "Prioritize SNPs by read depth, amino acid impact and UniProt domain overlap")]
struct Cli {
    /// Input table (.csv, .tsv, .txt, .xlsx, .xls)
    #[arg(short, long)]
    input: PathBuf,

    /// Bacterial species name, e.g. 'Bacteroides uniformis'
    #[arg(short, long)]
    species: String,

    /// Output table (.xlsx, .csv, .tsv, .txt); defaults to <input>_results.<ext>
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format override
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// JSON file with scoring parameters; flags below take precedence
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Length tolerance when matching UniProt entries [default: 50]
    #[arg(long)]
    uniprot_tolerance: Option<u32>,

    /// Weight of normalized read depth [default: 2.0]
    #[arg(long)]
    depth_weight: Option<f64>,

    /// Weight of the amino acid impact score [default: 1.0]
    #[arg(long)]
    aa_weight: Option<f64>,

    /// Weight of the domain position match [default: 1.0]
    #[arg(long)]
    domain_weight: Option<f64>,

    /// Resolve species offline from an NCBI names.dmp instead of E-utilities
    #[arg(long, value_name = "FILE")]
    names_dmp: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(short, long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn scoring_config(&self) -> Result<ScoringConfig> {
        let mut config = match &self.config {
            Some(path) => ScoringConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ScoringConfig::default(),
        };
        if let Some(t) = self.uniprot_tolerance {
            config.uniprot_tolerance = t;
        }
        if let Some(w) = self.depth_weight {
            config.depth_weight = w;
        }
        if let Some(w) = self.aa_weight {
            config.aa_weight = w;
        }
        if let Some(w) = self.domain_weight {
            config.domain_weight = w;
        }
        Ok(config)
    }

    fn output_path(&self) -> PathBuf {
        match (&self.output, self.format) {
            (Some(path), Some(format)) => path.with_extension(TableFormat::from(format).extension()),
            (Some(path), None) => path.clone(),
            (None, format) => default_output_path(&self.input, format),
        }
    }
}

/// `<input-stem>_results.<ext>`, in the current directory.
fn default_output_path(input: &Path, format: Option<OutputFormat>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snps".to_string());
    let ext = format
        .map(TableFormat::from)
        .or_else(|| TableFormat::from_path(input))
        .unwrap_or(TableFormat::Csv)
        .extension();
    PathBuf::from(format!("{stem}_results.{ext}"))
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = if cli.verbose || cli.quiet {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.scoring_config()?;
    debug!("Effective configuration:\n{}", config.to_json_pretty()?);

    let output = cli.output_path();
    info!("Starting snp-prioritizer v{}", env!("CARGO_PKG_VERSION"));
    info!("Processing input file: {}", cli.input.display());
    info!("Target species: {}", cli.species);
    info!("Output will be saved to: {}", output.display());

    let taxonomy: Box<dyn TaxonomyLookup> = match &cli.names_dmp {
        Some(path) => Box::new(NamesDmpTaxonomy::from_path(path)?),
        None => Box::new(EutilsTaxonomy::new()?),
    };
    let prioritizer = Prioritizer::new(config, taxonomy, Box::new(UniProtRepository::new()?))?;

    let input = VariantFile {
        path: cli.input.clone(),
    };
    let (_, written) = prioritizer.run(&input, &cli.species, Some(&output))?;

    if let Some(path) = written {
        info!("Results saved to: {}", path.display());
    }
    info!("snp-prioritizer completed successfully");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(&cli) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn default_output_follows_input_format() {
        assert_eq!(
            default_output_path(Path::new("data/snps.xlsx"), None),
            PathBuf::from("snps_results.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("snps.xls"), None),
            PathBuf::from("snps_results.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("snps.txt"), None),
            PathBuf::from("snps_results.tsv")
        );
        assert_eq!(
            default_output_path(Path::new("snps.csv"), Some(OutputFormat::Tsv)),
            PathBuf::from("snps_results.tsv")
        );
    }

    #[test]
    fn format_overrides_explicit_output_extension() {
        let cli = parse(&["snp-prioritizer", "-i", "a.csv", "-s", "E coli", "-o", "out.csv", "-f", "tsv"]);
        assert_eq!(cli.output_path(), PathBuf::from("out.tsv"));
    }

    #[test]
    fn excel_format_writes_xlsx() {
        let cli = parse(&["snp-prioritizer", "-i", "a.tsv", "-s", "E coli", "-f", "excel"]);
        assert_eq!(cli.output_path(), PathBuf::from("a_results.xlsx"));
    }

    #[test]
    fn flags_override_config_defaults() {
        let cli = parse(&[
            "snp-prioritizer", "-i", "a.csv", "-s", "E coli", "--uniprot-tolerance", "10", "--aa-weight", "0.5",
        ]);
        let config = cli.scoring_config().unwrap();
        assert_eq!(config.uniprot_tolerance, 10);
        assert_eq!(config.aa_weight, 0.5);
        assert_eq!(config.depth_weight, 2.0);
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["snp-prioritizer", "-i", "a.csv", "-s", "x", "-v", "-q"]).is_err());
    }
}
