//! Command-line flags. Overrides are applied once on top of the loaded
//! config; the result is the immutable config for the run.

use std::path::PathBuf;

use clap::Parser;
use genoscout_common::PipelineConfig;

/// Used when neither `--config` nor `GENOSCOUT_CONFIG` is given.
pub(crate) const DEFAULT_CONFIG: &str = "genoscout.yaml";

/// Genoscout — collect recent genomics papers and their open-access PDFs.
#[derive(Debug, Parser)]
#[command(
    name = "genoscout",
    version,
    about = "Fetch recent genomics papers, download open-access PDFs, and write a review manifest.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to the YAML config file.
    #[arg(long, env = "GENOSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Days to look back.
    #[arg(long)]
    pub days: Option<u32>,

    /// Max papers to evaluate after filtering.
    #[arg(long)]
    pub max_papers: Option<usize>,

    /// Skip PDF download; every paper is reviewed from its abstract.
    #[arg(long)]
    pub no_pdf: bool,

    /// Output directory for this run (PDFs go to a sibling `pdfs/`).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
    }

    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(days) = self.days {
            config.days_lookback = days;
        }
        if let Some(max) = self.max_papers {
            config.max_papers_to_evaluate = max;
        }
        if self.no_pdf {
            config.download_pdfs = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}
