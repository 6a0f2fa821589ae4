use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "seowatch",
    about = "Compare structural SEO counts against the previous run and report changes",
    version,
    long_about = None
)]
pub struct Args {
    /// Path to the sites configuration file
    #[arg(short, long, default_value = "sites_config.json")]
    pub config: PathBuf,

    /// Path to the extracted counts file for this run
    #[arg(long)]
    pub counts: Option<PathBuf>,

    /// Analyze a single configured site
    #[arg(short, long)]
    pub site: Option<String>,

    /// Analyze explicit URLs instead of the configured ones
    #[arg(long, num_args = 1..)]
    pub urls: Option<Vec<String>>,

    /// List configured sites and exit
    #[arg(long)]
    pub list_sites: bool,

    /// Override the snapshot file location
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Override the export table location
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Skip the tabular export
    #[arg(long)]
    pub no_export: bool,

    /// Skip rendering and sending the report
    #[arg(long)]
    pub no_notify: bool,

    /// Skip the local results dump
    #[arg(long)]
    pub no_local: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
