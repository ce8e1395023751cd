use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Extract, anonymize and load both stores, then mirror assets
    Run,
    /// Extract changed records from the production stores
    Extract,
    /// Anonymize every extracted file
    Transform,
    /// Load transformed files into the QA stores
    Load,
    /// Copy objects missing from the QA bucket
    Assets,
    /// Show record counts and sizes of the QA stores
    Stats {
        #[arg(
            long,
            value_delimiter = ',',
            help = "Comma-separated collection names (default: all)"
        )]
        collections: Vec<String>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Comma-separated table names (default: all)"
        )]
        tables: Vec<String>,
    },
    /// Inspect or reset the incremental extraction watermark
    Watermark {
        #[command(subcommand)]
        command: WatermarkCommand,
    },
}

#[derive(Subcommand)]
pub enum WatermarkCommand {
    /// Print the start time of the last successful run
    Show,
    /// Forget the watermark so the next run extracts everything
    Reset,
}
