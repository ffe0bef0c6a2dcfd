use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::coerce::TimePrecision;

#[derive(Debug, Parser)]
#[command(author, version, about = "Map InfluxDB query results into typed records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarise the series contained in a query response
    Inspect(InspectArgs),
    /// Print the raw rows of each series in a formatted table
    Preview(PreviewArgs),
    /// Map a measurement into typed JSON records using a schema file
    Map(MapArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Query response JSON file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Query response JSON file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Only show series with this name
    #[arg(long)]
    pub series: Option<String>,
    /// Maximum number of rows to show per series
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Query response JSON file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Schema file (YAML or JSON) naming the measurement and its columns
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Mapper configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Unit of numeric epoch timestamps (ns, us, ms, s, m, h); overrides --config
    #[arg(long, value_parser = parse_precision)]
    pub precision: Option<TimePrecision>,
    /// Map series with this name instead of the schema's measurement
    #[arg(long)]
    pub measurement: Option<String>,
    /// Emit one JSON object per line instead of a pretty-printed array
    #[arg(long)]
    pub lines: bool,
}

fn parse_precision(value: &str) -> Result<TimePrecision, String> {
    value.parse()
}
