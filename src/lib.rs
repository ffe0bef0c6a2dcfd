pub mod cache;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod error;
pub mod inspect;
pub mod io_utils;
pub mod map_cmd;
pub mod mapper;
pub mod preview;
pub mod record;
pub mod result;
pub mod schema;
pub mod table;
pub mod value;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

pub use crate::cache::{FieldHandle, MappingDescriptor, MetadataCache};
pub use crate::coerce::{TimePrecision, ValueCoercer};
pub use crate::config::MapperConfig;
pub use crate::error::MapperError;
pub use crate::mapper::{ResultMapper, map_result};
pub use crate::record::{FieldKind, FieldSet, FieldSetter, Record};
pub use crate::result::{QueryResult, Series};
pub use crate::value::{FieldValue, RawValue};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("influx_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect(args) => inspect::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Map(args) => map_cmd::execute(&args),
    }
}
