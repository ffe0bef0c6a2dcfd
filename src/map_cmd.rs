//! `map` command: schema-driven mapping of a query response into JSON.

use std::io::Write;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    cli::MapArgs,
    config::MapperConfig,
    io_utils,
    schema::{DynamicRecord, DynamicSchema, map_dynamic},
};

pub fn execute(args: &MapArgs) -> Result<()> {
    let mut schema = DynamicSchema::load(&args.schema)?;
    if let Some(name) = &args.measurement {
        schema.measurement = name.clone();
    }
    let config = match &args.config {
        Some(path) => MapperConfig::load(path)?,
        None => MapperConfig::default(),
    }
    .with_precision(args.precision);
    debug!(
        "Mapping measurement '{}' with {} bound column(s), precision {}",
        schema.measurement,
        schema.columns.len(),
        config.precision
    );

    let result = io_utils::load_result(&args.input)?;
    let records = map_dynamic(&result, &schema, &config)
        .with_context(|| format!("Mapping measurement '{}'", schema.measurement))?;

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    write_records(&mut writer, &records, args.lines)?;
    writer.flush().context("Flushing output")?;
    info!(
        "Mapped {} record(s) of '{}' from {:?}",
        records.len(),
        schema.measurement,
        args.input
    );
    Ok(())
}

pub fn write_records<W: Write>(
    writer: &mut W,
    records: &[DynamicRecord],
    lines: bool,
) -> Result<()> {
    if lines {
        for record in records {
            serde_json::to_writer(&mut *writer, record).context("Writing record")?;
            writeln!(writer)?;
        }
    } else {
        serde_json::to_writer_pretty(&mut *writer, records).context("Writing records")?;
        writeln!(writer)?;
    }
    Ok(())
}
