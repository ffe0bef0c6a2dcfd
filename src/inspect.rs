//! Series overview of a query response.

use anyhow::Result;
use log::info;

use crate::{cli::InspectArgs, io_utils, result::QueryResult, table::Table};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let result = io_utils::load_result(&args.input)?;
    if let Some(error) = &result.error {
        info!("Query response carries an error: {error}");
    }
    summary_table(&result).print();
    info!(
        "Inspected {} series with {} row(s) from {:?}",
        result.series.len(),
        result.total_rows(),
        args.input
    );
    Ok(())
}

pub fn summary_table(result: &QueryResult) -> Table {
    let mut table = Table::new(["#", "series", "columns", "rows", "tags", "error"])
        .align_right(0)
        .align_right(3);
    for (idx, series) in result.series.iter().enumerate() {
        let tags = series
            .tags
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        table.push_row(vec![
            (idx + 1).to_string(),
            series.name.clone(),
            series.columns.join(","),
            series.rows.len().to_string(),
            tags,
            series.error.clone().unwrap_or_default(),
        ]);
    }
    table
}
