use anyhow::{Result, bail};
use log::info;

use crate::{cli::PreviewArgs, io_utils, result::Series, table::Table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let result = io_utils::load_result(&args.input)?;
    let selected: Vec<&Series> = result
        .series
        .iter()
        .filter(|s| args.series.as_deref().is_none_or(|name| s.name == name))
        .collect();
    if let Some(name) = args.series.as_deref().filter(|_| selected.is_empty()) {
        bail!("No series named '{name}' in {:?}", args.input);
    }

    let mut shown = 0usize;
    for series in selected {
        println!("{}", series_title(series));
        let table = preview_table(series, args.rows);
        table.print();
        shown += table.row_count();
    }
    info!("Displayed {shown} row(s) from {:?}", args.input);
    Ok(())
}

fn series_title(series: &Series) -> String {
    if series.tags.is_empty() {
        return format!("== {}", series.name);
    }
    let tags = series
        .tags
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("== {} [{tags}]", series.name)
}

pub fn preview_table(series: &Series, limit: usize) -> Table {
    let mut table = Table::new(series.columns.iter().map(String::as_str));
    for row in series.rows.iter().take(limit) {
        table.push_row(row.iter().map(|value| value.as_text()).collect());
    }
    table
}
