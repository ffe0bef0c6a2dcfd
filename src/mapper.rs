//! Drives the conversion of a whole query result into records.
//!
//! A mapping call validates the target type and the result, makes sure the
//! type's bindings are cached, then walks every series named after the
//! type's measurement. Within a series each row yields at most one record,
//! created only when one of the row's columns is bound. The first error
//! aborts the call.

use log::trace;

use crate::{
    cache::MetadataCache,
    coerce::ValueCoercer,
    config::MapperConfig,
    error::{MapperError, Result},
    record::Record,
    result::{QueryResult, Series},
    value::RawValue,
};

#[derive(Debug, Clone, Copy)]
pub struct ResultMapper<'a> {
    cache: &'a MetadataCache,
    coercer: ValueCoercer,
    apply_tags: bool,
}

impl Default for ResultMapper<'static> {
    fn default() -> Self {
        ResultMapper::new()
    }
}

impl ResultMapper<'static> {
    /// Mapper backed by the process-wide cache and the default configuration.
    pub fn new() -> Self {
        ResultMapper::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        ResultMapper::with_cache(MetadataCache::global(), config)
    }
}

impl<'a> ResultMapper<'a> {
    pub fn with_cache(cache: &'a MetadataCache, config: MapperConfig) -> Self {
        ResultMapper {
            cache,
            coercer: ValueCoercer::with_precision(config.precision),
            apply_tags: config.apply_tags,
        }
    }

    /// Maps every series named after `T`'s measurement, in the order received.
    pub fn map_result<T: Record>(&self, result: &QueryResult) -> Result<Vec<T>> {
        let measurement = require_measurement::<T>()?;
        self.map_series_named(result, measurement)
    }

    /// Like [`ResultMapper::map_result`] but selects series named `measurement`.
    /// `T` must still declare a measurement of its own.
    pub fn map_result_as<T: Record>(
        &self,
        result: &QueryResult,
        measurement: &str,
    ) -> Result<Vec<T>> {
        require_measurement::<T>()?;
        self.map_series_named(result, measurement)
    }

    fn map_series_named<T: Record>(
        &self,
        result: &QueryResult,
        measurement: &str,
    ) -> Result<Vec<T>> {
        check_errors(result)?;
        let descriptor = self.cache.ensure_cached::<T>();

        let mut records = Vec::new();
        for series in &result.series {
            if series.name != measurement {
                trace!(
                    "Skipping series '{}' while mapping {}",
                    series.name,
                    T::type_name()
                );
                continue;
            }
            walk_series(
                series,
                self.apply_tags,
                |column| descriptor.lookup(column),
                instantiate::<T>,
                |record, handle, raw| self.coercer.set_value(record, handle, raw),
                &mut records,
            )?;
        }
        Ok(records)
    }
}

/// Maps `result` into `T` with the process-wide cache and default settings.
pub fn map_result<T: Record>(result: &QueryResult) -> Result<Vec<T>> {
    ResultMapper::new().map_result(result)
}

pub fn require_measurement<T: Record>() -> Result<&'static str> {
    T::measurement().ok_or_else(|| MapperError::InvalidArgument {
        record: T::type_name().to_string(),
    })
}

/// Fails on the first upstream error, top-level first, then series in order.
/// Empty error strings are treated as absent.
pub fn check_errors(result: &QueryResult) -> Result<()> {
    if let Some(error) = result.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(MapperError::query(error));
    }
    if let Some(error) = result
        .series
        .iter()
        .filter_map(|s| s.error.as_deref())
        .find(|e| !e.is_empty())
    {
        return Err(MapperError::series(error));
    }
    Ok(())
}

fn instantiate<T: Record>() -> Result<T> {
    T::instantiate().map_err(|reason| MapperError::Instantiation {
        record: T::type_name().to_string(),
        reason,
    })
}

/// Per-row accumulate/flush loop shared by typed and schema-driven mapping.
///
/// Column bindings are resolved once per series. A record is created on the
/// first bound column of a row; tags are applied only to a row that already
/// produced one. Rows that do not match the column list abort the walk.
pub(crate) fn walk_series<R, H>(
    series: &Series,
    apply_tags: bool,
    lookup: impl Fn(&str) -> Option<H>,
    mut instantiate: impl FnMut() -> Result<R>,
    mut assign: impl FnMut(&mut R, &H, &RawValue) -> Result<()>,
    out: &mut Vec<R>,
) -> Result<()> {
    let bindings: Vec<Option<H>> = series.columns.iter().map(|c| lookup(c.as_str())).collect();
    let tags: Vec<(H, RawValue)> = if apply_tags {
        series
            .tags
            .iter()
            .filter_map(|(key, value)| {
                lookup(key.as_str()).map(|h| (h, RawValue::from(value.as_str())))
            })
            .collect()
    } else {
        Vec::new()
    };

    for (index, row) in series.rows.iter().enumerate() {
        if row.len() != bindings.len() {
            return Err(MapperError::RowWidth {
                series: series.name.clone(),
                row: index,
                expected: bindings.len(),
                found: row.len(),
            });
        }
        let mut record: Option<R> = None;
        for (binding, raw) in bindings.iter().zip(row) {
            let Some(handle) = binding else {
                continue;
            };
            if record.is_none() {
                record = Some(instantiate()?);
            }
            if let Some(target) = record.as_mut() {
                assign(target, handle, raw)?;
            }
        }
        if let Some(mut target) = record {
            for (handle, raw) in &tags {
                assign(&mut target, handle, raw)?;
            }
            out.push(target);
        }
    }
    Ok(())
}
