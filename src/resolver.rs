use tracing::{debug, info};

use crate::domain::{Fields, ResolveMode};
use crate::error::LoaderError;
use crate::store::ChadoStore;

pub fn pkey_column(table: &str) -> String {
    format!("{table}_id")
}

pub fn resolve<S: ChadoStore + ?Sized>(
    store: &S,
    record_type: &str,
    table: &str,
    mode: ResolveMode,
    select: &Fields,
    insert: &Fields,
) -> Result<i64, LoaderError> {
    if select.is_empty() {
        return Err(LoaderError::InvalidResolveRequest(format!(
            "no select values given for {record_type}"
        )));
    }
    if let Some(column) = insert.columns().find(|column| select.contains(column)) {
        return Err(LoaderError::InvalidResolveRequest(format!(
            "column {column} of {record_type} is both a select and an insert value"
        )));
    }

    let pkey = pkey_column(table);
    let keys = store.select_keys(table, &pkey, select)?;
    match keys.as_slice() {
        [key] => match mode {
            ResolveMode::InsertOnly => Err(LoaderError::RecordAlreadyExists {
                record_type: record_type.to_string(),
                table: table.to_string(),
            }),
            ResolveMode::SelectOnly | ResolveMode::SelectOrInsert => {
                debug!(record_type, table, key, "selected existing record");
                Ok(*key)
            }
        },
        [] => match mode {
            ResolveMode::SelectOnly => Err(LoaderError::RecordNotFound {
                record_type: record_type.to_string(),
                table: table.to_string(),
            }),
            ResolveMode::InsertOnly | ResolveMode::SelectOrInsert => {
                let values = select.merged(insert);
                let key = store.insert(table, &pkey, &values)?.ok_or_else(|| {
                    LoaderError::InsertFailed {
                        record_type: record_type.to_string(),
                        table: table.to_string(),
                    }
                })?;
                info!(record_type, table, key, values = %values, "inserted record");
                Ok(key)
            }
        },
        many => Err(LoaderError::AmbiguousRecord {
            record_type: record_type.to_string(),
            table: table.to_string(),
            count: many.len(),
        }),
    }
}
