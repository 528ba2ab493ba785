use serde_json::Value;
use tracing::info;

use crate::app::{App, PassStats};
use crate::domain::{CacheCategory, Identifier, PDO_ENDPOINT, PDO_ID_FIELD};
use crate::error::ObdError;
use crate::obd::ObdClient;

/// `builderPDOs` bodies are the list itself; `null` means no PDOs.
pub fn pdo_ids(list: &Value) -> Result<Vec<Identifier>, ObdError> {
    let records = match list {
        Value::Null => return Ok(Vec::new()),
        Value::Array(records) => records,
        other => return Err(ObdError::MalformedPdoList(truncate(other))),
    };

    records
        .iter()
        .map(|record| {
            let raw = match record.get(PDO_ID_FIELD) {
                Some(Value::String(value)) => value.clone(),
                Some(Value::Number(value)) => value.to_string(),
                _ => return Err(ObdError::MissingPdoId(truncate(record))),
            };
            raw.parse()
                .map_err(|_| ObdError::MissingPdoId(truncate(record)))
        })
        .collect()
}

fn truncate(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 120 {
        let mut cut = 120;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

impl<C: ObdClient> App<C> {
    pub fn process_pdos(
        &self,
        list: &Value,
        stats: &mut PassStats,
    ) -> Result<usize, ObdError> {
        let mut fetched = 0;
        for id in pdo_ids(list)? {
            if self.store().exists_valid(CacheCategory::Pdo, &id) {
                info!(pdo = %id, "PDO data already cached");
                continue;
            }
            info!(pdo = %id, "fetching PDO data");
            let document = self.fetch(PDO_ENDPOINT, &id, stats)?;
            if self.store().write(CacheCategory::Pdo, &id, &document) {
                stats.written += 1;
            }
            fetched += 1;
        }
        Ok(fetched)
    }
}
