use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::Builder;
use tracing::warn;

use crate::domain::{CacheCategory, Identifier};
use crate::error::ObdError;

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new_with_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn category_dir(&self, category: CacheCategory) -> Utf8PathBuf {
        self.root.join(category.folder())
    }

    pub fn path(&self, category: CacheCategory, id: &Identifier) -> Utf8PathBuf {
        self.category_dir(category)
            .join(format!("{}.json", id.as_str()))
    }

    pub fn exists_valid(&self, category: CacheCategory, id: &Identifier) -> bool {
        fs::metadata(self.path(category, id).as_std_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    pub fn read(&self, category: CacheCategory, id: &Identifier) -> Option<Value> {
        let path = self.path(category, id);
        let content = match fs::read(path.as_std_path()) {
            Ok(content) => content,
            Err(err) => {
                warn!(%path, "error reading cache file: {err}");
                return None;
            }
        };
        match serde_json::from_slice(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%path, "cache file is not valid JSON: {err}");
                None
            }
        }
    }

    pub fn write<T: Serialize>(
        &self,
        category: CacheCategory,
        id: &Identifier,
        document: &T,
    ) -> bool {
        match self.try_write(category, id, document) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    category = %category,
                    id = %id,
                    "error saving cache file: {err}"
                );
                false
            }
        }
    }

    pub fn try_write<T: Serialize>(
        &self,
        category: CacheCategory,
        id: &Identifier,
        document: &T,
    ) -> Result<(), ObdError> {
        let dir = self.category_dir(category);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| ObdError::Filesystem(format!("create {dir}: {err}")))?;
        let content = to_vec_indented(document)?;

        let mut temp = Builder::new()
            .prefix(".obd-fetch")
            .suffix(".tmp")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| ObdError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| ObdError::Filesystem(err.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| ObdError::Filesystem(err.to_string()))?;

        let path = self.path(category, id);
        temp.persist(path.as_std_path())
            .map_err(|err| ObdError::Filesystem(format!("persist {path}: {err}")))?;
        Ok(())
    }
}

fn to_vec_indented<T: Serialize>(document: &T) -> Result<Vec<u8>, ObdError> {
    let mut content = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut content, PrettyFormatter::with_indent(b"    "));
    document
        .serialize(&mut serializer)
        .map_err(|err| ObdError::Filesystem(err.to_string()))?;
    Ok(content)
}
