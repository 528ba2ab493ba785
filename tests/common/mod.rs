#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};
use tempfile::TempDir;

use obd_fetch::config::Settings;
use obd_fetch::domain::Identifier;
use obd_fetch::error::ObdError;
use obd_fetch::obd::ObdClient;

/// Canned responses keyed by (endpoint, id); anything else gets a small
/// generic document, and `builderPDOs` defaults to an empty list.
#[derive(Default)]
pub struct MockObd {
    responses: HashMap<(String, String), Value>,
    failures_left: Mutex<usize>,
    fail_status: Option<u16>,
    broken_endpoint: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockObd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, endpoint: &str, id: &str, value: Value) -> Self {
        self.responses
            .insert((endpoint.to_string(), id.to_string()), value);
        self
    }

    /// The next `count` calls fail with a transport error (or `with_status`).
    pub fn failing(self, count: usize) -> Self {
        *self.failures_left.lock().unwrap() = count;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    /// Every call to `endpoint` answers 503.
    pub fn with_broken_endpoint(mut self, endpoint: &str) -> Self {
        self.broken_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(endpoint, _)| endpoint).collect()
    }
}

impl ObdClient for MockObd {
    fn fetch(&self, endpoint: &str, id: &Identifier) -> Result<Value, ObdError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), id.as_str().to_string()));

        if self.broken_endpoint.as_deref() == Some(endpoint) {
            return Err(ObdError::Status {
                status: 503,
                message: "mock".to_string(),
            });
        }

        let mut failures_left = self.failures_left.lock().unwrap();
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(match self.fail_status {
                Some(status) => ObdError::Status {
                    status,
                    message: "mock".to_string(),
                },
                None => ObdError::Http("connection reset".to_string()),
            });
        }

        let key = (endpoint.to_string(), id.as_str().to_string());
        if let Some(value) = self.responses.get(&key) {
            return Ok(value.clone());
        }
        if endpoint == "builderPDOs" {
            return Ok(json!([]));
        }
        Ok(json!({"endpoint": endpoint, "id": id.as_str()}))
    }
}

pub fn workspace(accounts: Value) -> (TempDir, Utf8PathBuf, Settings) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    fs::write(
        root.join("builders.json"),
        serde_json::to_vec_pretty(&accounts).unwrap(),
    )
    .unwrap();
    let settings = Settings::default()
        .with_root(&root)
        .with_account_delay(Duration::ZERO);
    (temp, root, settings)
}

pub fn account(number: &str, status: &str) -> Value {
    json!({"ACCOUNTNUMBER": number, "LICENSESTATUS": status})
}

pub fn seed(root: &Utf8Path, folder: &str, id: &str, value: &Value) {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{id}.json")),
        serde_json::to_vec_pretty(value).unwrap(),
    )
    .unwrap();
}

/// Every cache file under the three folders, keyed by relative path.
pub fn snapshot(root: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    for folder in ["Builder", "Umbrella", "PDO"] {
        let dir = root.join(folder);
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let entry = entry.unwrap();
            let name = entry.file_name().into_string().unwrap();
            files.insert(format!("{folder}/{name}"), fs::read(entry.path()).unwrap());
        }
    }
    files
}

pub fn recording_sleeper() -> (
    Arc<Mutex<Vec<Duration>>>,
    impl Fn(Duration) + Send + Sync + 'static,
) {
    let sleeps = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&sleeps);
    (sleeps, move |delay| recorded.lock().unwrap().push(delay))
}

pub fn read_json(path: &Utf8Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}
