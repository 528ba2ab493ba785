use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::domain::{AccountRecord, Identifier, LicenseCategory, PDO_LIST_ENDPOINT};
use crate::error::ObdError;
use crate::obd::ObdClient;
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub accounts: usize,
    pub api_calls: usize,
    /// Cache entries persisted during the pass.
    pub written: usize,
}

impl PassStats {
    pub fn is_complete(&self) -> bool {
        self.api_calls == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Fetched { endpoints: usize },
    Cached,
    Skipped,
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

pub struct App<C: ObdClient> {
    settings: Settings,
    store: Store,
    client: C,
    sleep: Sleeper,
}

impl<C: ObdClient> App<C> {
    pub fn new(settings: Settings, client: C) -> Self {
        let store = Store::new_with_root(settings.cache_root.clone());
        Self {
            settings,
            store,
            client,
            sleep: Box::new(thread::sleep),
        }
    }

    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub(crate) fn fetch(
        &self,
        endpoint: &str,
        id: &Identifier,
        stats: &mut PassStats,
    ) -> Result<Value, ObdError> {
        let document = self.client.fetch(endpoint, id)?;
        stats.api_calls += 1;
        Ok(document)
    }

    pub fn load_accounts(&self) -> Result<Vec<AccountRecord>, ObdError> {
        let path = &self.settings.input_path;
        let content = fs::read_to_string(path.as_std_path()).map_err(|err| {
            error!(%path, "error reading account list: {err}");
            ObdError::InputRead(path.as_std_path().to_path_buf())
        })?;
        serde_json::from_str(&content).map_err(|err| {
            error!(%path, "error parsing account list: {err}");
            ObdError::InputParse(err.to_string())
        })
    }

    pub fn run_pass(&self, interrupt: &AtomicBool) -> Result<PassStats, ObdError> {
        let accounts = self.load_accounts()?;
        let mut stats = PassStats::default();
        self.run_accounts(&accounts, interrupt, &mut stats)?;
        Ok(stats)
    }

    /// Like [`App::run_pass`], but `stats` stays readable when the pass fails.
    pub fn run_accounts(
        &self,
        accounts: &[AccountRecord],
        interrupt: &AtomicBool,
        stats: &mut PassStats,
    ) -> Result<(), ObdError> {
        for record in accounts {
            if interrupt.load(Ordering::SeqCst) {
                warn!("process interrupted by user");
                return Err(ObdError::Interrupted);
            }
            info!(account = %record.account_number, "requesting data for account");
            self.process_account(record, stats)?;
            stats.accounts += 1;
        }
        Ok(())
    }

    pub fn process_account(
        &self,
        record: &AccountRecord,
        stats: &mut PassStats,
    ) -> Result<AccountOutcome, ObdError> {
        let id: Identifier = match record.account_number.parse() {
            Ok(id) => id,
            Err(err) => {
                error!("skipping account: {err}");
                return Ok(AccountOutcome::Skipped);
            }
        };
        let category = record.category();
        let cache_category = category.cache_category();

        if self.store.exists_valid(cache_category, &id) {
            for endpoint in category.endpoints() {
                info!(account = %id, endpoint, "data already cached");
                if *endpoint == PDO_LIST_ENDPOINT {
                    self.reconcile_cached_pdos(category, &id, stats)?;
                }
            }
            return Ok(AccountOutcome::Cached);
        }

        (self.sleep)(self.settings.account_delay);

        let mut aggregate = Map::new();
        for endpoint in category.endpoints() {
            info!(account = %id, endpoint, "fetching data");
            let document = self.fetch(endpoint, &id, stats)?;
            if *endpoint == PDO_LIST_ENDPOINT {
                self.converge_pdos(&id, &document, stats)?;
            }
            aggregate.insert((*endpoint).to_string(), document);
        }

        let endpoints = aggregate.len();
        if self
            .store
            .write(cache_category, &id, &Value::Object(aggregate))
        {
            stats.written += 1;
        }
        Ok(AccountOutcome::Fetched { endpoints })
    }

    // A bad PDO payload only costs this account its PDO entries.
    fn converge_pdos(
        &self,
        account: &Identifier,
        list: &Value,
        stats: &mut PassStats,
    ) -> Result<(), ObdError> {
        match self.process_pdos(list, stats) {
            Ok(_) => Ok(()),
            Err(err @ (ObdError::MalformedPdoList(_) | ObdError::MissingPdoId(_))) => {
                error!(account = %account, "skipping PDO entries: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn reconcile_cached_pdos(
        &self,
        category: LicenseCategory,
        id: &Identifier,
        stats: &mut PassStats,
    ) -> Result<(), ObdError> {
        let Some(aggregate) = self.store.read(category.cache_category(), id) else {
            warn!(account = %id, "cached aggregate unreadable; skipping PDO check");
            return Ok(());
        };
        match aggregate.get(PDO_LIST_ENDPOINT) {
            Some(list) => self.converge_pdos(id, list, stats),
            None => {
                warn!(
                    account = %id,
                    "cached aggregate has no {PDO_LIST_ENDPOINT} field; skipping PDO check"
                );
                Ok(())
            }
        }
    }
}
