use std::{fs::create_dir_all, path::PathBuf};

use tracing::{info, warn};

use crate::{
    store::{AccountStore, RkvStore},
    AppResult, LoadOutcome, SERVICE_NAME,
};

pub const DEFAULT_DATA_DIR: &str = "~/.twofa";
pub const DATA_DIR_ENV: &str = "TWOFA_DIR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl Config {
    /// `data_dir` may start with `~`.
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: PathBuf::from(shellexpand::tilde(data_dir).as_ref()),
        }
    }

    /// Opens the on-disk store and loads the account list, seeding the demo
    /// account on first use.
    pub fn open_store(&self) -> AppResult<AccountStore> {
        create_dir_all(&self.data_dir)?;

        let kv = RkvStore::open(&self.data_dir, SERVICE_NAME)?;
        let mut store = AccountStore::new(kv);

        match store.load() {
            LoadOutcome::Absent => {
                store.seed_demo()?;
            }
            LoadOutcome::Corrupt => warn!(
                path = %self.data_dir.display(),
                "stored accounts could not be read; they will be replaced on the next change"
            ),
            LoadOutcome::Loaded(count) => info!(count, path = %self.data_dir.display(), "opened store"),
        }

        Ok(store)
    }
}
