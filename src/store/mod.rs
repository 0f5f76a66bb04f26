//! The ordered account list, the current selection, and their persistence.

pub mod kv;

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    account::{Account, ValidationError},
    STORAGE_KEY,
};

pub use self::kv::{KeyValue, KvError, MemoryStore, RkvStore};

pub type SharedStore = Arc<RwLock<AccountStore>>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("No account at index {index}; there are {len} accounts.")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Could not serialize accounts: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not write accounts: {0}")]
    Backend(#[from] KvError),
}

/// What [`AccountStore::load`] found under the storage key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Absent,
    Corrupt,
    Loaded(usize),
}

pub struct AccountStore {
    kv: Box<dyn KeyValue + Send + Sync>,
    key: String,
    accounts: Vec<Account>,
    selected: Option<usize>,
    epoch: u64,
}

impl AccountStore {
    pub fn new(kv: impl KeyValue + Send + Sync + 'static) -> Self {
        Self::with_key(kv, STORAGE_KEY)
    }

    pub fn with_key(kv: impl KeyValue + Send + Sync + 'static, key: &str) -> Self {
        Self {
            kv: Box::new(kv),
            key: key.to_string(),
            accounts: Vec::new(),
            selected: None,
            epoch: 0,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Replaces the in-memory list with the persisted one. A missing or
    /// unreadable entry leaves the list empty and the stored bytes untouched.
    pub fn load(&mut self) -> LoadOutcome {
        self.accounts.clear();
        self.set_selected(None);

        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no stored accounts");
                return LoadOutcome::Absent;
            }
            Err(err) => {
                warn!(%err, key = %self.key, "could not read stored accounts");
                return LoadOutcome::Corrupt;
            }
        };

        match serde_json::from_str::<Vec<Account>>(&raw) {
            Ok(accounts) => {
                info!(count = accounts.len(), "loaded accounts");
                self.accounts = accounts;
                LoadOutcome::Loaded(self.accounts.len())
            }
            Err(err) => {
                warn!(%err, key = %self.key, "stored accounts are corrupt, starting empty");
                LoadOutcome::Corrupt
            }
        }
    }

    pub fn save(&mut self) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(&self.accounts)?;
        self.kv.set(&self.key, &serialized)?;
        debug!(count = self.accounts.len(), "saved accounts");

        Ok(())
    }

    /// Appends `account` and selects it. Returns its index.
    pub fn add(&mut self, account: Account) -> Result<usize, StoreError> {
        let account = account.validated()?;
        let previous = self.snapshot();

        self.accounts.push(account);
        let index = self.accounts.len() - 1;
        self.set_selected(Some(index));

        self.commit(previous)?;
        Ok(index)
    }

    /// Replaces the account at `index` with `account`.
    pub fn edit(&mut self, index: usize, account: Account) -> Result<(), StoreError> {
        self.check_index(index)?;
        let account = account.validated()?;
        let previous = self.snapshot();

        self.accounts[index] = account;
        if self.selected == Some(index) {
            self.epoch += 1;
        }

        self.commit(previous)
    }

    /// Removes the account at `index`. The selection follows the account it
    /// pointed at, or is cleared if that account was removed.
    pub fn remove(&mut self, index: usize) -> Result<Account, StoreError> {
        self.check_index(index)?;
        let previous = self.snapshot();

        let removed = self.accounts.remove(index);
        match self.selected {
            Some(selected) if selected == index => self.set_selected(None),
            Some(selected) if selected > index => self.set_selected(Some(selected - 1)),
            _ => (),
        }

        self.commit(previous)?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        let previous = self.snapshot();

        self.accounts.clear();
        self.selected = None;
        self.epoch += 1;

        self.commit(previous)
    }

    pub fn select(&mut self, index: Option<usize>) -> Result<(), StoreError> {
        if let Some(index) = index {
            self.check_index(index)?;
        }

        self.set_selected(index);
        Ok(())
    }

    /// Adds the demo account, unselected, to an empty list.
    pub fn seed_demo(&mut self) -> Result<bool, StoreError> {
        if !self.accounts.is_empty() {
            return Ok(false);
        }

        let previous = self.snapshot();
        self.accounts.push(Account::demo());
        self.commit(previous)?;

        info!("seeded demo account");
        Ok(true)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn get(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Account> {
        self.selected.and_then(|index| self.accounts.get(index))
    }

    /// Incremented whenever the selection moves or the selected account
    /// changes. Work started under an older epoch is stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Index of the first account whose issuer matches `name`, ignoring case.
    pub fn find_by_issuer(&self, name: &str) -> Option<usize> {
        self.accounts
            .iter()
            .position(|account| account.issuer.eq_ignore_ascii_case(name))
    }

    /// The issuer closest to `name` by edit distance, if any is reasonably close.
    pub fn closest_issuer(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();

        self.accounts
            .iter()
            .map(|account| {
                let distance =
                    edit_distance::edit_distance(&account.issuer.to_lowercase(), &name);
                (distance, account.issuer.as_str())
            })
            .filter(|(distance, issuer)| !issuer.is_empty() && *distance <= name.len() / 2 + 1)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, issuer)| issuer)
    }

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index < self.accounts.len() {
            Ok(())
        } else {
            Err(StoreError::IndexOutOfRange {
                index,
                len: self.accounts.len(),
            })
        }
    }

    fn set_selected(&mut self, selected: Option<usize>) {
        if self.selected != selected {
            self.selected = selected;
            self.epoch += 1;
        }
    }

    fn snapshot(&self) -> (Vec<Account>, Option<usize>) {
        (self.accounts.clone(), self.selected)
    }

    // persists the current list, restoring `previous` if that fails
    fn commit(&mut self, previous: (Vec<Account>, Option<usize>)) -> Result<(), StoreError> {
        if let Err(err) = self.save() {
            let (accounts, selected) = previous;
            self.accounts = accounts;
            self.selected = selected;
            self.epoch += 1;
            return Err(err);
        }

        Ok(())
    }
}
