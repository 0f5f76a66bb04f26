//! Key-value backends the account list is persisted through.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use rkv::{
    backend::{SafeMode, SafeModeDatabase, SafeModeEnvironment},
    Manager, Rkv, SingleStore, StoreOptions,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("{0}")]
    Rkv(#[from] rkv::StoreError),

    #[error("Tried reading a string from the key value store, but found something else.")]
    UnexpectedValue,

    #[error("Key value store lock was poisoned.")]
    Poisoned,
}

pub trait KeyValue {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
}

/// On-disk store backed by an rkv safe-mode environment.
pub struct RkvStore {
    env: Arc<RwLock<Rkv<SafeModeEnvironment>>>,
    store: SingleStore<SafeModeDatabase>,
}

impl RkvStore {
    /// Opens (creating if needed) the store `name` in the existing directory `path`.
    pub fn open(path: &Path, name: &str) -> Result<Self, KvError> {
        let env = Manager::<SafeModeEnvironment>::singleton()
            .write()
            .map_err(|_| KvError::Poisoned)?
            .get_or_create(path, Rkv::new::<SafeMode>)?;

        let store = env
            .read()
            .map_err(|_| KvError::Poisoned)?
            .open_single(name, StoreOptions::create())?;

        Ok(Self { env, store })
    }
}

impl KeyValue for RkvStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let env = self.env.read().map_err(|_| KvError::Poisoned)?;
        let reader = env.read()?;

        match self.store.get(&reader, key)? {
            None => Ok(None),
            Some(rkv::Value::Json(json)) | Some(rkv::Value::Str(json)) => Ok(Some(json.to_string())),
            Some(_) => Err(KvError::UnexpectedValue),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let env = self.env.read().map_err(|_| KvError::Poisoned)?;
        let mut writer = env.write()?;
        self.store.put(&mut writer, key, &rkv::Value::Json(value))?;

        Ok(writer.commit()?)
    }
}

/// In-memory store. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.insert(key, value);
        store
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl KeyValue for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        self.insert(key, value);
        Ok(())
    }
}
