//! In-memory gateway for tests and dry runs. Data is lost on exit.

use crate::PersistenceGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use threadsense_core::{CoreError, ExtractedRecord};

#[derive(Default)]
pub struct MemoryGateway {
    records: RwLock<HashMap<String, ExtractedRecord>>,
    upserts: RwLock<Vec<String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record without counting it as an upsert.
    pub fn with_record(self, record: ExtractedRecord) -> Self {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
        self
    }

    /// Ids passed to `upsert`, in call order.
    pub fn upserts(&self) -> Vec<String> {
        self.upserts.read().unwrap().clone()
    }

    pub fn snapshot(&self, id: &str) -> Option<ExtractedRecord> {
        self.records.read().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.records.read().unwrap().contains_key(id))
    }

    async fn upsert(&self, record: &ExtractedRecord) -> Result<(), CoreError> {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        self.upserts.write().unwrap().push(record.id.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ExtractedRecord>, CoreError> {
        Ok(self.snapshot(id))
    }

    async fn count(&self) -> Result<u64, CoreError> {
        Ok(self.records.read().unwrap().len() as u64)
    }
}
