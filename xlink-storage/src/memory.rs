use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StorageError;
use crate::traits::{BatchOp, BatchWriter, KvCursor, KvEntry, KvPairs, KvStore};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory key-value store over an ordered map, so scans and cursors come
/// back in key order.
pub struct MemoryStore {
    data: RwLock<Map>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Map>, StorageError> {
        self.data.read().map_err(|e| StorageError::ReadError {
            reason: e.to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Map>, StorageError> {
        self.data.write().map_err(|e| StorageError::WriteError {
            reason: e.to_string(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor that keeps the store's read lock for its whole lifetime and
/// resumes each step after the last key it returned.
struct MemoryCursor<'a> {
    guard: RwLockReadGuard<'a, Map>,
    prefix: Vec<u8>,
    next_from: Bound<Vec<u8>>,
}

impl Iterator for MemoryCursor<'_> {
    type Item = KvEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self
            .guard
            .range((self.next_from.clone(), Bound::Unbounded))
            .next()
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, v)| (k.clone(), v.clone()))?;
        self.next_from = Bound::Excluded(key.clone());
        Some(Ok((key, value)))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.write()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.write()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.read()?.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        self.iterate(prefix)?.collect()
    }

    fn iterate(&self, prefix: &[u8]) -> Result<KvCursor<'_>, StorageError> {
        Ok(KvCursor::new(MemoryCursor {
            guard: self.read()?,
            prefix: prefix.to_vec(),
            next_from: Bound::Included(prefix.to_vec()),
        }))
    }
}

impl BatchWriter for MemoryStore {
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let mut data = self.write()?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => data.insert(key, value),
                BatchOp::Delete { key } => data.remove(&key),
            };
        }
        Ok(())
    }
}
