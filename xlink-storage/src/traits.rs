use std::sync::Arc;

use crate::error::StorageError;

/// Result type for prefix scan operations: a list of key-value byte pairs.
pub type KvPairs = Vec<(Vec<u8>, Vec<u8>)>;

/// A key-value pair yielded by a cursor.
pub type KvEntry = Result<(Vec<u8>, Vec<u8>), StorageError>;

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Scoped forward cursor over one key prefix, in byte-lexicographic order.
///
/// A cursor may hold backend resources (the memory backend keeps its read
/// lock) until it is dropped, so it must go out of scope before the store is
/// written to.
pub struct KvCursor<'a> {
    inner: Box<dyn Iterator<Item = KvEntry> + 'a>,
}

impl<'a> KvCursor<'a> {
    pub fn new(inner: impl Iterator<Item = KvEntry> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// A cursor over already materialized pairs.
    pub fn from_pairs(pairs: KvPairs) -> Self {
        Self::new(pairs.into_iter().map(Ok))
    }
}

impl Iterator for KvCursor<'_> {
    type Item = KvEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Core key-value store trait.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;
    fn exists(&self, key: &[u8]) -> Result<bool, StorageError>;
    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError>;

    /// Open a cursor over `prefix`. Backends without native cursors fall back
    /// to a materialized prefix scan.
    fn iterate(&self, prefix: &[u8]) -> Result<KvCursor<'_>, StorageError> {
        Ok(KvCursor::from_pairs(self.prefix_scan(prefix)?))
    }
}

/// Atomic batch writer trait.
pub trait BatchWriter: KvStore {
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError>;
}

/// Blanket implementation of KvStore for `Arc<S>` so that a store can be shared
/// across multiple owners (e.g. to inspect a store after a migrator consumed it).
impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).exists(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        (**self).prefix_scan(prefix)
    }

    fn iterate(&self, prefix: &[u8]) -> Result<KvCursor<'_>, StorageError> {
        (**self).iterate(prefix)
    }
}

impl<S: BatchWriter + ?Sized> BatchWriter for Arc<S> {
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        (**self).write_batch(ops)
    }
}

/// Type-erased store as returned by configuration.
impl KvStore for Box<dyn BatchWriter> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).exists(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        (**self).prefix_scan(prefix)
    }

    fn iterate(&self, prefix: &[u8]) -> Result<KvCursor<'_>, StorageError> {
        (**self).iterate(prefix)
    }
}

impl BatchWriter for Box<dyn BatchWriter> {
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        (**self).write_batch(ops)
    }
}
