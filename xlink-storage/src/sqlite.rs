use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StorageError;
use crate::traits::{BatchOp, BatchWriter, KvPairs, KvStore};

const UPSERT: &str = "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)";
const DELETE: &str = "DELETE FROM kv WHERE key = ?1";

/// SQLite-backed key-value store.
/// Uses a single `kv` table with BLOB key and BLOB value columns. Cursors are
/// served from a materialized prefix scan so no statement outlives its lock.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given path.
    /// Use `:memory:` for an in-memory database.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key BLOB PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|e| StorageError::SqliteError {
            reason: format!("connection lock poisoned: {}", e),
        })
    }
}

fn read_pair(row: &Row<'_>) -> rusqlite::Result<(Vec<u8>, Vec<u8>)> {
    Ok((row.get(0)?, row.get(1)?))
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let conn = self.lock()?;
        let value = conn
            .prepare_cached("SELECT value FROM kv WHERE key = ?1")?
            .query_row(params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.lock()?.execute(UPSERT, params![key, value])?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.lock()?.execute(DELETE, params![key])?;
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let found = conn
            .prepare_cached("SELECT 1 FROM kv WHERE key = ?1")?
            .exists(params![key])?;
        Ok(found)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        let conn = self.lock()?;
        // Without an upper bound every key at or after the prefix extends it.
        let upper = increment_prefix(prefix);
        let mut stmt = conn.prepare_cached(
            "SELECT key, value FROM kv WHERE key >= ?1 AND (?2 IS NULL OR key < ?2) ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix, upper], read_pair)?;
        let pairs = rows.collect::<Result<KvPairs, _>>()?;
        Ok(pairs)
    }
}

impl BatchWriter for SqliteStore {
    /// Applies every op in one transaction, in order.
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for op in &ops {
            match op {
                BatchOp::Put { key, value } => tx.execute(UPSERT, params![key, value])?,
                BatchOp::Delete { key } => tx.execute(DELETE, params![key])?,
            };
        }
        tx.commit()?;
        tracing::trace!(ops = ops.len(), "sqlite batch committed");
        Ok(())
    }
}

/// Smallest key greater than every key starting with `prefix`, or `None`
/// when the prefix is empty or all `0xff`.
fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let last = prefix.iter().rposition(|&b| b < 0xff)?;
    let mut upper = prefix[..=last].to_vec();
    upper[last] += 1;
    Some(upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlink_types::keys::{
        chain_link_key, chain_link_owner_key, chain_link_owner_prefix, default_external_address_key,
        user_chain_links_prefix, SCHEMA_VERSION_KEY,
    };
    use xlink_types::primitives::SENTINEL;

    fn make_store() -> SqliteStore {
        SqliteStore::new(":memory:").unwrap()
    }

    #[test]
    fn test_owner_index_roundtrip() {
        let store = make_store();
        let key = chain_link_owner_key("cosmos", "cosmos1abc", "desmos1alice");
        assert!(!store.exists(&key).unwrap());

        store.put(&key, SENTINEL).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(SENTINEL.to_vec()));
        assert!(store.exists(&key).unwrap());

        store.delete(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        // Deleting twice is not an error.
        store.delete(&key).unwrap();
    }

    #[test]
    fn test_default_address_is_overwritten() {
        let store = make_store();
        let key = default_external_address_key("desmos1alice", "cosmos");
        store.put(&key, b"cosmos1old").unwrap();
        store.put(&key, b"cosmos1new").unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(b"cosmos1new".to_vec()));
    }

    #[test]
    fn test_prefix_scan_respects_separator() {
        let store = make_store();
        store.put(&chain_link_key("alice", "cosmos", "a1"), b"1").unwrap();
        store.put(&chain_link_key("alice", "osmosis", "a2"), b"2").unwrap();
        store.put(&chain_link_key("alice2", "cosmos", "a3"), b"3").unwrap();

        let results = store.prefix_scan(&user_chain_links_prefix("alice")).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, b"1".to_vec());
        assert_eq!(results[1].1, b"2".to_vec());
    }

    #[test]
    fn test_prefix_scan_all_ff_prefix() {
        let store = make_store();
        store.put(&[0xff, 0xff, 0x01], b"1").unwrap();
        store.put(&[0xfe], b"2").unwrap();
        let results = store.prefix_scan(&[0xff, 0xff]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(store.prefix_scan(&[]).unwrap().len(), 2);
    }

    #[test]
    fn test_iterate_falls_back_to_scan() {
        let store = make_store();
        store
            .put(&chain_link_owner_key("cosmos", "addr", "bob"), SENTINEL)
            .unwrap();
        store
            .put(&chain_link_owner_key("cosmos", "addr", "alice"), SENTINEL)
            .unwrap();
        let keys: Vec<Vec<u8>> = store
            .iterate(&chain_link_owner_prefix("cosmos", "addr"))
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(
            keys,
            vec![
                chain_link_owner_key("cosmos", "addr", "alice"),
                chain_link_owner_key("cosmos", "addr", "bob"),
            ]
        );
    }

    #[test]
    fn test_batch_applies_in_order() {
        let store = make_store();
        let old = chain_link_key("alice", "cosmos", "a1");
        let new = chain_link_key("alice", "cosmos", "a2");
        store.put(&old, b"link").unwrap();
        store
            .write_batch(vec![
                BatchOp::Delete { key: old.clone() },
                BatchOp::Put {
                    key: new.clone(),
                    value: b"link".to_vec(),
                },
                BatchOp::Put {
                    key: SCHEMA_VERSION_KEY.to_vec(),
                    value: vec![4, 0, 0, 0],
                },
            ])
            .unwrap();
        assert_eq!(store.get(&old).unwrap(), None);
        assert_eq!(store.get(&new).unwrap(), Some(b"link".to_vec()));
        assert_eq!(store.get(SCHEMA_VERSION_KEY).unwrap(), Some(vec![4, 0, 0, 0]));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.db");
        let path = path.to_str().unwrap();
        {
            let store = SqliteStore::new(path).unwrap();
            store.put(SCHEMA_VERSION_KEY, &[6, 0, 0, 0]).unwrap();
        }
        let store = SqliteStore::new(path).unwrap();
        assert_eq!(store.get(SCHEMA_VERSION_KEY).unwrap(), Some(vec![6, 0, 0, 0]));
    }

    #[test]
    fn test_increment_prefix() {
        assert_eq!(increment_prefix(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(increment_prefix(&[0x01, 0xff]), Some(vec![0x02]));
        assert_eq!(increment_prefix(&[0xff]), None);
        assert_eq!(increment_prefix(&[]), None);
    }
}
