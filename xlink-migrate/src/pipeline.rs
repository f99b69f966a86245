//! Passes, steps and the watermark-driven migrator.
//!
//! A pass rewrites every record under one key prefix through a pure
//! [`RecordTransform`]. A step is an ordered list of passes that moves the
//! store from one schema version to the next. The [`Migrator`] runs the steps
//! in order and persists the schema version under [`SCHEMA_VERSION_KEY`].
//! Every pass of a step is planned before anything is written, and the step
//! lands as one batch together with its new version.

use std::collections::{HashMap, HashSet};

use borsh::BorshDeserialize;

use xlink_storage::error::StorageError;
use xlink_storage::traits::{BatchOp, BatchWriter, KvStore};
use xlink_types::keys::{display_key, SCHEMA_VERSION_KEY};
use xlink_types::primitives::SENTINEL;

use crate::error::MigrationError;

/// Version assumed for a store that carries no watermark.
pub const BASE_SCHEMA_VERSION: u32 = 1;

/// An index entry written alongside a kept record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl IndexEntry {
    /// Pure index entry whose value is the `0x01` sentinel.
    pub fn sentinel(key: Vec<u8>) -> Self {
        Self {
            key,
            value: SENTINEL.to_vec(),
        }
    }

    /// Index entry pointing at another record's key.
    pub fn pointer(key: Vec<u8>, target: Vec<u8>) -> Self {
        Self { key, value: target }
    }
}

/// What a transform decided for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Write `value` at `key` (deleting the source key if it differs) plus
    /// every index entry.
    Keep {
        key: Vec<u8>,
        value: Vec<u8>,
        index: Vec<IndexEntry>,
    },
    /// Delete the source record.
    Drop { reason: String },
}

impl Outcome {
    pub fn keep(key: Vec<u8>, value: Vec<u8>) -> Self {
        Outcome::Keep {
            key,
            value,
            index: Vec::new(),
        }
    }

    pub fn drop(reason: impl Into<String>) -> Self {
        Outcome::Drop {
            reason: reason.into(),
        }
    }
}

/// One pass of a migration step.
pub trait RecordTransform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Key prefix of the records this pass visits.
    fn namespace(&self) -> Vec<u8>;

    /// Rewrite a single record. Must not touch the store; an error aborts
    /// the whole step.
    fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub name: &'static str,
    pub namespace: String,
    pub visited: usize,
    pub rewritten: usize,
    pub dropped: usize,
    pub index_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: &'static str,
    pub from: u32,
    pub to: u32,
    pub passes: Vec<PassReport>,
}

impl StepReport {
    pub fn visited(&self) -> usize {
        self.passes.iter().map(|p| p.visited).sum()
    }

    pub fn dropped(&self) -> usize {
        self.passes.iter().map(|p| p.dropped).sum()
    }
}

fn collision(key: &[u8]) -> MigrationError {
    MigrationError::KeyCollision {
        key: display_key(key),
    }
}

/// Read and transform every record of a pass and return the batch that
/// applies it, deletes first. Nothing is written.
pub fn plan_pass<S: KvStore + ?Sized>(
    store: &S,
    pass: &dyn RecordTransform,
) -> Result<(Vec<BatchOp>, PassReport), MigrationError> {
    let namespace = pass.namespace();
    let mut report = PassReport {
        name: pass.name(),
        namespace: display_key(&namespace),
        ..Default::default()
    };

    let mut records = Vec::new();
    {
        let cursor = store.iterate(&namespace)?;
        for entry in cursor {
            let (key, value) = entry?;
            let outcome = pass.transform(&key, &value)?;
            records.push((key, outcome));
        }
    }

    let sources: HashSet<&[u8]> = records.iter().map(|(key, _)| key.as_slice()).collect();
    let mut destinations: HashSet<&[u8]> = HashSet::new();
    let mut index_values: HashMap<&[u8], &[u8]> = HashMap::new();
    let mut deletes = Vec::new();
    let mut puts = Vec::new();

    for (source, outcome) in &records {
        report.visited += 1;
        match outcome {
            Outcome::Drop { reason } => {
                tracing::debug!(
                    pass = pass.name(),
                    key = %display_key(source),
                    reason = %reason,
                    "dropping record"
                );
                report.dropped += 1;
                deletes.push(BatchOp::Delete {
                    key: source.clone(),
                });
            }
            Outcome::Keep { key, value, index } => {
                if !destinations.insert(key.as_slice())
                    || index_values.contains_key(key.as_slice())
                    || (!sources.contains(key.as_slice()) && store.exists(key)?)
                {
                    return Err(collision(key));
                }
                if key != source {
                    deletes.push(BatchOp::Delete {
                        key: source.clone(),
                    });
                }
                puts.push(BatchOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                });
                report.rewritten += 1;

                for entry in index {
                    if destinations.contains(entry.key.as_slice()) {
                        return Err(collision(&entry.key));
                    }
                    if let Some(existing) = index_values.get(entry.key.as_slice()) {
                        if *existing != entry.value.as_slice() {
                            return Err(collision(&entry.key));
                        }
                        continue;
                    }
                    if !sources.contains(entry.key.as_slice()) {
                        if let Some(existing) = store.get(&entry.key)? {
                            if existing != entry.value {
                                return Err(collision(&entry.key));
                            }
                        }
                    }
                    index_values.insert(entry.key.as_slice(), entry.value.as_slice());
                    puts.push(BatchOp::Put {
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                    });
                    report.index_entries += 1;
                }
            }
        }
    }

    deletes.extend(puts);
    Ok((deletes, report))
}

/// Plan a pass and apply it as one batch.
pub fn run_pass<S: BatchWriter + ?Sized>(
    store: &S,
    pass: &dyn RecordTransform,
) -> Result<PassReport, MigrationError> {
    let (ops, report) = plan_pass(store, pass)?;
    store.write_batch(ops)?;
    log_pass(&report);
    Ok(report)
}

fn log_pass(report: &PassReport) {
    tracing::info!(
        pass = report.name,
        namespace = %report.namespace,
        visited = report.visited,
        rewritten = report.rewritten,
        dropped = report.dropped,
        index_entries = report.index_entries,
        "migration pass complete"
    );
}

/// Plan every pass of a step against the store as it stood before the step
/// and join them into one batch, deletes first. A pass may not touch a key an
/// earlier pass of the same step writes, unless it writes the same value.
fn plan_step<S: KvStore + ?Sized>(
    store: &S,
    step: &MigrationStep,
) -> Result<(Vec<BatchOp>, Vec<PassReport>), MigrationError> {
    let mut written: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    let mut removed: HashSet<Vec<u8>> = HashSet::new();
    let mut deletes = Vec::new();
    let mut puts = Vec::new();
    let mut reports = Vec::with_capacity(step.passes.len());

    for pass in &step.passes {
        let (ops, report) = plan_pass(store, pass.as_ref())?;
        for op in ops {
            match op {
                BatchOp::Delete { key } => {
                    if written.contains_key(&key) {
                        return Err(collision(&key));
                    }
                    if removed.insert(key.clone()) {
                        deletes.push(BatchOp::Delete { key });
                    }
                }
                BatchOp::Put { key, value } => {
                    match written.get(&key) {
                        Some(existing) if *existing == value => continue,
                        Some(_) => return Err(collision(&key)),
                        None => {}
                    }
                    written.insert(key.clone(), value.clone());
                    puts.push(BatchOp::Put { key, value });
                }
            }
        }
        reports.push(report);
    }

    deletes.extend(puts);
    Ok((deletes, reports))
}

/// A named transition between two schema versions.
pub struct MigrationStep {
    pub name: &'static str,
    pub from: u32,
    pub to: u32,
    pub passes: Vec<Box<dyn RecordTransform>>,
}

impl MigrationStep {
    pub fn new(name: &'static str, from: u32, to: u32) -> Self {
        Self {
            name,
            from,
            to,
            passes: Vec::new(),
        }
    }

    pub fn with_pass(mut self, pass: impl RecordTransform + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }
}

/// Runs migration steps in order against a store, tracking the schema
/// version watermark.
pub struct Migrator<S: BatchWriter> {
    store: S,
    steps: Vec<MigrationStep>,
}

impl<S: BatchWriter> Migrator<S> {
    pub fn new(store: S, steps: Vec<MigrationStep>) -> Self {
        Self { store, steps }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Newest schema version the configured steps reach.
    pub fn latest_version(&self) -> u32 {
        self.steps.last().map_or(BASE_SCHEMA_VERSION, |s| s.to)
    }

    /// The persisted schema version. A store without one is treated as the
    /// base version.
    pub fn current_version(&self) -> Result<u32, MigrationError> {
        match self.store.get(SCHEMA_VERSION_KEY)? {
            Some(bytes) => u32::try_from_slice(&bytes).map_err(|e| {
                MigrationError::Storage(StorageError::DeserializationError {
                    reason: format!("failed to read schema version: {}", e),
                })
            }),
            None => {
                tracing::warn!(
                    "store has no schema version, assuming v{}",
                    BASE_SCHEMA_VERSION
                );
                Ok(BASE_SCHEMA_VERSION)
            }
        }
    }

    /// Migrate to the newest version.
    pub fn run(&self) -> Result<Vec<StepReport>, MigrationError> {
        self.run_to(self.latest_version())
    }

    /// Run every pending step up to `target`. A store already at `target`
    /// is left untouched.
    pub fn run_to(&self, target: u32) -> Result<Vec<StepReport>, MigrationError> {
        let latest = self.latest_version();
        if target > latest {
            return Err(MigrationError::UnknownVersion {
                version: target,
                latest,
            });
        }
        let mut current = self.current_version()?;
        if current > latest {
            return Err(MigrationError::UnknownVersion {
                version: current,
                latest,
            });
        }

        let mut reports = Vec::new();
        for step in &self.steps {
            if current >= target || step.to > target {
                break;
            }
            if step.to <= current {
                continue;
            }
            if step.from != current || step.to <= step.from {
                return Err(MigrationError::VersionGap {
                    expected: current,
                    found: step.from,
                });
            }
            reports.push(self.run_step(step)?);
            current = step.to;
        }

        if current < target {
            return Err(MigrationError::VersionGap {
                expected: current,
                found: target,
            });
        }
        if reports.is_empty() {
            tracing::info!(version = current, "schema is up to date");
        }
        Ok(reports)
    }

    fn run_step(&self, step: &MigrationStep) -> Result<StepReport, MigrationError> {
        tracing::info!(
            step = step.name,
            from = step.from,
            to = step.to,
            "running migration step"
        );
        let watermark = BatchOp::Put {
            key: SCHEMA_VERSION_KEY.to_vec(),
            value: borsh::to_vec(&step.to).map_err(|e| {
                MigrationError::Storage(StorageError::SerializationError {
                    reason: e.to_string(),
                })
            })?,
        };

        let (mut ops, passes) = plan_step(&self.store, step)?;
        ops.push(watermark);
        self.store.write_batch(ops)?;
        for pass in &passes {
            log_pass(pass);
        }

        let report = StepReport {
            name: step.name,
            from: step.from,
            to: step.to,
            passes,
        };
        tracing::info!(
            step = report.name,
            visited = report.visited(),
            dropped = report.dropped(),
            "migration step complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use xlink_storage::memory::MemoryStore;
    use xlink_types::keys::namespace;

    /// Helper: uppercases values in the `ns` namespace.
    struct Uppercase;

    impl RecordTransform for Uppercase {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn namespace(&self) -> Vec<u8> {
            namespace(b"ns")
        }

        fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
            Ok(Outcome::keep(key.to_vec(), value.to_ascii_uppercase()))
        }
    }

    /// Helper: uppercases values in the `other` namespace.
    struct UppercaseOther;

    impl RecordTransform for UppercaseOther {
        fn name(&self) -> &'static str {
            "uppercase-other"
        }

        fn namespace(&self) -> Vec<u8> {
            namespace(b"other")
        }

        fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
            Ok(Outcome::keep(key.to_vec(), value.to_ascii_uppercase()))
        }
    }

    /// Helper: moves every record to the key named by its value, dropping
    /// records whose value is empty, and indexes each moved record.
    struct MoveToValue;

    impl RecordTransform for MoveToValue {
        fn name(&self) -> &'static str {
            "move"
        }

        fn namespace(&self) -> Vec<u8> {
            namespace(b"ns")
        }

        fn transform(&self, key: &[u8], value: &[u8]) -> Result<Outcome, MigrationError> {
            if value.is_empty() {
                return Ok(Outcome::drop("empty"));
            }
            let mut index_key = b"idx\0".to_vec();
            index_key.extend_from_slice(value);
            Ok(Outcome::Keep {
                key: value.to_vec(),
                value: key.to_vec(),
                index: vec![IndexEntry::pointer(index_key, value.to_vec())],
            })
        }
    }

    /// Helper: fails on the first record it sees.
    struct Broken;

    impl RecordTransform for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn namespace(&self) -> Vec<u8> {
            namespace(b"ns")
        }

        fn transform(&self, key: &[u8], _value: &[u8]) -> Result<Outcome, MigrationError> {
            Err(MigrationError::Link {
                key: display_key(key),
                source: xlink_types::error::LinkError::decode("corrupt"),
            })
        }
    }

    fn version(store: &MemoryStore) -> Option<u32> {
        store
            .get(SCHEMA_VERSION_KEY)
            .unwrap()
            .map(|b| u32::try_from_slice(&b).unwrap())
    }

    #[test]
    fn test_pass_rewrites_in_place() {
        let store = MemoryStore::new();
        store.put(b"ns\0a", b"one").unwrap();
        store.put(b"other\0b", b"two").unwrap();

        let report = run_pass(&store, &Uppercase).unwrap();
        assert_eq!(report.visited, 1);
        assert_eq!(report.rewritten, 1);
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"ONE".to_vec()));
        assert_eq!(store.get(b"other\0b").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_pass_moves_drops_and_indexes() {
        let store = MemoryStore::new();
        store.put(b"ns\0a", b"ns\0z").unwrap();
        store.put(b"ns\0b", b"").unwrap();

        let report = run_pass(&store, &MoveToValue).unwrap();
        assert_eq!(report.visited, 2);
        assert_eq!(report.rewritten, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.index_entries, 1);
        assert_eq!(store.get(b"ns\0a").unwrap(), None);
        assert_eq!(store.get(b"ns\0b").unwrap(), None);
        assert_eq!(store.get(b"ns\0z").unwrap(), Some(b"ns\0a".to_vec()));
        assert_eq!(store.get(b"idx\0ns\0z").unwrap(), Some(b"ns\0z".to_vec()));
    }

    #[test]
    fn test_swapped_keys_survive_deletes_first() {
        let store = MemoryStore::new();
        store.put(b"ns\0a", b"ns\0b").unwrap();
        store.put(b"ns\0b", b"ns\0a").unwrap();

        run_pass(&store, &MoveToValue).unwrap();
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"ns\0b".to_vec()));
        assert_eq!(store.get(b"ns\0b").unwrap(), Some(b"ns\0a".to_vec()));
    }

    #[test]
    fn test_duplicate_destination_aborts() {
        let store = MemoryStore::new();
        store.put(b"ns\0a", b"ns\0z").unwrap();
        store.put(b"ns\0b", b"ns\0z").unwrap();

        assert!(matches!(
            run_pass(&store, &MoveToValue),
            Err(MigrationError::KeyCollision { .. })
        ));
        // Nothing was written.
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"ns\0z".to_vec()));
        assert_eq!(store.get(b"ns\0z").unwrap(), None);
    }

    #[test]
    fn test_occupied_destination_aborts() {
        let store = MemoryStore::new();
        store.put(b"ns\0a", b"taken").unwrap();
        store.put(b"taken", b"existing").unwrap();

        assert!(matches!(
            run_pass(&store, &MoveToValue),
            Err(MigrationError::KeyCollision { .. })
        ));
        assert_eq!(store.get(b"taken").unwrap(), Some(b"existing".to_vec()));
    }

    #[test]
    fn test_transform_error_aborts_pass() {
        let store = MemoryStore::new();
        store.put(b"ns\0a", b"x").unwrap();
        assert!(matches!(
            run_pass(&store, &Broken),
            Err(MigrationError::Link { .. })
        ));
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"x".to_vec()));
    }

    fn two_steps() -> Vec<MigrationStep> {
        vec![
            MigrationStep::new("uppercase", 1, 2).with_pass(Uppercase),
            MigrationStep::new("noop", 2, 3),
        ]
    }

    #[test]
    fn test_migrator_runs_all_steps_and_writes_watermark() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"ns\0a", b"one").unwrap();

        let migrator = Migrator::new(store.clone(), two_steps());
        assert_eq!(migrator.current_version().unwrap(), 1);
        let reports = migrator.run().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].passes[0].rewritten, 1);
        assert_eq!(version(&store), Some(3));
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"ONE".to_vec()));

        // Second run is a no-op.
        assert!(migrator.run().unwrap().is_empty());
        assert_eq!(version(&store), Some(3));
    }

    #[test]
    fn test_migrator_stops_at_target() {
        let store = Arc::new(MemoryStore::new());
        let migrator = Migrator::new(store.clone(), two_steps());
        let reports = migrator.run_to(2).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(version(&store), Some(2));
        assert_eq!(migrator.run().unwrap().len(), 1);
        assert_eq!(version(&store), Some(3));
    }

    #[test]
    fn test_failed_step_keeps_watermark() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"ns\0a", b"x").unwrap();
        let steps = vec![
            MigrationStep::new("uppercase", 1, 2).with_pass(Uppercase),
            MigrationStep::new("broken", 2, 3).with_pass(Broken),
        ];
        let migrator = Migrator::new(store.clone(), steps);
        assert!(migrator.run().is_err());
        assert_eq!(version(&store), Some(2));
    }

    #[test]
    fn test_failed_pass_leaves_step_unapplied() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"ns\0a", b"x").unwrap();
        let steps = vec![MigrationStep::new("mixed", 1, 2)
            .with_pass(Uppercase)
            .with_pass(Broken)];
        let migrator = Migrator::new(store.clone(), steps);
        assert!(matches!(
            migrator.run(),
            Err(MigrationError::Link { .. })
        ));
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"x".to_vec()));
        assert_eq!(version(&store), None);
    }

    #[test]
    fn test_passes_of_a_step_commit_together() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"ns\0a", b"one").unwrap();
        store.put(b"other\0b", b"two").unwrap();
        let steps = vec![MigrationStep::new("two-passes", 1, 2)
            .with_pass(Uppercase)
            .with_pass(UppercaseOther)];
        let reports = Migrator::new(store.clone(), steps).run().unwrap();
        assert_eq!(reports[0].passes.len(), 2);
        assert_eq!(reports[0].visited(), 2);
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"ONE".to_vec()));
        assert_eq!(store.get(b"other\0b").unwrap(), Some(b"TWO".to_vec()));
        assert_eq!(version(&store), Some(2));
    }

    #[test]
    fn test_overlapping_passes_in_a_step_abort() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"ns\0a", b"ns\0z").unwrap();
        // Uppercase rewrites ns\0a, which MoveToValue then deletes.
        let steps = vec![MigrationStep::new("overlap", 1, 2)
            .with_pass(Uppercase)
            .with_pass(MoveToValue)];
        assert!(matches!(
            Migrator::new(store.clone(), steps).run(),
            Err(MigrationError::KeyCollision { .. })
        ));
        assert_eq!(store.get(b"ns\0a").unwrap(), Some(b"ns\0z".to_vec()));
        assert_eq!(version(&store), None);
    }

    #[test]
    fn test_version_gap() {
        let store = MemoryStore::new();
        let steps = vec![
            MigrationStep::new("first", 1, 2),
            MigrationStep::new("skips", 3, 4),
        ];
        let migrator = Migrator::new(store, steps);
        assert!(matches!(
            migrator.run(),
            Err(MigrationError::VersionGap {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_unknown_stored_version() {
        let store = MemoryStore::new();
        store
            .put(SCHEMA_VERSION_KEY, &borsh::to_vec(&9u32).unwrap())
            .unwrap();
        let migrator = Migrator::new(store, two_steps());
        assert!(matches!(
            migrator.run(),
            Err(MigrationError::UnknownVersion {
                version: 9,
                latest: 3
            })
        ));
    }

    #[test]
    fn test_unknown_target_version() {
        let migrator = Migrator::new(MemoryStore::new(), two_steps());
        assert!(matches!(
            migrator.run_to(7),
            Err(MigrationError::UnknownVersion { .. })
        ));
    }
}
