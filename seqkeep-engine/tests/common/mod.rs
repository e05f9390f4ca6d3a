//! Shared fixtures for engine tests.

#![allow(dead_code)]

use seqkeep_engine::{MemoryStore, SequenceEngine};
use seqkeep_model::{JsonFieldAccessor, Record, SequenceAccessor, SequenceConfig};
use serde_json::{json, Value};

pub type Store = MemoryStore<Record, JsonFieldAccessor>;
pub type Engine<'a> = SequenceEngine<'a, Record, JsonFieldAccessor, Store>;

/// Installs a test-writer subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Fixture {
    pub config: SequenceConfig,
    pub accessor: JsonFieldAccessor,
    pub store: Store,
}

impl Fixture {
    pub fn new(config: SequenceConfig) -> Self {
        init_tracing();
        let accessor = JsonFieldAccessor::for_config(&config);
        let store = MemoryStore::new(accessor.clone());
        Self {
            config,
            accessor,
            store,
        }
    }

    /// Ungrouped, 0-based, no boundary errors.
    pub fn plain() -> Self {
        Self::new(SequenceConfig::default())
    }

    /// Grouped by `list_id`.
    pub fn grouped() -> Self {
        Self::new(SequenceConfig {
            group: vec!["list_id".into()],
            ..SequenceConfig::default()
        })
    }

    pub fn engine(&self) -> Engine<'_> {
        SequenceEngine::new(&self.config, &self.accessor, &self.store)
    }

    /// Inserts a record with the given title and extra attributes.
    pub fn add(&self, title: &str, extra: Value) -> Record {
        let mut data = json!({ "title": title });
        if let (Some(map), Value::Object(extra)) = (data.as_object_mut(), extra) {
            map.extend(extra);
        }
        let mut record = Record::new("task", data);
        self.engine().insert(&mut record).unwrap();
        record
    }

    /// Inserts `n` records titled `t0..t{n-1}` into the global partition.
    pub fn add_many(&self, n: usize) -> Vec<Record> {
        (0..n).map(|i| self.add(&format!("t{i}"), json!({}))).collect()
    }

    /// Inserts `n` records into list `list_id`, titled `<prefix>0..`.
    pub fn add_to_list(&self, list_id: i64, prefix: &str, n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| self.add(&format!("{prefix}{i}"), json!({ "list_id": list_id })))
            .collect()
    }

    /// Fresh copy of a record from the store.
    pub fn reload(&self, record: &Record) -> Record {
        self.store.get(&record.id).unwrap().expect("record exists")
    }

    pub fn seq(&self, record: &Record) -> Option<i64> {
        self.accessor.sequence(&self.reload(record))
    }

    /// `(title, seq)` pairs for one list (or all rows when `None`), in
    /// sequence order.
    pub fn order(&self, list_id: Option<i64>) -> Vec<(String, i64)> {
        let mut rows: Vec<(String, i64)> = self
            .store
            .rows()
            .unwrap()
            .into_iter()
            .filter(|r| list_id.is_none_or(|id| r.get_i64("list_id") == Some(id)))
            .map(|r| {
                let seq = self.accessor.sequence(&r).unwrap_or(0);
                (r.get_str("title").unwrap_or_default().to_string(), seq)
            })
            .collect();
        rows.sort_by_key(|(_, seq)| *seq);
        rows
    }

    /// Titles in sequence order.
    pub fn titles(&self, list_id: Option<i64>) -> Vec<String> {
        self.order(list_id).into_iter().map(|(t, _)| t).collect()
    }

    /// Sequence values in order.
    pub fn sequences(&self, list_id: Option<i64>) -> Vec<i64> {
        self.order(list_id).into_iter().map(|(_, s)| s).collect()
    }
}

pub fn titles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
