//! Shared fixtures for SQLite store tests.

#![allow(dead_code)]

use seqkeep_db::{SqliteStore, TableLayout};
use seqkeep_engine::SequenceEngine;
use seqkeep_model::{JsonFieldAccessor, Record, SequenceConfig};
use serde_json::json;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Tasks ordered by `seq` within each `list_id`.
pub fn task_config() -> SequenceConfig {
    SequenceConfig {
        group: vec!["list_id".into()],
        ..SequenceConfig::default()
    }
}

pub fn task_layout() -> TableLayout {
    TableLayout::for_config("tasks", &task_config())
}

pub fn memory_store() -> SqliteStore {
    init_tracing();
    SqliteStore::open_in_memory(task_layout()).unwrap()
}

pub fn task(list_id: i64, title: &str) -> Record {
    Record::new("task", json!({ "title": title, "list_id": list_id }))
}

/// Config, accessor and store bundled so tests can build engines cheaply.
pub struct Tasks {
    pub config: SequenceConfig,
    pub accessor: JsonFieldAccessor,
    pub store: SqliteStore,
}

impl Tasks {
    pub fn new(store: SqliteStore) -> Self {
        let config = task_config();
        Self {
            accessor: JsonFieldAccessor::for_config(&config),
            config,
            store,
        }
    }

    pub fn engine(&self) -> SequenceEngine<'_, Record, JsonFieldAccessor, SqliteStore> {
        SequenceEngine::new(&self.config, &self.accessor, &self.store)
    }

    pub fn add(&self, list_id: i64, title: &str) -> Record {
        let mut record = task(list_id, title);
        self.engine().insert(&mut record).unwrap();
        record
    }

    pub fn add_many(&self, list_id: i64, prefix: &str, n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| self.add(list_id, &format!("{prefix}{i}")))
            .collect()
    }

    pub fn reload(&self, record: &Record) -> Record {
        self.store.load(&record.id).unwrap().expect("record exists")
    }

    /// `(title, seq)` pairs of one list in sequence order.
    pub fn order(&self, list_id: i64) -> Vec<(String, i64)> {
        self.store
            .list("task")
            .unwrap()
            .into_iter()
            .filter(|r| r.get_i64("list_id") == Some(list_id))
            .map(|r| {
                (
                    r.get_str("title").unwrap_or_default().to_string(),
                    r.get_i64("seq").unwrap_or(0),
                )
            })
            .collect()
    }

    pub fn titles(&self, list_id: i64) -> Vec<String> {
        self.order(list_id).into_iter().map(|(t, _)| t).collect()
    }

    pub fn sequences(&self, list_id: i64) -> Vec<i64> {
        self.order(list_id).into_iter().map(|(_, s)| s).collect()
    }
}

pub fn titles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
