mod common;

use common::{memory_store, task, task_layout};
use pretty_assertions::assert_eq;
use seqkeep_db::{DbError, SqliteStore, TableLayout};
use seqkeep_engine::{RecordStore, Scope, SequenceQuery};
use seqkeep_model::{FieldValue, Record};
use serde_json::json;

fn list(id: i64) -> Scope {
    Scope::whole("seq").with("list_id", id)
}

fn seqs(rows: &[Record]) -> Vec<i64> {
    rows.iter().filter_map(|r| r.get_i64("seq")).collect()
}

fn with_seq(mut record: Record, seq: i64) -> Record {
    record.set("seq", seq);
    record
}

// ── Schema and layout ────────────────────────────────────────────

#[test]
fn open_in_memory_starts_empty() {
    let store = memory_store();
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(store.layout(), &task_layout());
}

#[test]
fn layout_from_config() {
    let layout = task_layout();
    assert_eq!(layout.table, "tasks");
    assert_eq!(layout.key_column, "id");
    assert_eq!(layout.sequence_column, "seq");
    assert_eq!(layout.group_columns, vec!["list_id".to_string()]);
}

#[test]
fn colliding_columns_are_rejected() {
    let result = SqliteStore::open_in_memory(TableLayout::new("tasks", "data"));
    assert!(matches!(result, Err(DbError::Layout(_))));

    let result = SqliteStore::open_in_memory(
        TableLayout::new("tasks", "seq").with_group_column("seq"),
    );
    assert!(matches!(result, Err(DbError::Layout(_))));
}

#[test]
fn odd_identifiers_are_quoted() {
    let layout = TableLayout::new("my \"odd\" table", "order")
        .with_key_column("key")
        .with_group_column("list id");
    let store = SqliteStore::open_in_memory(layout).unwrap();

    let record = Record::new("task", json!({"list id": "a b", "order": 1}));
    store.persist(&record).unwrap();

    let scope = Scope::whole("order").with("list id", "a b");
    assert_eq!(store.max_sequence(&scope).unwrap(), Some(1));
    assert_eq!(store.load(&record.id).unwrap(), Some(record));
}

// ── Persist / load ───────────────────────────────────────────────

#[test]
fn persist_and_load_round_trip() {
    let store = memory_store();
    let record = with_seq(task(1, "write docs"), 3);
    store.persist(&record).unwrap();

    let loaded = store.load(&record.id).unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn unassigned_sequence_loads_without_field() {
    let store = memory_store();
    let record = task(1, "draft");
    store.persist(&record).unwrap();

    let loaded = store.load(&record.id).unwrap().unwrap();
    assert_eq!(loaded.get("seq"), None);
    assert_eq!(loaded.get_str("title"), Some("draft"));
}

#[test]
fn persist_replaces_existing_row() {
    let store = memory_store();
    let mut record = with_seq(task(1, "a"), 1);
    store.persist(&record).unwrap();
    record.set("title", "b");
    store.persist(&record).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let loaded = store.load(&record.id).unwrap().unwrap();
    assert_eq!(loaded.get_str("title"), Some("b"));
}

#[test]
fn delete_removes_row() {
    let store = memory_store();
    let record = with_seq(task(1, "a"), 1);
    store.persist(&record).unwrap();
    store.delete(&record).unwrap();
    assert_eq!(store.load(&record.id).unwrap(), None);
}

#[test]
fn list_filters_by_entity_type() {
    let store = memory_store();
    store.persist(&with_seq(task(1, "a"), 1)).unwrap();
    store
        .persist(&Record::new("note", json!({"list_id": 1, "seq": 2})))
        .unwrap();

    assert_eq!(store.list("task").unwrap().len(), 1);
    assert_eq!(store.list("note").unwrap().len(), 1);
    assert!(store.list("tag").unwrap().is_empty());
}

// ── Queries ──────────────────────────────────────────────────────

fn seeded() -> SqliteStore {
    let store = memory_store();
    for (list_id, seq) in [(1, 3), (1, 1), (1, 2), (2, 1), (2, 2)] {
        store
            .persist(&with_seq(task(list_id, &format!("{list_id}-{seq}")), seq))
            .unwrap();
    }
    store
}

#[test]
fn max_sequence_per_partition() {
    let store = seeded();
    assert_eq!(store.max_sequence(&list(1)).unwrap(), Some(3));
    assert_eq!(store.max_sequence(&list(2)).unwrap(), Some(2));
    assert_eq!(store.max_sequence(&list(9)).unwrap(), None);
}

#[test]
fn find_respects_bounds_order_and_limit() {
    let store = seeded();

    let all = store.find(&SequenceQuery::new(list(1))).unwrap();
    assert_eq!(seqs(&all), vec![1, 2, 3]);

    let above = store.find(&SequenceQuery::new(list(1)).above(1)).unwrap();
    assert_eq!(seqs(&above), vec![2, 3]);

    let window = store
        .find(&SequenceQuery::new(list(1)).at_least(2).at_most(2))
        .unwrap();
    assert_eq!(seqs(&window), vec![2]);

    let last = store
        .first(&SequenceQuery::new(list(1)).below(3).descending())
        .unwrap()
        .unwrap();
    assert_eq!(last.get_i64("seq"), Some(2));
}

#[test]
fn null_group_key_is_its_own_partition() {
    let store = seeded();
    let orphan = with_seq(Record::new("task", json!({"title": "orphan"})), 1);
    store.persist(&orphan).unwrap();

    let scope = Scope::whole("seq").with("list_id", FieldValue::Null);
    let rows = store.find(&SequenceQuery::new(scope.clone())).unwrap();
    assert_eq!(rows, vec![orphan]);
    assert_eq!(store.max_sequence(&scope).unwrap(), Some(1));
}

#[test]
fn group_keys_of_different_json_types_stay_apart() {
    let store = memory_store();
    for (key, seq) in [(json!(1), 1), (json!(true), 2), (json!("1"), 3), (json!(1.5), 4)] {
        store
            .persist(&Record::new("task", json!({"list_id": key, "seq": seq})))
            .unwrap();
    }

    for (key, seq) in [
        (FieldValue::Int(1), 1),
        (FieldValue::Bool(true), 2),
        (FieldValue::from("1"), 3),
        (FieldValue::Number("1.5".into()), 4),
    ] {
        let scope = Scope::whole("seq").with("list_id", key);
        assert_eq!(store.max_sequence(&scope).unwrap(), Some(seq));
        assert_eq!(store.find(&SequenceQuery::new(scope)).unwrap().len(), 1);
    }
}

#[test]
fn typed_scope_filters_entity_type() {
    let store = seeded();
    store
        .persist(&Record::new("note", json!({"list_id": 1, "seq": 7})))
        .unwrap();

    assert_eq!(store.max_sequence(&list(1)).unwrap(), Some(7));
    assert_eq!(store.max_sequence(&list(1).of_type("task")).unwrap(), Some(3));

    let shifted = store
        .shift(&SequenceQuery::new(list(1).of_type("note")), 1)
        .unwrap();
    assert_eq!(shifted, 1);
    assert_eq!(
        seqs(&store.find(&SequenceQuery::new(list(1).of_type("task"))).unwrap()),
        vec![1, 2, 3]
    );
    assert_eq!(store.max_sequence(&list(1).of_type("note")).unwrap(), Some(8));
}

#[test]
fn bounded_queries_skip_unassigned_rows() {
    let store = seeded();
    store.persist(&task(1, "unassigned")).unwrap();

    assert_eq!(store.find(&SequenceQuery::new(list(1))).unwrap().len(), 4);
    assert_eq!(
        store.find(&SequenceQuery::new(list(1)).above(0)).unwrap().len(),
        3
    );
}

#[test]
fn shift_moves_only_matching_rows() {
    let store = seeded();
    let changed = store
        .shift(&SequenceQuery::new(list(1)).at_least(2), 5)
        .unwrap();
    assert_eq!(changed, 2);

    assert_eq!(seqs(&store.find(&SequenceQuery::new(list(1))).unwrap()), vec![1, 7, 8]);
    assert_eq!(seqs(&store.find(&SequenceQuery::new(list(2))).unwrap()), vec![1, 2]);
}

#[test]
fn scope_outside_layout_is_an_error() {
    let store = seeded();

    let err = store.max_sequence(&Scope::whole("position")).unwrap_err();
    assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Layout(_))));

    let err = store
        .find(&SequenceQuery::new(Scope::whole("seq").with("tenant", "acme")))
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Layout(_))));
}

// ── Transactions ─────────────────────────────────────────────────

#[test]
fn rollback_discards_writes() {
    let store = seeded();
    store.begin().unwrap();
    store.shift(&SequenceQuery::new(list(1)), 10).unwrap();
    store.persist(&with_seq(task(1, "extra"), 4)).unwrap();
    store.rollback().unwrap();

    assert_eq!(store.count().unwrap(), 5);
    assert_eq!(seqs(&store.find(&SequenceQuery::new(list(1))).unwrap()), vec![1, 2, 3]);
}

#[test]
fn commit_keeps_writes() {
    let store = seeded();
    store.begin().unwrap();
    store.persist(&with_seq(task(1, "extra"), 4)).unwrap();
    store.commit().unwrap();
    assert_eq!(store.max_sequence(&list(1)).unwrap(), Some(4));
}

#[test]
fn nested_begin_fails() {
    let store = memory_store();
    store.begin().unwrap();
    let err = store.begin().unwrap_err();
    assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Database(_))));
    store.rollback().unwrap();
    assert!(store.commit().is_err());
}

// ── On disk ──────────────────────────────────────────────────────

#[test]
fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seq.db");
    let record = with_seq(task(1, "kept"), 1);

    {
        let store = SqliteStore::open(&path, task_layout()).unwrap();
        store.persist(&record).unwrap();
    }

    let store = SqliteStore::open(&path, task_layout()).unwrap();
    assert_eq!(store.load(&record.id).unwrap(), Some(record));
}
