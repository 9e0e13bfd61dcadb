//! Event store behaviour through the public API.

mod test_data_gen;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use lcyield::core::types::ColumnData;
use lcyield::io::{MemoryStorage, Storage};
use lcyield::store::{Error, EventStore};
use test_data_gen::{memory, scratch_dir, write_columns};

/// 100 rows; `x` takes 0, 1.5, 3, 4.5 and 6 in turn, so 20 rows have x > 5.
fn hundred_rows(storage: &MemoryStorage) {
    let x: Vec<f64> = (0..100).map(|i| (i % 5) as f64 * 1.5).collect();
    let y: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let z: Vec<i32> = (0..100).map(|i| -i).collect();
    write_columns(
        storage,
        "events.rec",
        vec![
            ("x", ColumnData::F64(x)),
            ("y", ColumnData::F64(y)),
            ("z", ColumnData::I32(z)),
        ],
    );
}

fn open(storage: Arc<MemoryStorage>, scratch: &std::path::Path) -> EventStore {
    let mut store = EventStore::new("events", storage).with_scratch_dir(scratch);
    store.add("events.rec").unwrap();
    store
}

#[test]
fn filtered_copy_keeps_exactly_the_matching_rows() {
    let storage = memory();
    hundred_rows(&storage);
    let dir = scratch_dir();
    let mut store = open(storage.clone(), dir.path());
    store.activate_columns(["x", "y"], false).unwrap();

    let mut selected = store.copy_selected("x > 5").unwrap();
    assert_eq!(selected.entries(), 20);
    let copy = selected.store_mut();
    let x = copy.value_ref("x").unwrap();
    let mut seen = 0;
    for entry in copy.iterate() {
        entry.unwrap();
        assert!(x.f64() > 5.0);
        seen += 1;
    }
    assert_eq!(seen, 20);
    assert_eq!(store.count("x > 5").unwrap(), 20);
}

#[test]
fn only_activated_columns_are_readable() {
    let storage = memory();
    hundred_rows(&storage);
    let dir = scratch_dir();
    let mut store = open(storage, dir.path());
    store.activate_columns(["x", "y"], false).unwrap();
    store.set_entry(3).unwrap();
    assert_eq!(store.value("y").unwrap().as_f64(), 3.0);
    assert!(matches!(store.value("z"), Err(Error::InactiveColumn(_))));

    store.activate_columns(["z"], true).unwrap();
    assert_eq!(store.value("z").unwrap().as_i64(), -3);
    assert!(store.is_active("x"));

    store.activate_columns(["z"], false).unwrap();
    assert!(!store.is_active("x"));
    assert!(matches!(
        store.activate_columns(["w"], true),
        Err(Error::UnknownColumn(_))
    ));
}

#[test]
fn misaligned_friend_is_rejected() {
    let storage = memory();
    hundred_rows(&storage);
    write_columns(
        storage.as_ref(),
        "friend.rec",
        vec![("w", ColumnData::F64(vec![1.0; 99]))],
    );
    let dir = scratch_dir();
    let mut store = open(storage, dir.path());
    assert!(matches!(
        store.add_friend("Weights", "friend.rec"),
        Err(Error::Mismatch { expected: 100, found: 99, .. })
    ));
}

#[test]
fn aligned_friend_columns_join_the_schema() {
    let storage = memory();
    hundred_rows(&storage);
    let w: Vec<f64> = (0..100).map(|i| i as f64 * 0.5).collect();
    write_columns(storage.as_ref(), "friend.rec", vec![("w", ColumnData::F64(w))]);
    let dir = scratch_dir();
    let mut store = open(storage, dir.path());
    store.add_friend("Weights", "friend.rec").unwrap();
    store.activate_columns(["y", "w"], false).unwrap();
    store.set_entry(10).unwrap();
    assert_eq!(store.value("w").unwrap().as_f64(), 5.0);
}

#[test]
fn missing_source_surfaces_on_iteration() {
    let storage = memory();
    hundred_rows(&storage);
    let dir = scratch_dir();
    let mut store = open(storage, dir.path());
    store.add("absent.rec").unwrap();
    assert_eq!(store.missing_sources(), &["absent.rec".to_string()]);
    let first = store.iterate().next().unwrap();
    assert!(matches!(first, Err(Error::NotFound(_))));
}

#[test]
fn scoped_copy_is_removed_on_drop() {
    let storage = memory();
    hundred_rows(&storage);
    let dir = scratch_dir();
    let mut store = open(storage.clone(), dir.path());
    store.activate_columns(["x"], false).unwrap();
    let path = {
        let selected = store.copy_selected("x > 5").unwrap();
        assert!(storage.exists(selected.path()).unwrap());
        selected.path().to_string()
    };
    assert!(!storage.exists(&path).unwrap());
}

#[test]
fn scoped_copy_is_removed_on_early_return() {
    fn first_selected_z(store: &mut EventStore, path: &mut String) -> lcyield::store::Result<f64> {
        let mut selected = store.copy_selected("x > 5")?;
        *path = selected.path().to_string();
        // "z" was not carried into the copy
        let z = selected.store_mut().value_ref("z")?;
        Ok(z.f64())
    }

    let storage = memory();
    hundred_rows(&storage);
    let dir = scratch_dir();
    let mut store = open(storage.clone(), dir.path());
    store.activate_columns(["x", "y"], false).unwrap();
    let mut path = String::new();
    assert!(first_selected_z(&mut store, &mut path).is_err());
    assert!(!path.is_empty());
    assert!(!storage.exists(&path).unwrap());
}

#[test]
fn scoped_copy_is_removed_on_panic() {
    let storage = memory();
    hundred_rows(&storage);
    let dir = scratch_dir();
    let mut store = open(storage.clone(), dir.path());
    store.activate_columns(["x"], false).unwrap();
    let mut path = String::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let selected = store.copy_selected("x > 5").unwrap();
        path = selected.path().to_string();
        panic!("selection failed");
    }));
    assert!(outcome.is_err());
    assert!(!storage.exists(&path).unwrap());
}
