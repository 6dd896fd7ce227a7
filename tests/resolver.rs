mod common;

use assert_matches::assert_matches;

use genotypes_loader::domain::{Fields, ResolveMode};
use genotypes_loader::error::LoaderError;
use genotypes_loader::resolver::resolve;

use common::{CountingStore, cats_store, count_rows};

const MODES: [ResolveMode; 3] = [
    ResolveMode::SelectOnly,
    ResolveMode::InsertOnly,
    ResolveMode::SelectOrInsert,
];

#[test]
fn ambiguous_match_fails_in_every_mode() {
    let (store, terms) = cats_store();
    let organism = store.add_organism("Felis", "catus", None).unwrap();
    for type_id in [terms.sample, terms.germplasm] {
        resolve(
            &store,
            "Stock",
            "stock",
            ResolveMode::InsertOnly,
            &Fields::new()
                .with("uniquename", "Ross")
                .with("organism_id", organism)
                .with("type_id", type_id),
            &Fields::new(),
        )
        .unwrap();
    }

    let select = Fields::new().with("uniquename", "Ross");
    for mode in MODES {
        let err = resolve(&store, "Stock", "stock", mode, &select, &Fields::new()).unwrap_err();
        assert_matches!(err, LoaderError::AmbiguousRecord { count: 2, .. });
    }
    assert_eq!(count_rows(&store, "stock"), 2);
}

#[test]
fn insert_only_rejects_existing_record() {
    let (store, _) = cats_store();
    let select = Fields::new().with("name", "Cat genotyping");
    resolve(
        &store,
        "Project",
        "project",
        ResolveMode::InsertOnly,
        &select,
        &Fields::new(),
    )
    .unwrap();

    let err = resolve(
        &store,
        "Project",
        "project",
        ResolveMode::InsertOnly,
        &select,
        &Fields::new(),
    )
    .unwrap_err();
    assert_matches!(err, LoaderError::RecordAlreadyExists { .. });
    assert_eq!(count_rows(&store, "project"), 1);
}

#[test]
fn select_only_rejects_absent_record() {
    let (store, _) = cats_store();
    let err = resolve(
        &store,
        "Project",
        "project",
        ResolveMode::SelectOnly,
        &Fields::new().with("name", "Cat genotyping"),
        &Fields::new(),
    )
    .unwrap_err();
    assert_matches!(err, LoaderError::RecordNotFound { ref table, .. } if table == "project");
    assert_eq!(count_rows(&store, "project"), 0);
}

#[test]
fn select_only_returns_existing_key() {
    let (store, _) = cats_store();
    let id = store.add_project("Cat genotyping").unwrap();
    let found = resolve(
        &store,
        "Project",
        "project",
        ResolveMode::SelectOnly,
        &Fields::new().with("name", "Cat genotyping"),
        &Fields::new(),
    )
    .unwrap();
    assert_eq!(found, id);
}

#[test]
fn select_or_insert_inserts_once() {
    let (store, terms) = cats_store();
    let organism = store.add_organism("Felis", "catus", None).unwrap();
    let counting = CountingStore::new(&store);
    let select = Fields::new()
        .with("uniquename", "Ross_110201")
        .with("organism_id", organism)
        .with("type_id", terms.sample);
    let insert = Fields::new().with("name", "Ross");

    let first = resolve(
        &counting,
        "Sample",
        "stock",
        ResolveMode::SelectOrInsert,
        &select,
        &insert,
    )
    .unwrap();
    let second = resolve(
        &counting,
        "Sample",
        "stock",
        ResolveMode::SelectOrInsert,
        &select,
        &insert,
    )
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(counting.inserts.get(), 1);
    assert_eq!(counting.selects.get(), 2);
    assert_eq!(count_rows(&store, "stock"), 1);

    let name: String = store
        .connection()
        .query_row("SELECT name FROM stock WHERE stock_id = ?1", [first], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(name, "Ross");
}

#[test]
fn store_errors_propagate() {
    let (store, _) = cats_store();
    // type 999 is not a cvterm, so the foreign key rejects the insert
    let err = resolve(
        &store,
        "Sample",
        "stock",
        ResolveMode::SelectOrInsert,
        &Fields::new().with("uniquename", "Ross").with("type_id", 999),
        &Fields::new(),
    )
    .unwrap_err();
    assert_matches!(err, LoaderError::Database(_));
}

#[test]
fn unsafe_table_name_is_rejected() {
    let (store, _) = cats_store();
    let err = resolve(
        &store,
        "Project",
        "project; DROP TABLE stock",
        ResolveMode::SelectOrInsert,
        &Fields::new().with("name", "x"),
        &Fields::new(),
    )
    .unwrap_err();
    assert_matches!(err, LoaderError::InvalidResolveRequest(_));
    assert_eq!(count_rows(&store, "stock"), 0);
}
