use datapaint_core::db::open_db_in_memory;
use datapaint_core::{
    MetaRepository, PointRepository, RepoError, SqliteMetaRepository, SqlitePointRepository,
    TableMeta,
};
use rusqlite::Connection;

#[test]
fn create_table_persists_metadata_and_data_table() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMetaRepository::new(&conn);

    repo.create_table(&demo_meta("measurements")).unwrap();

    let loaded = repo.read("measurements").unwrap().unwrap();
    assert_eq!(loaded, demo_meta("measurements"));
    assert!(table_exists(&conn, "measurements"));

    // The spatial indexes back the bounded viewport queries.
    assert!(index_exists(&conn, "measurements_x"));
    assert!(index_exists(&conn, "measurements_y"));
}

#[test]
fn read_of_an_unknown_table_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMetaRepository::new(&conn);
    assert!(repo.read("missing").unwrap().is_none());
}

#[test]
fn update_rewrites_metadata_and_rejects_unknown_tables() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMetaRepository::new(&conn);
    repo.create_table(&demo_meta("demo")).unwrap();

    let mut meta = demo_meta("demo");
    meta.x_meaning = "yes".to_string();
    meta.max_x = 42.0;
    repo.update(&meta).unwrap();

    let loaded = repo.read("demo").unwrap().unwrap();
    assert_eq!(loaded.x_meaning, "yes");
    assert_eq!(loaded.max_x, 42.0);

    let err = repo.update(&demo_meta("missing")).unwrap_err();
    assert!(matches!(err, RepoError::UnknownTable(name) if name == "missing"));
}

#[test]
fn list_tables_is_sorted_by_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMetaRepository::new(&conn);
    repo.create_table(&demo_meta("zebra")).unwrap();
    repo.create_table(&demo_meta("alpha")).unwrap();

    assert_eq!(
        repo.list_tables().unwrap(),
        vec!["alpha".to_string(), "zebra".to_string()]
    );
}

#[test]
fn drop_table_removes_data_metadata_and_staged_edits() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMetaRepository::new(&conn);
    repo.create_table(&demo_meta("demo")).unwrap();

    conn.execute(
        "INSERT INTO staged_edits (table_name, action, x, y, new_target, is_active)
         VALUES ('demo', 'create', 1.0, 2.0, 'positive', 1);",
        [],
    )
    .unwrap();

    repo.drop_table("demo").unwrap();

    assert!(!table_exists(&conn, "demo"));
    assert!(repo.read("demo").unwrap().is_none());
    let staged: i64 = conn
        .query_row("SELECT COUNT(*) FROM staged_edits;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(staged, 0);
}

#[test]
fn point_crud_roundtrips_and_reports_missing_ids() {
    let conn = open_db_in_memory().unwrap();
    SqliteMetaRepository::new(&conn)
        .create_table(&demo_meta("demo"))
        .unwrap();
    let repo = SqlitePointRepository::try_new(&conn, "demo").unwrap();

    let id = repo.insert(1.5, -2.5, "positive").unwrap();
    let all = repo.all_ordered().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].target, "positive");

    repo.update_target(id, "negative").unwrap();
    assert_eq!(repo.all_ordered().unwrap()[0].target, "negative");

    repo.delete(id).unwrap();
    assert!(repo.all_ordered().unwrap().is_empty());

    assert!(matches!(repo.delete(id), Err(RepoError::NotFound(_))));
    assert!(matches!(
        repo.update_target(id, "positive"),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn hostile_table_names_are_rejected_up_front() {
    let conn = open_db_in_memory().unwrap();

    let err = SqlitePointRepository::try_new(&conn, "demo; DROP TABLE metadata").unwrap_err();
    assert!(matches!(err, RepoError::InvalidTableName(_)));

    let mut meta = demo_meta("demo");
    meta.table_name = "bad name".to_string();
    let err = SqliteMetaRepository::new(&conn)
        .create_table(&meta)
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidTableName(_)));
}

fn demo_meta(name: &str) -> TableMeta {
    TableMeta {
        table_name: name.to_string(),
        target_col_name: "target".to_string(),
        x_axis_name: "x".to_string(),
        y_axis_name: "y".to_string(),
        x_meaning: "positive".to_string(),
        o_meaning: "negative".to_string(),
        min_x: -10.0,
        max_x: 10.0,
        min_y: -10.0,
        max_y: 10.0,
    }
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

fn index_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1);",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}
