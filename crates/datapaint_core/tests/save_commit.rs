use datapaint_core::db::open_db_in_memory;
use datapaint_core::{
    save_edits, Command, EditAction, EditLog, MetaRepository, PointKind, RepoError, Session,
    SqliteEditRepository, SqliteMetaRepository, TableMeta,
};
use rusqlite::Connection;

const GRID: i32 = 20;

#[test]
fn save_commits_active_edits_and_empties_the_log() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    session.apply(Command::Create(PointKind::X)).unwrap();
    session.apply(Command::Create(PointKind::O)).unwrap();

    let committed = session.save().unwrap();
    assert_eq!(committed, 2);
    assert!(session.log().is_empty());

    // A second save with nothing pending is a no-op returning zero.
    assert_eq!(session.save().unwrap(), 0);
    drop(session);

    assert_eq!(committed_rows(&conn), 2);
    assert_eq!(staged_rows(&conn), 0);
    let targets = committed_targets(&conn);
    assert_eq!(targets, vec!["positive".to_string(), "negative".to_string()]);
}

#[test]
fn a_created_then_deleted_point_never_reaches_storage() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    session.apply(Command::Create(PointKind::X)).unwrap();
    session.apply(Command::Delete).unwrap();

    assert_eq!(session.save().unwrap(), 0);
    drop(session);

    assert_eq!(committed_rows(&conn), 0);
    assert_eq!(staged_rows(&conn), 0);
}

#[test]
fn undone_edits_are_not_committed_and_not_redoable_after_save() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    session.apply(Command::Create(PointKind::X)).unwrap();
    session.apply(Command::Create(PointKind::X)).unwrap();
    session.apply(Command::Undo).unwrap();

    assert_eq!(session.save().unwrap(), 1);
    assert!(!session.log().can_redo());
    drop(session);

    assert_eq!(committed_rows(&conn), 1);
    assert_eq!(staged_rows(&conn), 0);
}

#[test]
fn saved_deletes_and_retypes_reach_committed_storage() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);
    insert_committed(&conn, 0.0, 0.0, "positive");
    insert_committed(&conn, 1.0, 0.0, "positive");

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    // Delete the point under the cursor, retype the one to the right.
    session.apply(Command::Delete).unwrap();
    session
        .apply(Command::Move(datapaint_core::Direction::Right))
        .unwrap();
    session.apply(Command::Retype(PointKind::O)).unwrap();

    assert_eq!(session.save().unwrap(), 2);
    drop(session);

    assert_eq!(committed_rows(&conn), 1);
    assert_eq!(committed_targets(&conn), vec!["negative".to_string()]);
}

#[test]
fn a_failed_save_rolls_back_and_keeps_the_log_for_retry() {
    let mut conn = open_db_in_memory().unwrap();
    let meta = create_demo_table(&conn);

    let mut log = EditLog::new();
    {
        let repo = SqliteEditRepository::try_new(&conn, &meta).unwrap();
        log.record(
            &repo,
            EditAction::Create {
                x: 1.0,
                y: 1.0,
                kind: PointKind::X,
            },
        )
        .unwrap();
        // References a committed point that does not exist; the delete
        // fails mid-transaction.
        log.record(
            &repo,
            EditAction::Delete {
                data_id: 999,
                x: 0.0,
                y: 0.0,
            },
        )
        .unwrap();
    }

    let err = save_edits(&mut conn, &meta, &mut log).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(999)));

    // The earlier insert was rolled back; the staged log is intact.
    assert_eq!(committed_rows(&conn), 0);
    assert_eq!(staged_rows(&conn), 2);
    assert_eq!(log.active_count(), 2);
}

#[test]
fn save_with_only_undone_edits_returns_zero_and_clears_the_shadow() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    session.apply(Command::Create(PointKind::X)).unwrap();
    session.apply(Command::Undo).unwrap();

    assert_eq!(session.save().unwrap(), 0);
    assert!(session.log().is_empty());
    drop(session);

    assert_eq!(committed_rows(&conn), 0);
    assert_eq!(staged_rows(&conn), 0);
}

fn create_demo_table(conn: &Connection) -> TableMeta {
    let meta = TableMeta {
        table_name: "demo".to_string(),
        target_col_name: "target".to_string(),
        x_axis_name: "x".to_string(),
        y_axis_name: "y".to_string(),
        x_meaning: "positive".to_string(),
        o_meaning: "negative".to_string(),
        min_x: -10.0,
        max_x: 10.0,
        min_y: -10.0,
        max_y: 10.0,
    };
    SqliteMetaRepository::new(conn).create_table(&meta).unwrap();
    meta
}

fn insert_committed(conn: &Connection, x: f64, y: f64, target: &str) -> i64 {
    use datapaint_core::{PointRepository, SqlitePointRepository};
    SqlitePointRepository::try_new(conn, "demo")
        .unwrap()
        .insert(x, y, target)
        .unwrap()
}

fn committed_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM demo;", [], |row| row.get(0))
        .unwrap()
}

fn committed_targets(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT target FROM demo ORDER BY id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn staged_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM staged_edits;", [], |row| row.get(0))
        .unwrap()
}
