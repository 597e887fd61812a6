use datapaint_core::db::open_db_in_memory;
use datapaint_core::{
    Command, Direction, MetaRepository, PointKind, PointRepository, Session,
    SqliteMetaRepository, SqlitePointRepository, TableMeta, Viewport,
};
use rusqlite::Connection;

const GRID: i32 = 20;

#[test]
fn committed_points_bucket_into_their_cells() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);

    // Two x's at the origin, a mixed cell, a double o, a single o.
    insert_committed(&conn, 0.0, 0.0, "positive");
    insert_committed(&conn, 0.0, 0.0, "positive");
    insert_committed(&conn, 1.0, 0.0, "positive");
    insert_committed(&conn, 1.0, 0.0, "negative");
    insert_committed(&conn, -1.0, 0.0, "negative");
    insert_committed(&conn, -1.0, 0.0, "negative");
    insert_committed(&conn, 2.0, 2.0, "negative");

    let session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    let rows = session.render().unwrap();

    // col = 10 + x, row = 10 - y at one unit per cell.
    assert_eq!(rows[10].chars().nth(10), Some('X'));
    assert_eq!(rows[10].chars().nth(11), Some('#'));
    assert_eq!(rows[10].chars().nth(9), Some('O'));
    assert_eq!(rows[8].chars().nth(12), Some('o'));
    assert_eq!(rows[5].chars().nth(5), Some(' '));
}

#[test]
fn labels_matching_neither_meaning_are_not_aggregated() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);
    insert_committed(&conn, 0.0, 0.0, "mystery");

    let session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    let rows = session.render().unwrap();
    assert_eq!(rows[10].chars().nth(10), Some(' '));
}

#[test]
fn equal_undos_return_the_aggregation_to_its_baseline() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);
    insert_committed(&conn, 1.0, 1.0, "positive");

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    let baseline = session.aggregate().unwrap();

    session.apply(Command::Create(PointKind::X)).unwrap();
    session.apply(Command::Move(Direction::Right)).unwrap();
    session.apply(Command::Create(PointKind::O)).unwrap();
    session.apply(Command::Move(Direction::Up)).unwrap();
    session.apply(Command::Retype(PointKind::O)).unwrap();
    session.apply(Command::Delete).unwrap();
    assert_ne!(session.aggregate().unwrap(), baseline);

    for _ in 0..4 {
        session.apply(Command::Undo).unwrap();
    }
    assert_eq!(session.aggregate().unwrap(), baseline);
}

#[test]
fn range_query_is_bounded_by_the_viewport_box() {
    let conn = open_db_in_memory().unwrap();
    let meta = create_demo_table(&conn);

    let repo = SqlitePointRepository::try_new(&conn, "demo").unwrap();
    repo.insert(0.0, 0.0, "positive").unwrap();
    repo.insert(1000.0, 1000.0, "positive").unwrap();
    repo.insert(3.0, -2000.0, "negative").unwrap();

    let viewport = Viewport::new(meta.valid_range(), GRID, GRID);
    let visible = repo.query_range(&viewport.query_bounds()).unwrap();

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].x, 0.0);
}

#[test]
fn forbidden_cells_render_their_marker_even_when_occupied() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);
    // Imported data can sit outside the valid range.
    insert_committed(&conn, -12.0, 0.0, "positive");

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    for _ in 0..10 {
        session.apply(Command::Move(Direction::Left)).unwrap();
    }
    for _ in 0..3 {
        session.apply(Command::Move(Direction::Left)).unwrap();
    }

    // Viewport center is now (-3, 0); x = -12 lands on column 1.
    let rows = session.render().unwrap();
    assert_eq!(rows[10].chars().nth(1), Some('!'));
    // The in-range part of the row is not forbidden.
    assert_eq!(rows[10].chars().nth(13), Some(' '));
}

#[test]
fn staged_retype_moves_a_count_between_kinds() {
    let mut conn = open_db_in_memory().unwrap();
    create_demo_table(&conn);
    insert_committed(&conn, 0.0, 0.0, "positive");
    insert_committed(&conn, 0.0, 0.0, "negative");

    let mut session = Session::open(&mut conn, "demo", GRID, GRID).unwrap();
    let rows = session.render().unwrap();
    assert_eq!(rows[10].chars().nth(10), Some('#'));

    // The newest committed point is the o; retyping it to x leaves two x's.
    session.apply(Command::Retype(PointKind::X)).unwrap();
    let rows = session.render().unwrap();
    assert_eq!(rows[10].chars().nth(10), Some('X'));
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
    SqlitePointRepository::try_new(conn, "demo")
        .unwrap()
        .insert(x, y, target)
        .unwrap()
}
