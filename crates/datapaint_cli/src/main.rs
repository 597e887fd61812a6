//! `datapaint` command-line interface.
//!
//! # Responsibility
//! - Parse arguments, open the database, and dispatch to the core engine.
//! - Map error classes to distinct process exit codes.
//!
//! # Exit codes
//! - 0: success
//! - 2: usage error (clap parse/validation failures)
//! - 64: unreadable, empty, or malformed keystroke script
//! - 65: database cannot be opened or bootstrapped
//! - 66: storage or table errors
//! - 67: point rejected by the table's valid range

use clap::{Parser, Subcommand};
use datapaint_core::db::open_db;
use datapaint_core::repo::edit_repo::clear_all_tables;
use datapaint_core::{
    action_for_key, default_log_level, export_csv, init_logging, parse_script, save_edits,
    EditAction, EditLog, KeyAction, MetaRepository, PointRepository, Session,
    SqliteEditRepository, SqliteMetaRepository, SqlitePointRepository, StagedEdit, TableMeta,
};
use log::info;
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_USAGE: u8 = 2;
const EXIT_SCRIPT: u8 = 64;
const EXIT_DB_OPEN: u8 = 65;
const EXIT_STORAGE: u8 = 66;
const EXIT_OUT_OF_RANGE: u8 = 67;

const DEFAULT_COLS: i32 = 76;
const DEFAULT_ROWS: i32 = 20;

#[derive(Parser)]
#[command(
    name = "datapaint",
    version,
    about = "Label 2-D points on a SQLite-backed dataset"
)]
struct Cli {
    /// Path to the SQLite database file.
    #[arg(long)]
    database: PathBuf,

    /// Write rolling log files under this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Create a table together with its metadata record.
    CreateTable {
        #[arg(long)]
        table: String,
        /// Name for the target/label column.
        #[arg(long)]
        target_column_name: String,
        #[arg(long)]
        x_axis_name: String,
        #[arg(long)]
        y_axis_name: String,
        /// Label stored for points of kind x.
        #[arg(long)]
        x_meaning: String,
        /// Label stored for points of kind o.
        #[arg(long)]
        o_meaning: String,
        #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
        min_x: f64,
        #[arg(long, default_value_t = 10.0, allow_hyphen_values = true)]
        max_x: f64,
        #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
        min_y: f64,
        #[arg(long, default_value_t = 10.0, allow_hyphen_values = true)]
        max_y: f64,
    },
    /// List all tables in the database.
    ListTables,
    /// Show the metadata record of a table.
    ShowMetadata {
        #[arg(long)]
        table: String,
    },
    /// Drop a table, its metadata, and its staged edits.
    DeleteTable {
        #[arg(long)]
        table: String,
    },
    /// Add a committed point; the valid range is enforced.
    AddPoint {
        #[arg(long)]
        table: String,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        #[arg(long)]
        target: String,
    },
    /// Delete a committed point by id.
    DeletePoint {
        #[arg(long)]
        table: String,
        #[arg(long)]
        point_id: i64,
    },
    /// Export committed data as CSV on stdout.
    ToCsv {
        #[arg(long)]
        table: String,
    },
    /// List the staged edits recorded for a table.
    ListChanges {
        #[arg(long)]
        table: String,
    },
    /// Commit all active staged edits of a table.
    CommitChanges {
        #[arg(long)]
        table: String,
    },
    /// Discard staged edits for one table, or for all with --all.
    ClearChanges {
        #[arg(long, conflicts_with = "all")]
        table: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Replay a keystroke script against a table and print the grid.
    Replay {
        #[arg(long)]
        table: String,
        /// Line-oriented keystroke file.
        #[arg(long)]
        keys: PathBuf,
        #[arg(long, default_value_t = DEFAULT_COLS)]
        cols: i32,
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: i32,
    },
    /// Print the current glyph grid of a table.
    Dump {
        #[arg(long)]
        table: String,
        #[arg(long, default_value_t = DEFAULT_COLS)]
        cols: i32,
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: i32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        if let Err(message) = init_logging(default_log_level(), &log_dir.to_string_lossy()) {
            eprintln!("Error: {message}");
            return ExitCode::from(EXIT_USAGE);
        }
    }

    let mut conn = match open_db(&cli.database) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!(
                "Error: failed to open database {}: {err}",
                cli.database.display()
            );
            return ExitCode::from(EXIT_DB_OPEN);
        }
    };

    run(&mut conn, cli.command)
}

fn run(conn: &mut Connection, command: CliCommand) -> ExitCode {
    match command {
        CliCommand::CreateTable {
            table,
            target_column_name,
            x_axis_name,
            y_axis_name,
            x_meaning,
            o_meaning,
            min_x,
            max_x,
            min_y,
            max_y,
        } => {
            if min_x > max_x {
                eprintln!("Error: min-x ({min_x}) must be <= max-x ({max_x})");
                return ExitCode::from(EXIT_USAGE);
            }
            if min_y > max_y {
                eprintln!("Error: min-y ({min_y}) must be <= max-y ({max_y})");
                return ExitCode::from(EXIT_USAGE);
            }

            let meta = TableMeta {
                table_name: table.clone(),
                target_col_name: target_column_name,
                x_axis_name,
                y_axis_name,
                x_meaning,
                o_meaning,
                min_x,
                max_x,
                min_y,
                max_y,
            };
            match SqliteMetaRepository::new(conn).create_table(&meta) {
                Ok(()) => {
                    println!("Table '{table}' created");
                    ExitCode::SUCCESS
                }
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::ListTables => match SqliteMetaRepository::new(conn).list_tables() {
            Ok(tables) if tables.is_empty() => {
                println!("No tables found in database");
                ExitCode::SUCCESS
            }
            Ok(tables) => {
                println!("Tables:");
                for table in tables {
                    println!("  {table}");
                }
                ExitCode::SUCCESS
            }
            Err(err) => storage_failure(&err),
        },

        CliCommand::ShowMetadata { table } => match read_meta(conn, &table) {
            Ok(meta) => {
                println!("Table: {}", meta.table_name);
                println!("Target column: {}", meta.target_col_name);
                println!("X axis: {}", meta.x_axis_name);
                println!("Y axis: {}", meta.y_axis_name);
                println!("X meaning: {}", meta.x_meaning);
                println!("O meaning: {}", meta.o_meaning);
                println!("Valid X range: [{}, {}]", meta.min_x, meta.max_x);
                println!("Valid Y range: [{}, {}]", meta.min_y, meta.max_y);
                ExitCode::SUCCESS
            }
            Err(code) => code,
        },

        CliCommand::DeleteTable { table } => {
            if let Err(code) = read_meta(conn, &table) {
                return code;
            }
            match SqliteMetaRepository::new(conn).drop_table(&table) {
                Ok(()) => {
                    println!("Table '{table}' deleted");
                    ExitCode::SUCCESS
                }
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::AddPoint {
            table,
            x,
            y,
            target,
        } => {
            let meta = match read_meta(conn, &table) {
                Ok(meta) => meta,
                Err(code) => return code,
            };
            if !meta.valid_range().contains(x, y) {
                eprintln!(
                    "Error: point ({x}, {y}) is outside the valid range [{}, {}] x [{}, {}]",
                    meta.min_x, meta.max_x, meta.min_y, meta.max_y
                );
                return ExitCode::from(EXIT_OUT_OF_RANGE);
            }

            let repo = match SqlitePointRepository::try_new(conn, &table) {
                Ok(repo) => repo,
                Err(err) => return storage_failure(&err),
            };
            match repo.insert(x, y, &target) {
                Ok(id) => {
                    println!("Point added with ID {id}");
                    ExitCode::SUCCESS
                }
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::DeletePoint { table, point_id } => {
            if let Err(code) = read_meta(conn, &table) {
                return code;
            }
            let repo = match SqlitePointRepository::try_new(conn, &table) {
                Ok(repo) => repo,
                Err(err) => return storage_failure(&err),
            };
            match repo.delete(point_id) {
                Ok(()) => {
                    println!("Point {point_id} deleted");
                    ExitCode::SUCCESS
                }
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::ToCsv { table } => {
            if let Err(code) = read_meta(conn, &table) {
                return code;
            }
            let repo = match SqlitePointRepository::try_new(conn, &table) {
                Ok(repo) => repo,
                Err(err) => return storage_failure(&err),
            };
            let stdout = std::io::stdout();
            match export_csv(&repo, &mut stdout.lock()) {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::ListChanges { table } => {
            let meta = match read_meta(conn, &table) {
                Ok(meta) => meta,
                Err(code) => return code,
            };
            let repo = match SqliteEditRepository::try_new(conn, &meta) {
                Ok(repo) => repo,
                Err(err) => return storage_failure(&err),
            };
            let log = match EditLog::load(&repo) {
                Ok(log) => log,
                Err(err) => return storage_failure(&err),
            };

            if log.is_empty() {
                println!("No staged edits for table: {table}");
                return ExitCode::SUCCESS;
            }

            let mut edits: Vec<StagedEdit> = log.all_edits().to_vec();
            edits.sort_by_key(|edit| edit.seq);
            println!("Staged edits for {table}:");
            for edit in edits {
                print_edit(&meta, &edit);
            }
            ExitCode::SUCCESS
        }

        CliCommand::CommitChanges { table } => {
            let meta = match read_meta(conn, &table) {
                Ok(meta) => meta,
                Err(code) => return code,
            };
            let mut log = {
                let repo = match SqliteEditRepository::try_new(conn, &meta) {
                    Ok(repo) => repo,
                    Err(err) => return storage_failure(&err),
                };
                match EditLog::load(&repo) {
                    Ok(log) => log,
                    Err(err) => return storage_failure(&err),
                }
            };
            match save_edits(conn, &meta, &mut log) {
                Ok(count) => {
                    println!("Committed {count} staged edit(s) for table '{table}'");
                    ExitCode::SUCCESS
                }
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::ClearChanges { table, all } => {
            if all {
                return match clear_all_tables(conn) {
                    Ok(removed) => {
                        println!("Cleared {removed} staged edit(s)");
                        ExitCode::SUCCESS
                    }
                    Err(err) => storage_failure(&err),
                };
            }
            let Some(table) = table else {
                eprintln!("Error: --table is required unless --all is given");
                return ExitCode::from(EXIT_USAGE);
            };
            let meta = match read_meta(conn, &table) {
                Ok(meta) => meta,
                Err(code) => return code,
            };
            let repo = match SqliteEditRepository::try_new(conn, &meta) {
                Ok(repo) => repo,
                Err(err) => return storage_failure(&err),
            };
            match datapaint_core::EditRepository::clear_all(&repo) {
                Ok(removed) => {
                    println!("Cleared {removed} staged edit(s) for table '{table}'");
                    ExitCode::SUCCESS
                }
                Err(err) => storage_failure(&err),
            }
        }

        CliCommand::Replay {
            table,
            keys,
            cols,
            rows,
        } => {
            let keys = match parse_script(&keys) {
                Ok(keys) => keys,
                Err(err) => {
                    eprintln!("Error: {err}");
                    return ExitCode::from(EXIT_SCRIPT);
                }
            };
            info!(
                "event=replay_start module=cli table={table} keys={}",
                keys.len()
            );

            let mut session = match Session::open(conn, &table, cols, rows) {
                Ok(session) => session,
                Err(err) => return storage_failure(&err),
            };
            for key in keys {
                match action_for_key(key) {
                    KeyAction::Command(command) => {
                        if let Err(err) = session.apply(command) {
                            return storage_failure(&err);
                        }
                    }
                    KeyAction::Quit => break,
                    KeyAction::Ignore => {}
                }
            }
            print_grid(&session)
        }

        CliCommand::Dump { table, cols, rows } => {
            let session = match Session::open(conn, &table, cols, rows) {
                Ok(session) => session,
                Err(err) => return storage_failure(&err),
            };
            print_grid(&session)
        }
    }
}

/// Reads a table's metadata, mapping "missing" to the storage exit code.
fn read_meta(conn: &Connection, table: &str) -> Result<TableMeta, ExitCode> {
    match SqliteMetaRepository::new(conn).read(table) {
        Ok(Some(meta)) => Ok(meta),
        Ok(None) => {
            eprintln!("Error: Table not found: {table}");
            Err(ExitCode::from(EXIT_STORAGE))
        }
        Err(err) => Err(storage_failure(&err)),
    }
}

fn print_grid(session: &Session<'_>) -> ExitCode {
    match session.render() {
        Ok(rows) => {
            for row in rows {
                println!("{row}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => storage_failure(&err),
    }
}

fn print_edit(meta: &TableMeta, edit: &StagedEdit) {
    let active = if edit.active { "yes" } else { "no" };
    match edit.action {
        EditAction::Create { x, y, kind } => {
            println!(
                "ID: {}, Action: create, Active: {active}, Position: ({x}, {y}), Target: {}",
                edit.seq,
                kind.target(meta)
            );
        }
        EditAction::Delete { data_id, x, y } => {
            println!(
                "ID: {}, Action: delete, Active: {active}, Data ID: {data_id}, Position: ({x}, {y})",
                edit.seq
            );
        }
        EditAction::Retype { data_id, to } => {
            println!(
                "ID: {}, Action: retype, Active: {active}, Data ID: {data_id}, New: {}",
                edit.seq,
                to.target(meta)
            );
        }
    }
}

fn storage_failure(err: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("Error: {err}");
    ExitCode::from(EXIT_STORAGE)
}
