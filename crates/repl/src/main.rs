//! Interactive shell and batch-file runner for a single MiniSQL instance.
//!
//! Reads statements at a `minisql> ` prompt (continuing on `    ...> ` until
//! a `;` closes the statement), executes them against one [`Engine`], and
//! renders `SELECT` results as a table.

use std::path::PathBuf;
use std::time::Instant;

use buffer::BufferPool;
use clap::Parser as ClapParser;
use common::Config;
use executor::{Engine, ExecResult};
use parser::{parse_program, Command};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tabled::builder::Builder as TableBuilder;
use tabled::settings::Style;
use types::Value;

#[derive(ClapParser, Debug)]
#[command(name = "minisql", about = "A small single-process relational database")]
struct Cli {
    /// Directory holding the catalog, record, and index files.
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Number of pages the buffer pool keeps resident.
    #[arg(long, default_value_t = buffer::DEFAULT_CAPACITY)]
    buffer_pages: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::builder()
        .data_dir(cli.data_dir)
        .buffer_pool_pages(cli.buffer_pages)
        .build();
    let pool = BufferPool::new(&config.data_dir, config.buffer_pool_pages);
    let mut engine = Engine::open(pool)?;
    let mut editor = DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "minisql> " } else { "    ...> " };
        match editor.readline(prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                buffer.push_str(&line);
                buffer.push('\n');
                if drain_statements(&mut engine, &mut buffer, false)? {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                engine.flush()?;
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Pull every complete (`;`-terminated) statement out of `buffer` and run
/// it, leaving any trailing partial statement in place. Returns `true` if
/// an `EXIT`/`QUIT` was executed.
fn drain_statements(engine: &mut Engine, buffer: &mut String, in_file: bool) -> anyhow::Result<bool> {
    loop {
        let Some((text, rest)) = parser::split_first_statement(buffer)? else {
            return Ok(false);
        };
        *buffer = rest;
        let command = match parse_program(&text)?.remove(0) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("error: {err}");
                continue;
            }
        };
        if run_command(engine, command, in_file)? {
            return Ok(true);
        }
    }
}

/// Execute one parsed command. Returns `true` if it was `EXIT`/`QUIT`.
fn run_command(engine: &mut Engine, command: Command, in_file: bool) -> anyhow::Result<bool> {
    match command {
        Command::Exit => {
            engine.flush()?;
            Ok(true)
        }
        Command::ExecFile(path) => {
            if in_file {
                eprintln!("error: EXECFILE cannot be nested inside another EXECFILE");
                return Ok(false);
            }
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("could not read '{path}': {e}"))?;
            let mut source = contents;
            drain_statements(engine, &mut source, true)
        }
        Command::Sql(statement) => {
            let start = Instant::now();
            match engine.execute(statement) {
                Ok(result) => {
                    print_result(&result);
                    if !in_file {
                        println!("({:.3}s)", start.elapsed().as_secs_f64());
                    }
                }
                Err(err) => eprintln!("error: {err}"),
            }
            Ok(false)
        }
    }
}

fn print_result(result: &ExecResult) {
    match result {
        ExecResult::TableCreated { name } => println!("table '{name}' created"),
        ExecResult::TableDropped { name } => println!("table '{name}' dropped"),
        ExecResult::IndexCreated { name } => println!("index '{name}' created"),
        ExecResult::IndexDropped { name } => println!("index '{name}' dropped"),
        ExecResult::Inserted { id } => println!("1 row inserted (record {id})"),
        ExecResult::Deleted { count } => println!("{count} row(s) deleted"),
        ExecResult::Selected { columns, rows } => print_rows(columns, rows),
    }
}

fn print_rows(columns: &[String], rows: &[Vec<Value>]) {
    let mut builder = TableBuilder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().map(format_value));
    }
    let mut table = builder.build();
    table.with(Style::modern());
    println!("{table}");
    println!("({} row(s))", rows.len());
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Char(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
    }
}
