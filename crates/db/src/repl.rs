//! The interactive prompt: one query per line, meta commands for
//! everything else.

use std::path::Path;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use storage::RecordId;

use crate::commands::{parse_meta_command, MetaCommand};
use crate::engine::Engine;
use crate::printer;
use crate::query::parse_query;
use crate::schema;

const PRIMARY_PROMPT: &str = "resale> ";

pub fn run_repl(engine: &Engine) -> Result<()> {
    let mut editor = DefaultEditor::new().context("initialize line editor")?;
    println!("Enter a query, e.g.: town=\"ANG MO KIO\" floor_area_sqm>=80  (.help for help)");

    loop {
        let line = match editor.readline(PRIMARY_PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        if let Some(command) = parse_meta_command(input) {
            match command {
                MetaCommand::Exit => break,
                MetaCommand::Help => print_help(),
                MetaCommand::Count => println!("{} records", engine.row_count()),
                MetaCommand::Schema => print_schema(),
            }
            continue;
        }
        if input.starts_with('.') {
            eprintln!("unknown command {:?} (.help lists commands)", input);
            continue;
        }

        if let Err(err) = run_query(engine, input, None) {
            eprintln!("error: {:#}", err);
        }
    }
    Ok(())
}

/// Runs one query: prints a preview table and, when `out` is given, writes
/// the full result set as CSV.
pub fn run_query(engine: &Engine, input: &str, out: Option<&Path>) -> Result<()> {
    let predicates = parse_query(input)?;
    let ids = engine.search(&predicates)?;
    println!("{} matching records", ids.len());

    let columns = schema::column_names();
    let preview: Vec<RecordId> = ids.iter().copied().take(printer::MAX_DISPLAY_ROWS).collect();
    let rows = engine.project(&preview, &columns)?;
    if !rows.is_empty() {
        println!("{}", printer::format_table(&columns, &rows));
    }
    if ids.len() > printer::MAX_DISPLAY_ROWS {
        println!(
            "(showing first {} of {} rows)",
            printer::MAX_DISPLAY_ROWS,
            ids.len()
        );
    }

    if let Some(path) = out {
        let all = engine.project(&ids, &columns)?;
        printer::write_csv(path, &columns, &all)
            .with_context(|| format!("write results to {}", path.display()))?;
        println!("wrote {} rows to {}", all.len(), path.display());
    }
    Ok(())
}

fn print_help() {
    println!("queries: whitespace-separated terms, all of which must hold");
    println!("  town=\"ANG MO KIO\"            equality");
    println!("  floor_area_sqm>=80           comparison (<, <=, >, >=)");
    println!("  month=2015-09..2015-10       closed range");
    println!("  month=2015-09 month=2015-11  repeated column = either value");
    println!("commands: .help  .schema  .count  .exit");
}

fn print_schema() {
    for column in schema::COLUMNS {
        println!("  {:<22} {:?}", column.name, column.key_type);
    }
}
