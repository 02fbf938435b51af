use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use db::engine::Engine;
use db::repl::{run_query, run_repl};

#[derive(Parser, Debug)]
#[command(name = "resaledb", about = "Disk-backed columnar store for resale records")]
struct Args {
    /// Directory holding column and index files
    #[arg(long, value_name = "DIR", default_value = "data")]
    data_dir: PathBuf,

    /// CSV file to ingest when the data directory is empty
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Run one query and exit instead of starting the prompt
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,

    /// With --query: write the full result set to this CSV file
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let engine = Engine::open(&args.data_dir, args.csv.as_deref())?;
    println!("{} records available", engine.row_count());

    match args.query {
        Some(query) => run_query(&engine, &query, args.out.as_deref()),
        None => run_repl(&engine),
    }
}
