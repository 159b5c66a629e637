//! xiaolongbaodb CLI
//!
//! Command-line interface for inspecting and editing a database file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use xiaolongbaodb::{BTree, Config, Value};

/// xiaolongbaodb CLI
#[derive(Parser, Debug)]
#[command(name = "xlbdb")]
#[command(about = "Embedded B-tree key-value store")]
#[command(version)]
struct Args {
    /// Database file
    #[arg(short, long, default_value = "./xiaolongbao.db")]
    path: PathBuf,

    /// B-tree order
    #[arg(short, long, default_value = "80")]
    order: usize,

    /// Page cache capacity in nodes
    #[arg(short, long, default_value = "1024")]
    cache_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print every pair with LOW <= key <= HIGH
    Scan {
        low: String,
        high: String,
    },

    /// Fold the WAL into the database file
    Checkpoint,

    /// Print tree shape and file statistics
    Stat,
}

/// Integers are stored as integers, everything else as text
fn parse_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::Int(n),
        Err(_) => Value::Text(raw.to_string()),
    }
}

fn show(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

fn run(args: Args) -> xiaolongbaodb::Result<()> {
    let config = Config::builder()
        .path(&args.path)
        .order(args.order)
        .cache_size(args.cache_size)
        .build();
    let tree = BTree::open(config)?;

    match args.command {
        Commands::Get { key } => match tree.get(parse_value(&key))? {
            Some(value) => println!("{}", show(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            match tree.insert(parse_value(&key), parse_value(&value))? {
                Some(previous) => println!("OK (replaced {})", show(&previous)),
                None => println!("OK"),
            }
        }
        Commands::Del { key } => match tree.delete(parse_value(&key))? {
            Some(_) => println!("(1)"),
            None => println!("(0)"),
        },
        Commands::Scan { low, high } => {
            for pair in tree.range(parse_value(&low), parse_value(&high))? {
                let (key, value) = pair?;
                println!("{}\t{}", show(&key), show(&value));
            }
        }
        Commands::Checkpoint => {
            let pages = tree.checkpoint()?;
            println!("Checkpointed {} page(s)", pages);
        }
        Commands::Stat => {
            let conf = tree.conf();
            let handler = tree.handler();
            println!("path:        {}", tree.path().display());
            println!("order:       {}", conf.order);
            println!("page_size:   {}", conf.page_size);
            println!("key_size:    {}", conf.key_size);
            println!("value_size:  {}", conf.value_size);
            println!("root_page:   {}", tree.root_page());
            println!("height:      {}", tree.height()?);
            println!("pages:       {}", handler.logical_end());
            println!("free_pages:  {}", handler.free_page_count());
            println!("wal_pages:   {}", handler.wal_committed_pages());
            println!("wal_frames:  {}", handler.wal_page_frames());
        }
    }

    tree.close()
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xiaolongbaodb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!("xlbdb v{}", xiaolongbaodb::VERSION);

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
