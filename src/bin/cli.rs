//! docwire CLI Client
//!
//! Command-line interface for talking to a database server.

use clap::{Parser, Subcommand};
use docwire::bson::parse_json;
use docwire::protocol::UpdateFlags;
use docwire::{Client, Config, Document, DriverError, Result, ServerAddress};
use tracing_subscriber::{fmt, EnvFilter};

/// docwire CLI
#[derive(Parser, Debug)]
#[command(name = "docwire-cli")]
#[command(about = "CLI for document database servers")]
#[command(version)]
struct Args {
    /// Server address (host[:port])
    #[arg(short = 'H', long, default_value = "localhost:27017")]
    host: String,

    /// Secondary server for a left/right pair (host[:port])
    #[arg(short, long)]
    pair: Option<String>,

    /// Allow reads from the secondary
    #[arg(long)]
    slave_ok: bool,

    /// Socket read/write timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "0")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream documents matching a query
    Find {
        /// Namespace, "db.collection"
        namespace: String,

        /// Query document as JSON
        #[arg(default_value = "{}")]
        query: String,

        /// Field selector as JSON
        #[arg(short, long)]
        fields: Option<String>,

        /// Maximum documents to return (negative = single batch)
        #[arg(short, long, default_value = "0")]
        limit: i32,

        /// Documents to skip
        #[arg(short, long, default_value = "0")]
        skip: i32,

        /// Documents per round trip
        #[arg(short, long, default_value = "0")]
        batch_size: i32,
    },

    /// Print the first document matching a query
    FindOne {
        namespace: String,

        #[arg(default_value = "{}")]
        query: String,
    },

    /// Count documents matching a query
    Count {
        namespace: String,

        #[arg(default_value = "{}")]
        query: String,
    },

    /// Insert a document
    Insert {
        namespace: String,

        /// Document as JSON
        document: String,
    },

    /// Update documents matching a selector
    Update {
        namespace: String,

        selector: String,

        update: String,

        /// Insert if nothing matches
        #[arg(long)]
        upsert: bool,

        /// Update every match
        #[arg(long)]
        multi: bool,
    },

    /// Remove documents matching a selector
    Remove {
        namespace: String,

        selector: String,
    },

    /// Run a database command
    Command {
        /// Database name
        database: String,

        /// Command document as JSON, e.g. '{"ping": 1}'
        command: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,docwire=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let left: ServerAddress = args.host.parse()?;
    let mut builder = Config::builder()
        .server(left.clone())
        .slave_ok(args.slave_ok)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms);
    if let Some(right) = &args.pair {
        builder = builder.pair(left, right.parse()?);
    }

    let client = Client::new(builder.build());
    client.connect()?;

    match args.command {
        Commands::Find {
            namespace,
            query,
            fields,
            limit,
            skip,
            batch_size,
        } => {
            let (db, name) = split_namespace(&namespace)?;
            let mut cursor = client
                .database(db)
                .collection(name)
                .find(parse_json(&query)?)
                .limit(limit)
                .skip(skip)
                .batch_size(batch_size);
            if let Some(fields) = fields {
                cursor = cursor.fields(parse_json(&fields)?);
            }
            for document in cursor {
                print_document(&document?);
            }
        }
        Commands::FindOne { namespace, query } => {
            let (db, name) = split_namespace(&namespace)?;
            match client.database(db).collection(name).find_one(parse_json(&query)?)? {
                Some(document) => print_document(&document),
                None => println!("null"),
            }
        }
        Commands::Count { namespace, query } => {
            let (db, name) = split_namespace(&namespace)?;
            let n = client.database(db).collection(name).count(parse_json(&query)?)?;
            println!("{}", n);
        }
        Commands::Insert {
            namespace,
            document,
        } => {
            let (db, name) = split_namespace(&namespace)?;
            let database = client.database(db);
            let id = database.collection(name).insert(parse_json(&document)?)?;
            print_document(&Document::new().append("_id", id));
            confirm(&database)?;
        }
        Commands::Update {
            namespace,
            selector,
            update,
            upsert,
            multi,
        } => {
            let (db, name) = split_namespace(&namespace)?;
            let mut flags = UpdateFlags::empty();
            if upsert {
                flags.insert(UpdateFlags::UPSERT);
            }
            if multi {
                flags.insert(UpdateFlags::MULTI);
            }
            let database = client.database(db);
            database
                .collection(name)
                .update(parse_json(&selector)?, parse_json(&update)?, flags)?;
            confirm(&database)?;
        }
        Commands::Remove {
            namespace,
            selector,
        } => {
            let (db, name) = split_namespace(&namespace)?;
            let database = client.database(db);
            database.collection(name).remove(parse_json(&selector)?)?;
            confirm(&database)?;
        }
        Commands::Command { database, command } => {
            let response = client.database(&database).command(parse_json(&command)?)?;
            print_document(&response);
        }
    }

    client.disconnect();
    Ok(())
}

/// Writes carry no acknowledgment; ask for one explicitly
fn confirm(database: &docwire::Database<'_>) -> Result<()> {
    let status = database.last_error()?;
    match status.get("err").and_then(|v| v.as_str()) {
        Some(err) => Err(DriverError::CommandFailure(err.to_string())),
        None => {
            print_document(&status);
            Ok(())
        }
    }
}

fn split_namespace(namespace: &str) -> Result<(&str, &str)> {
    match namespace.split_once('.') {
        Some((db, name)) if !db.is_empty() && !name.is_empty() => Ok((db, name)),
        _ => Err(DriverError::Config(format!(
            "namespace '{}' must look like db.collection",
            namespace
        ))),
    }
}

fn print_document(document: &Document) {
    match serde_json::to_string_pretty(document) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("Could not render document: {}", e),
    }
}
