use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use worldstore_common::{BlockPos, RegionCoord};
use worldstore_persist::{StoreConfig, WorldStore};

#[derive(Parser)]
#[command(name = "worldstore-cli", about = "CLI tool for world store files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON store configuration (queue size, journal, sync level)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the store file (created if missing)
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print schema version and row counts
    Info,
    /// List stored blocks of a region
    Blocks {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        json: bool,
    },
    /// List stored light values of a region
    Lights {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        json: bool,
    },
    /// List signs of a region
    Signs {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Print the generation key of a region
    Key {
        #[command(flatten)]
        region: RegionArgs,
    },
    /// Read a metadata value, or write it when VALUE is given
    Meta { key: String, value: Option<String> },
    /// Look up a bookmark, or store it when X Y Z are given
    Bookmark {
        label: String,
        #[arg(allow_negative_numbers = true)]
        major: i32,
        #[arg(allow_negative_numbers = true)]
        minor: i32,
        #[arg(num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        at: Option<Vec<i32>>,
    },
    /// Commit and force the write-ahead log to disk
    Checkpoint,
}

#[derive(clap::Args)]
struct RegionArgs {
    #[arg(allow_negative_numbers = true)]
    p: i32,
    #[arg(allow_negative_numbers = true)]
    q: i32,
}

impl From<&RegionArgs> for RegionCoord {
    fn from(args: &RegionArgs) -> Self {
        RegionCoord::new(args.p, args.q)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let store = WorldStore::open_with_config(&cli.db, &config)
        .with_context(|| format!("opening store {}", cli.db.display()))?;
    tracing::debug!(db = %cli.db.display(), ?config, "store ready");

    match &cli.command {
        Commands::Info => {
            println!("worldstore-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("schema: v{}", store.schema_version()?);
            let counts = store.table_counts()?;
            println!("blocks: {}", counts.blocks);
            println!("lights: {}", counts.lights);
            println!("keys: {}", counts.keys);
            println!("signs: {}", counts.signs);
            println!("metadata: {}", counts.metadata);
            println!("bookmarks: {}", counts.bookmarks);
            println!("tagged blocks: {}", counts.tagged_blocks);
        }
        Commands::Blocks { region, json } => {
            let records = store.load_blocks(region.into())?;
            print_records(&records, *json, |r| format!("{} {}", r.pos, r.value))?;
        }
        Commands::Lights { region, json } => {
            let records = store.load_lights(region.into())?;
            print_records(&records, *json, |r| format!("{} {}", r.pos, r.value))?;
        }
        Commands::Signs { region, json } => {
            let records = store.load_signs(region.into())?;
            print_records(&records, *json, |r| {
                format!("{} face={} {:?}", r.pos, r.face, r.text)
            })?;
        }
        Commands::Key { region } => {
            let region = RegionCoord::from(region);
            match store.get_key(region)? {
                Some(version) => println!("{region}: {version}"),
                None => println!("{region}: no key"),
            }
        }
        Commands::Meta { key, value } => match value {
            Some(value) => {
                store.set_metadata(key, value)?;
                println!("{key} = {value}");
            }
            None => match store.get_metadata(key)? {
                Some(value) => println!("{key} = {value}"),
                None => println!("{key} is not set"),
            },
        },
        Commands::Bookmark {
            label,
            major,
            minor,
            at,
        } => {
            if let Some(&[x, y, z]) = at.as_deref() {
                store.insert_bookmark(label, *major, *minor, BlockPos::new(x, y, z))?;
            }
            match store.get_bookmark(label, *major, *minor)? {
                Some(pos) => println!("{label} {major}:{minor} at {pos}"),
                None => println!("{label} {major}:{minor} not found"),
            }
        }
        Commands::Checkpoint => {
            let report = store.force_checkpoint()?;
            println!(
                "checkpoint: busy={}, log={}, checkpointed={}",
                report.busy, report.log_frames, report.checkpointed_frames
            );
        }
    }

    store.close()?;
    Ok(())
}

fn print_records<T: Serialize>(
    records: &[T],
    json: bool,
    line: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        for record in records {
            println!("{}", line(record));
        }
        println!("{} rows", records.len());
    }
    Ok(())
}
