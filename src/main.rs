use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use save_live_stream::config::{ConfigFile, StoreConfig};
use save_live_stream::export;
use save_live_stream::status::{self, SessionStatus};
use save_live_stream::SessionStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and export recorded live-stream session files")]
struct Args {
    /// Path to config file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export all comments as an XML chat packet
    Comments {
        /// Path to the session SQLite file
        sqlite_file: PathBuf,

        /// Output name; the extension is replaced (default: next to the session file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Concatenate fetched media segments into a .ts file
    Media {
        /// Path to the session SQLite file
        sqlite_file: PathBuf,

        /// Output name; the extension is replaced (default: next to the session file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show download progress and where a comment backfill would resume.
    /// Reads committed data only and works while a recorder is writing.
    Status {
        /// Path to the session SQLite file
        sqlite_file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a session setting (numbers are stored as REAL, anything else as TEXT)
    Set {
        /// Path to the session SQLite file
        sqlite_file: PathBuf,

        key: String,

        value: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    run(args).map_err(|e| e.to_string().into())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => ConfigFile::load(path)?.store,
        None => StoreConfig::default(),
    };

    match args.command {
        Command::Comments {
            sqlite_file,
            output,
        } => {
            require_existing(&sqlite_file)?;
            let name = output.unwrap_or_else(|| sqlite_file.clone());
            let summary = export::write_comments(&sqlite_file, &name)?;
            println!("{} comments -> {}", summary.items, summary.path.display());
        }
        Command::Media {
            sqlite_file,
            output,
        } => {
            require_existing(&sqlite_file)?;
            let name = output.unwrap_or_else(|| sqlite_file.clone());
            let summary = export::write_media(&sqlite_file, &name)?;
            println!("{} segments -> {}", summary.items, summary.path.display());
        }
        Command::Status { sqlite_file, json } => {
            require_existing(&sqlite_file)?;
            let status = status::read_status(&sqlite_file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&sqlite_file, &status);
            }
        }
        Command::Set {
            sqlite_file,
            key,
            value,
        } => {
            require_existing(&sqlite_file)?;
            let store = SessionStore::open(&sqlite_file, &config)?;
            match value.parse::<f64>() {
                Ok(number) => store.set_kv(&key, number)?,
                Err(_) => store.set_kv(&key, value.clone())?,
            }
            store.close()?;
            println!("{} = {}", key, value);
        }
    }

    Ok(())
}

fn require_existing(sqlite_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !sqlite_file.exists() {
        return Err(format!("Database file not found: {}", sqlite_file.display()).into());
    }
    Ok(())
}

fn format_epoch(seconds: f64) -> String {
    let secs = seconds.floor() as i64;
    let nanos = ((seconds - seconds.floor()) * 1e9) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{}", seconds),
    }
}

fn print_status(sqlite_file: &Path, status: &SessionStatus) {
    println!("Session: {}", sqlite_file.display());
    println!(
        "Segments: {} ({} fetched, {} not found, {} resolved)",
        status.segments,
        status.fetched_segments,
        status.notfound_segments,
        status.resolved_segments
    );
    println!("Last position: {:.3}", status.last_position);
    println!("Comments: {}", status.comments);
    println!(
        "Resume comments from no={} at {}",
        status.resume_from_no,
        format_epoch(status.resume_when)
    );
}
