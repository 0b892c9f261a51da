use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roster_core::{Descriptor, Gallery, IdentityId};
use roster_store::{gallery_file, NewIdentity, SessionRecord, Store};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster", about = "Roster attendance CLI")]
struct Cli {
    /// Attendance database path (default: ROSTER_DB_PATH or the data dir)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Gallery file path (default: ROSTER_GALLERY_PATH or the data dir)
    #[arg(long, value_name = "PATH")]
    gallery: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attendance sessions, newest first
    Sessions {
        /// Show at most this many sessions
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show identities with a currently open session
    Present,
    /// List the identity directory
    Identities,
    /// Add an identity, optionally with a descriptor for the gallery
    Enroll {
        #[arg(long)]
        name: String,
        #[arg(long)]
        badge: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        department: String,
        #[arg(long)]
        email: String,
        /// Skill rating; above 3 counts as authorized
        #[arg(long, default_value_t = 0)]
        rating: u8,
        /// JSON file holding one descriptor as an array of numbers
        #[arg(long, value_name = "PATH")]
        descriptor: Option<PathBuf>,
    },
    /// Validate the gallery file and summarize its contents
    Gallery,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_path = cli
        .db
        .or_else(|| std::env::var_os("ROSTER_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(roster_store::default_db_path);
    let gallery_path = cli
        .gallery
        .or_else(|| std::env::var_os("ROSTER_GALLERY_PATH").map(PathBuf::from))
        .unwrap_or_else(roster_store::default_gallery_path);

    match cli.command {
        Commands::Sessions { limit } => {
            let store = Store::open(&db_path).context("opening attendance store")?;
            let sessions = store.sessions(limit)?;
            if sessions.is_empty() {
                println!("no attendance records");
            }
            for session in sessions {
                print_session(&session);
            }
        }
        Commands::Present => {
            let store = Store::open(&db_path).context("opening attendance store")?;
            let sessions = store.open_sessions()?;
            if sessions.is_empty() {
                println!("nobody is currently present");
            }
            for session in sessions {
                print_session(&session);
            }
        }
        Commands::Identities => {
            let store = Store::open(&db_path).context("opening attendance store")?;
            let identities = store.identities()?;
            if identities.is_empty() {
                println!("no identities enrolled");
            }
            for (id, info) in identities {
                let status = if info.is_authorized() {
                    "authorized"
                } else {
                    "unauthorized"
                };
                println!(
                    "{id:>6}  {:<24}  {:<10}  {:>4}  {:<16}  {:<28}  {status}",
                    info.name, info.badge, info.age, info.department, info.email
                );
            }
        }
        Commands::Enroll {
            name,
            badge,
            age,
            department,
            email,
            rating,
            descriptor,
        } => {
            let mut store = Store::open(&db_path).context("opening attendance store")?;
            let id = store.add_identity(&NewIdentity {
                name,
                badge,
                age,
                department,
                email,
                rating,
            })?;

            match descriptor {
                Some(path) => {
                    let descriptor = read_descriptor(&path)?;
                    gallery_file::append(&gallery_path, descriptor, id)
                        .context("updating gallery file")?;
                    println!("enrolled identity {id} with one gallery descriptor");
                }
                None => {
                    println!(
                        "enrolled identity {id}; add a descriptor to the gallery before it can be recognized"
                    );
                }
            }
        }
        Commands::Gallery => {
            let persisted = gallery_file::load(&gallery_path).context("loading gallery")?;
            let gallery = Gallery::load(persisted.descriptors, persisted.identities)
                .context("validating gallery")?;

            println!(
                "{}: {} descriptors, {} identities",
                gallery_path.display(),
                gallery.len(),
                gallery.identity_count()
            );

            let mut per_identity: BTreeMap<IdentityId, (usize, usize)> = BTreeMap::new();
            for entry in gallery.entries() {
                let slot = per_identity.entry(entry.identity).or_insert((0, 0));
                slot.0 += 1;
                slot.1 = entry.descriptor.dim();
            }
            for (identity, (count, dim)) in per_identity {
                println!("identity {identity}: {count} descriptors (dim {dim})");
            }
        }
    }

    Ok(())
}

fn print_session(session: &SessionRecord) {
    let name = session.name.as_deref().unwrap_or("<unknown>");
    let start = session.started_at.format("%Y-%m-%d %H:%M:%S");
    let end = match session.ended_at {
        Some(ended) => ended.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "open".to_string(),
    };
    println!(
        "{:>6}  {:>6}  {name:<24}  {start}  {end}",
        session.session.0, session.identity
    );
}

/// Read one descriptor from a JSON array file.
fn read_descriptor(path: &PathBuf) -> Result<Descriptor> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading descriptor file {}", path.display()))?;
    let values: Vec<f32> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing descriptor file {}", path.display()))?;
    anyhow::ensure!(!values.is_empty(), "descriptor file {} is empty", path.display());
    Ok(Descriptor::new(values))
}
