mod avatar;
mod config;
mod confirm;
mod contact;
mod db;
mod detail;
mod fetcher;
mod route;
mod search;
mod store;
mod ui;
mod view;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use confirm::{AssumeYes, Confirm, DeleteIntent, PromptConfirm};
use contact::NewContact;
use db::Database;
use route::{FormData, Params, FAVORITE_FIELD};
use store::{ContactStore, SqliteStore};
use view::{display_name, ContactView, FavoriteButton};

#[derive(Parser, Debug)]
#[command(name = "rolodex", version, about = "Terminal contact book")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Contacts database, overriding `db_path` from the configuration
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Open this contact when starting the interactive view
    #[arg(long, value_name = "ID")]
    contact: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a contact
    Show(ShowArgs),
    /// Mark or unmark a contact as favorite
    Favorite(FavoriteArgs),
    /// Delete a contact after confirmation
    Delete(DeleteArgs),
    /// Create a contact and print its id
    Add(AddArgs),
    /// List contacts, optionally filtered by name
    List(ListArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    id: String,

    /// Print the stored record as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct FavoriteArgs {
    id: String,

    /// `true` or `false`
    value: String,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    id: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    first: Option<String>,
    #[arg(long)]
    last: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
    #[arg(long)]
    twitter: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    favorite: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Search term matched against first and last name
    query: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.is_none())?;

    let config = config::load(cli.config.as_deref())?;
    if let Some(path) = &config.config_path {
        info!(path = %path.display(), "loaded configuration");
    }

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let mut db = Database::open(&db_path)?;

    match cli.command {
        None => run_interactive(db, &config, cli.contact.as_deref()),
        Some(Command::Add(args)) => handle_add(&mut db, args),
        Some(Command::List(args)) => handle_list(&db, args),
        Some(Command::Show(args)) => {
            let store = SqliteStore::with_latency(db, config.store.latency);
            runtime()?.block_on(handle_show(&store, &config, args))
        }
        Some(Command::Favorite(args)) => {
            let store = SqliteStore::with_latency(db, config.store.latency);
            runtime()?.block_on(handle_favorite(&store, &config, args))
        }
        Some(Command::Delete(args)) => {
            let store = SqliteStore::with_latency(db, config.store.latency);
            handle_delete(&store, args)
        }
    }
}

/// Interactive mode logs to a file so the terminal stays clean; commands log
/// to stderr.
fn init_logging(interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if interactive {
        let dir = config::data_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join("rolodex.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
    }
    Ok(())
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn run_interactive(db: Database, config: &Config, contact: Option<&str>) -> Result<()> {
    let runtime = runtime()?;
    let store: Arc<dyn ContactStore> =
        Arc::new(SqliteStore::with_latency(db, config.store.latency));
    let mut app = ui::app::App::new(config, runtime.handle().clone(), store, contact)?;
    app.run()
}

async fn handle_show(store: &dyn ContactStore, config: &Config, args: ShowArgs) -> Result<()> {
    let data = route::loader(store, &Params::contact(args.id)).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&data.contact)?);
    } else {
        let view = ContactView::build(&data.contact, None, &config.links.twitter);
        print!("{}", view.to_text());
    }
    Ok(())
}

async fn handle_favorite(
    store: &dyn ContactStore,
    config: &Config,
    args: FavoriteArgs,
) -> Result<()> {
    let form = FormData::new().with(FAVORITE_FIELD, args.value);
    let contact = route::action(store, &Params::contact(args.id), &form).await?;
    let view = ContactView::build(&contact, None, &config.links.twitter);
    print!("{}", view.to_text());
    Ok(())
}

fn handle_delete(store: &SqliteStore, args: DeleteArgs) -> Result<()> {
    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirm::new(io::stdin().lock(), io::stderr()))
    };

    let Some(submission) = DeleteIntent::new(args.id.as_str()).resolve(confirm.as_mut()) else {
        println!("Cancelled");
        return Ok(());
    };

    let redirect = runtime()?.block_on(route::destroy_action(store, &submission.params))?;
    info!(location = %redirect.location, "delete redirected");
    println!("Deleted {}", args.id);
    Ok(())
}

fn handle_add(db: &mut Database, args: AddArgs) -> Result<()> {
    let contact = db.insert(&NewContact {
        first: args.first,
        last: args.last,
        avatar: args.avatar,
        twitter: args.twitter,
        notes: args.notes,
        favorite: args.favorite,
    })?;
    println!("{}", contact.id);
    Ok(())
}

fn handle_list(db: &Database, args: ListArgs) -> Result<()> {
    for contact in db.list(args.query.as_deref())? {
        let glyph = FavoriteButton {
            favorite: contact.favorite,
        }
        .glyph();
        let name = display_name(contact.first.as_deref(), contact.last.as_deref());
        println!("{}\t{}\t{}", contact.id, glyph, name.text());
    }
    Ok(())
}
