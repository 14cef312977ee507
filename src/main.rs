use anyhow::{Context, Result};
use tracing::info;

use snapview::capture::{CaptureCoordinator, FileCapture, FixedLocation};
use snapview::cli::{self, Command, Invocation};
use snapview::config::Config;
use snapview::db::{PhotoRecord, PhotoStore};
use snapview::gallery::GalleryView;
use snapview::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let Invocation { config_path, command } = cli::parse_args(std::env::args().skip(1))?;

    match command {
        Command::Help => {
            println!("{}", cli::help_text());
            return Ok(());
        }
        Command::Version => {
            println!("snapview {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(None);

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    // One handle for the whole run, shared by the coordinator and the view.
    let store = PhotoStore::open(&config.db_path, config.store.busy_timeout())
        .await
        .with_context(|| format!("Cannot open gallery at {}", config.db_path.display()))?;

    let result = run(command, &config, store.clone()).await;
    store.close();
    result
}

async fn run(command: Command, config: &Config, store: PhotoStore) -> Result<()> {
    match command {
        Command::Init => {
            let path = store.path().unwrap_or(config.db_path.as_path());
            println!("Gallery ready at {} ({} photos)", path.display(), store.count().await?);
        }
        Command::Capture { image, position } => {
            let location = FixedLocation::new(
                config.location.permission_granted,
                position.or_else(|| config.location.position()),
            );
            let coordinator = CaptureCoordinator::new(store, FileCapture::new(image), location);
            let record = coordinator.capture().await?;
            info!("Capture stored as photo {}", record.id);
            print_record(&record);
        }
        Command::List { month, day, json } => {
            let mut view = GalleryView::new(store);
            if month.is_some() || day.is_some() {
                view.search(month.as_deref().unwrap_or(""), day.as_deref().unwrap_or(""))
                    .await?;
            } else {
                view.on_focus().await?;
            }

            if json {
                println!("{}", serde_json::to_string_pretty(view.photos())?);
            } else if view.photos().is_empty() {
                println!("No photos");
            } else {
                view.photos().iter().for_each(print_record);
            }
        }
        Command::Show { id, json } => match store.get(id).await? {
            Some(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
            Some(record) => print_record(&record),
            None => println!("No photo with id {id}"),
        },
        Command::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted photo {id}");
        }
        Command::Help | Command::Version => {}
    }
    Ok(())
}

fn print_record(record: &PhotoRecord) {
    println!(
        "{:>6}  {}  {:>11.6} {:>12.6}  {}",
        record.id,
        record.timestamp_text(),
        record.latitude,
        record.longitude,
        record.uri
    );
}
