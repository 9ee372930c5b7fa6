use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use xtview::config::Config;
use xtview::events::{EventFilter, EventPayload, EventType};
use xtview::models::{
    CategoryId, ContentId, ContentKind, Credentials, FavoriteKind, PerKind, Profile, ProfileId,
    ShowId, StreamKind,
};
use xtview::services::CatalogService;

#[derive(Parser, Debug)]
#[command(author, version, about = "Per-profile Xtream-Codes catalog cache", long_about = None)]
struct Cli {
    /// Config file, defaults to $XDG_CONFIG_HOME/xtview/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for xtview
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Download the full catalog of one kind, or of every kind
    Download {
        #[arg(value_enum, default_value_t = DownloadTarget::All)]
        target: DownloadTarget,
    },

    /// List cached items of a kind
    List {
        kind: ContentKind,
        #[arg(long)]
        category: Option<String>,
    },

    /// List cached categories of a kind
    Categories { kind: ContentKind },

    /// Seasons and episodes of a show
    Episodes { show_id: String },

    /// Playable URL of a stream
    Url {
        kind: StreamKind,
        id: String,
        extension: String,
    },

    /// Manage favorites
    #[command(subcommand)]
    Favorite(FavoriteCommand),

    /// Watch history, newest first
    History,

    /// Current profile, downloaded flags and item counts
    Status,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Save a new profile
    Add {
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Preferred output format (m3u8, ts)
        #[arg(long)]
        format: Option<String>,
        /// Make the new profile current
        #[arg(long)]
        activate: bool,
    },
    List,
    /// Make a profile current
    Use { id: String },
    Remove { id: String },
    /// Refresh and show account details of the current profile
    Info,
}

#[derive(Subcommand, Debug)]
enum FavoriteCommand {
    Add { kind: ContentKind, id: String },
    Remove { kind: FavoriteKind, id: String },
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DownloadTarget {
    Channels,
    Movies,
    Shows,
    All,
}

impl DownloadTarget {
    fn kind(self) -> Option<ContentKind> {
        match self {
            DownloadTarget::Channels => Some(ContentKind::Channel),
            DownloadTarget::Movies => Some(ContentKind::Movie),
            DownloadTarget::Shows => Some(ContentKind::Show),
            DownloadTarget::All => None,
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("xtview=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config, cli.verbose);
    info!("Starting xtview {}", env!("CARGO_PKG_VERSION"));

    let service = CatalogService::open(&config).await;
    if !service.store().is_available() {
        warn!("Catalog database unavailable, nothing will be persisted");
    }
    if let Err(e) = service.restore_session().await {
        warn!("Could not restore the last profile: {}", e);
    }

    match cli.command {
        Command::Profile(command) => run_profile(&service, command).await,
        Command::Download { target } => run_download(&service, target).await,
        Command::List { kind, category } => {
            let category = category.map(CategoryId::new);
            let items = service.content(kind, category.as_ref()).await?;
            if items.is_empty() {
                println!("No {} cached, run `xtview download {}` first", kind, kind);
            }
            for item in items {
                println!("{}\t{}\t{}", item.id(), item.category_id(), item.name());
            }
            Ok(())
        }
        Command::Categories { kind } => {
            for category in service.categories(kind).await? {
                println!("{}\t{}", category.id, category.name);
            }
            Ok(())
        }
        Command::Episodes { show_id } => {
            let seasons = service.episodes(&ShowId::new(show_id)).await?;
            for (season, episodes) in seasons {
                println!("Season {}", season);
                for episode in episodes {
                    println!(
                        "  {:>3}  {}\t{}.{}",
                        episode.episode_num, episode.title, episode.id, episode.container_extension
                    );
                }
            }
            Ok(())
        }
        Command::Url {
            kind,
            id,
            extension,
        } => {
            println!("{}", service.stream_url(kind, &id, &extension).await?);
            Ok(())
        }
        Command::Favorite(command) => run_favorite(&service, command).await,
        Command::History => {
            for entry in service.history().await? {
                let position = entry
                    .position
                    .map(|p| format!(" at {}s", p))
                    .unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}{}",
                    entry.watched_at.format("%Y-%m-%d %H:%M"),
                    entry.kind.as_str(),
                    entry.id,
                    entry.name,
                    position
                );
            }
            Ok(())
        }
        Command::Status => run_status(&service).await,
    }
}

fn print_profile(profile: &Profile) {
    let marker = if profile.is_active { "*" } else { " " };
    println!(
        "{} {}\t{}\t{}@{}",
        marker,
        profile.id,
        profile.name,
        profile.credentials.username,
        profile.credentials.base_url()
    );
}

async fn run_profile(service: &CatalogService, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Add {
            name,
            url,
            username,
            password,
            format,
            activate,
        } => {
            let mut credentials = Credentials::new(url, username, password);
            if let Some(format) = format {
                credentials = credentials.with_format(format);
            }
            let profile = service.add_profile(name, credentials).await?;
            println!("Added profile {}", profile.id);

            match service.test_connection(&profile).await {
                Ok(true) => println!("Connection OK"),
                Ok(false) => println!("Warning: the server did not accept these credentials"),
                Err(e) => println!("Warning: {}", e),
            }

            if activate {
                service.switch_profile(&profile.id).await?;
                println!("Now using {}", profile.name);
            }
        }
        ProfileCommand::List => {
            let profiles = service.list_profiles().await;
            if profiles.is_empty() {
                println!("No profiles, add one with `xtview profile add`");
            }
            for profile in &profiles {
                print_profile(profile);
            }
        }
        ProfileCommand::Use { id } => {
            let profile = service.switch_profile(&ProfileId::new(id)).await?;
            println!("Now using {}", profile.name);
        }
        ProfileCommand::Remove { id } => {
            service.delete_profile(&ProfileId::new(id.clone())).await?;
            println!("Removed profile {}", id);
        }
        ProfileCommand::Info => {
            let profile = service.refresh_account_info().await?;
            print_profile(&profile);
            if let Some(user) = &profile.cached_user_info {
                println!(
                    "  status: {}  expires: {}  connections: {}/{}",
                    user.status.as_deref().unwrap_or("unknown"),
                    user.exp_date.as_deref().unwrap_or("never"),
                    user.active_connections,
                    user.max_connections
                );
                if !user.allowed_output_formats.is_empty() {
                    println!("  formats: {}", user.allowed_output_formats.join(", "));
                }
            }
            if let Some(server) = &profile.cached_server_info {
                println!(
                    "  server: {}://{}:{}  timezone: {}",
                    server.server_protocol, server.url, server.port, server.timezone
                );
            }
        }
    }
    Ok(())
}

async fn run_download(service: &CatalogService, target: DownloadTarget) -> Result<()> {
    let Some(profile) = service.current_profile().await else {
        anyhow::bail!("No profile selected, use `xtview profile use <id>`");
    };
    let mut events = service.event_bus().subscribe_filtered(
        EventFilter::new()
            .with_types(vec![EventType::DownloadProgress])
            .for_profile(profile.id),
    );
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let EventPayload::Download { kind, progress, .. } = event.payload {
                if progress.is_downloading {
                    println!("  {}: {} so far", kind, progress.progress);
                }
            }
        }
    });

    let result = match target.kind() {
        Some(kind) => {
            let count = service.download(kind).await?;
            println!("Downloaded {} {}", count, kind);
            Ok(())
        }
        None => {
            let report = service.download_all().await?;
            let mut failed = 0;
            for kind in ContentKind::ALL {
                match report.get(kind) {
                    Ok(count) => println!("Downloaded {} {}", count, kind),
                    Err(e) => {
                        failed += 1;
                        println!("{}", e);
                    }
                }
            }
            if failed == ContentKind::ALL.len() {
                anyhow::bail!("every download failed");
            }
            Ok(())
        }
    };

    reporter.abort();
    result
}

async fn run_favorite(service: &CatalogService, command: FavoriteCommand) -> Result<()> {
    match command {
        FavoriteCommand::Add { kind, id } => {
            if service.add_favorite(kind, &ContentId::new(id.clone())).await? {
                println!("Added {} to favorites", id);
            } else {
                println!("{} already a favorite", id);
            }
        }
        FavoriteCommand::Remove { kind, id } => {
            if !service
                .remove_favorite(kind, &ContentId::new(id.clone()))
                .await?
            {
                println!("{} was not a favorite", id);
            }
        }
        FavoriteCommand::List => {
            for favorite in service.favorites().await? {
                println!("{}\t{}\t{}", favorite.kind.as_str(), favorite.id, favorite.name);
            }
        }
    }
    Ok(())
}

async fn run_status(service: &CatalogService) -> Result<()> {
    let Some(profile) = service.current_profile().await else {
        println!("No profile selected, use `xtview profile use <id>`");
        return Ok(());
    };
    print_profile(&profile);

    let downloaded = service.content_downloaded().await?;
    let counts = PerKind {
        channels: service.content(ContentKind::Channel, None).await?.len(),
        movies: service.content(ContentKind::Movie, None).await?.len(),
        shows: service.content(ContentKind::Show, None).await?.len(),
    };
    for kind in ContentKind::ALL {
        let state = if *downloaded.get(kind) {
            "downloaded"
        } else {
            "not downloaded"
        };
        println!("  {:<8} {:>6}  {}", kind.plural(), counts.get(kind), state);
    }

    if let Some(cached_at) = service.cached_at().await? {
        println!("  in memory since {}", cached_at.format("%Y-%m-%d %H:%M:%S"));
    }

    let settings = service.settings().await;
    let settings = serde_json::to_string(&settings).context("Failed to render settings")?;
    println!("  settings: {}", settings);
    Ok(())
}
