use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use aredl_verifier::cache::{CacheEntry, DiskCache, VerifierCache};
use aredl_verifier::config::Settings;
use aredl_verifier::config::settings::DEFAULT_MIN_DIFFICULTY;
use aredl_verifier::fetch::{FetchOutcome, Fetcher, Lookup, View};
use aredl_verifier::key::{CacheKey, LevelRequest};
use aredl_verifier::remote::ReqwestClient;

/// Show who verified AREDL levels
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Directory holding settings.json and the verifier cache
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Look up the two-player record
    #[arg(long)]
    duo: bool,

    /// Query the platformer list
    #[arg(long)]
    platformer: bool,

    /// Demon difficulty of the levels (6 = extreme demon)
    #[arg(long, default_value_t = DEFAULT_MIN_DIFFICULTY)]
    difficulty: u8,

    /// Keep the cache in memory only
    #[arg(long)]
    no_cache: bool,

    /// Delete the cache before looking anything up
    #[arg(long)]
    clear: bool,

    level_ids: Vec<i64>,
}

/// Prints refreshes for the level currently being looked up
struct ConsoleView {
    current: Mutex<Option<CacheKey>>,
    show_video: bool,
}

impl ConsoleView {
    fn show(&self, key: Option<CacheKey>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = key;
    }

    fn print(&self, key: &CacheKey, entry: &CacheEntry) {
        println!("{}: {}", key, entry.label());
        if self.show_video && !entry.video_url.is_empty() {
            println!("  {}", entry.video_url);
        }
    }
}

impl View for ConsoleView {
    fn displayed_key(&self) -> Option<CacheKey> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn refresh(&self, key: &CacheKey, entry: &CacheEntry) {
        self.print(key, entry);
    }
}

fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aredl-verifier")
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let save_dir = cli.save_dir.clone().unwrap_or_else(default_save_dir);
    let mut settings = Settings::load_from_dir(&save_dir);
    settings.disable_cache |= cli.no_cache;

    let disk = if settings.disable_cache {
        DiskCache::disabled()
    } else {
        DiskCache::new(&save_dir)
    };
    let cache = VerifierCache::with_entries(disk.load());

    let client = match ReqwestClient::new(&settings.user_agent, settings.timeout()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let view = Arc::new(ConsoleView {
        current: Mutex::new(None),
        show_video: settings.show_video,
    });
    let fetcher = Fetcher::new(
        Arc::new(cache),
        Arc::new(disk),
        Arc::new(client),
        view.clone(),
        &settings,
    );

    if cli.clear {
        if let Err(e) = fetcher.clear_all() {
            tracing::error!("Failed to clear cache: {}", e);
            return ExitCode::FAILURE;
        }
    }

    for level_id in cli.level_ids {
        let request = LevelRequest::new(level_id)
            .duo(cli.duo)
            .platformer(cli.platformer)
            .difficulty(cli.difficulty);
        let key = request.key();
        view.show(Some(key.clone()));

        match fetcher.resolve(&request) {
            Lookup::Invalid => eprintln!("{}: invalid level id", level_id),
            Lookup::Ineligible => eprintln!("{}: below difficulty threshold", key),
            Lookup::Cached(entry) => view.print(&key, &entry),
            Lookup::InFlight => {}
            Lookup::Pending(task) => match task.await {
                Ok(FetchOutcome::Discarded) => eprintln!("{}: unreadable response", key),
                Ok(FetchOutcome::Invalid) => eprintln!("{}: invalid level id", level_id),
                Ok(_) => {}
                Err(e) => tracing::error!("Fetch task for {} failed: {}", key, e),
            },
        }
    }

    ExitCode::SUCCESS
}
