use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cachedrepo::cache::MemoryCache;
use cachedrepo::config::Config;
use cachedrepo::storage::SqliteUserStore;
use cachedrepo::CachedRepository;
use cachedrepo_core::cache::{Cache, KeyValues};
use cachedrepo_core::repository::{repo_error_to_status_code, InvalidationMode, RepoError};
use cachedrepo_core::user::{User, UserCreate, UserUpdate};

/// cachedrepo - Cache-aside CRUD over the demo users table
#[derive(Parser, Debug)]
#[command(name = "cachedrepo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Cache backend to put in front of the database
    #[arg(long, value_enum, default_value_t = CacheBackend::Memory, env = "CACHE_BACKEND")]
    cache: CacheBackend,

    /// Template of single-user cache keys
    #[arg(long, default_value = "user:email:{email}", env = "ENTITY_PATTERN")]
    entity_pattern: String,

    /// Template of list page cache keys
    #[arg(long, default_value = "user:list:{limit}:{page}", env = "LIST_PATTERN")]
    list_pattern: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        bio: Option<String>,
        /// Create the user as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// Get a user by email
    Get {
        #[arg(long)]
        email: String,
    },
    /// List one page of users, ordered by id
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Update the present fields of a user
    Update {
        /// Email of the user to update
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a user by email
    Delete {
        #[arg(long)]
        email: String,
    },
    /// Count users, optionally by active flag
    Count {
        #[arg(long)]
        active: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    let config = Config::from_env();
    let store = Arc::new(SqliteUserStore::new(&config.sqlite_path).await?);
    let cache = build_cache(cli.cache, &config).await?;

    let repo_config = config
        .repository(&cli.entity_pattern, &cli.list_pattern)
        .with_invalidation_mode(InvalidationMode::Inline);
    let users = CachedRepository::<User>::new(store, cache, &repo_config)?;

    tracing::info!(sqlite_path = %config.sqlite_path, cache = ?cli.cache, "Running command");

    if let Err(err) = run(&users, cli.command).await {
        match err.downcast_ref::<RepoError>() {
            Some(repo_err) => {
                tracing::error!(status = repo_error_to_status_code(repo_err), "{repo_err}")
            }
            None => tracing::error!("{err:#}"),
        }
        return Err(err);
    }
    Ok(())
}

/// Installs the tracing subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "cachedrepo=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_cache(backend: CacheBackend, config: &Config) -> Result<Arc<dyn Cache>> {
    match backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new(config.cache_max_entries))),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => {
            let cache = cachedrepo::cache::RedisCache::new(&config.redis_url).await?;
            tracing::info!(url = %config.redis_url, "Connected to Redis");
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => {
            anyhow::bail!("the redis cache requires building with `--features redis`")
        }
    }
}

fn by_email(email: String) -> KeyValues {
    KeyValues::new().with("email", email)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("cannot render output")?;
    println!("{rendered}");
    Ok(())
}

async fn run(users: &CachedRepository<User>, command: Command) -> Result<()> {
    match command {
        Command::Create {
            email,
            name,
            bio,
            inactive,
        } => {
            let mut input = UserCreate::new(email, name).with_active(!inactive);
            input.bio = bio;
            print_json(&users.create(input).await?)
        }
        Command::Get { email } => print_json(&users.get(&by_email(email)).await?),
        Command::List { limit, page } => {
            print_json(&users.get_multi(limit, page, &KeyValues::new()).await?)
        }
        Command::Update {
            email,
            new_email,
            name,
            bio,
            active,
        } => {
            let changes = UserUpdate {
                email: new_email,
                name,
                bio,
                is_active: active,
            };
            print_json(&users.update(&by_email(email), changes).await?)
        }
        Command::Delete { email } => {
            users.delete(&by_email(email.clone())).await?;
            tracing::info!(%email, "User deleted");
            Ok(())
        }
        Command::Count { active } => {
            let mut filter = KeyValues::new();
            if let Some(active) = active {
                filter.insert("is_active", active);
            }
            println!("{}", users.count(&filter).await?);
            Ok(())
        }
    }
}
