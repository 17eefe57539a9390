//! Cachamita chat relay server binary.
//!
//! Serves the chat page and relays `POST /api/chat` to the configured
//! inference provider, enriched with menu items from PostgreSQL or a JSON
//! menu file.

use std::path::PathBuf;
use std::sync::Arc;

use cachamita_api::config::ApiConfig;
use cachamita_core::completion::cloudflare::CloudflareAi;
use cachamita_core::completion::openai::OpenAiCompatible;
use cachamita_core::completion::{
    CompletionError, CompletionLimits, CompletionProvider, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use cachamita_core::menu::MenuLookup;
use cachamita_core::menu::memory::InMemoryMenu;
use cachamita_core::menu::queries::PgMenu;
use cachamita_core::persona::Persona;
use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// Inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// Cloudflare Workers AI (`CLOUDFLARE_ACCOUNT_ID`, `CLOUDFLARE_API_TOKEN`).
    Cloudflare,
    /// OpenAI-compatible `/chat/completions` (`OPENAI_BASE_URL`, `OPENAI_API_KEY`).
    Openai,
}

/// CLI arguments for the relay server.
#[derive(Parser, Debug)]
#[command(name = "cachamita_server", about = "Cachamita chat relay server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8787")]
    bind: String,

    /// PostgreSQL connection URL for the `menu_items` table.
    #[arg(long, env = "DATABASE_URL", conflicts_with = "menu_file")]
    database_url: Option<String>,

    /// JSON file with an array of menu items, used instead of a database.
    #[arg(long, env = "MENU_FILE")]
    menu_file: Option<PathBuf>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Directory with the chat page assets, relative to the working directory.
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// YAML persona file; built-in defaults are used when omitted.
    #[arg(long, env = "PERSONA_FILE")]
    persona: Option<PathBuf>,

    /// Inference backend.
    #[arg(long, env = "INFERENCE_PROVIDER", value_enum, default_value_t = Provider::Cloudflare)]
    provider: Provider,

    /// Model identifier passed to the provider.
    #[arg(long, env = "MODEL_ID", default_value = DEFAULT_MODEL)]
    model: String,

    /// Maximum output tokens per reply.
    #[arg(long, env = "MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,cachamita_api=debug,cachamita_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    info!(bind = %args.bind, provider = ?args.provider, model = %args.model, "starting cachamita_server");

    let menu = build_menu(&args).await?;
    let completions = build_provider(&args)?;

    let persona = match &args.persona {
        Some(path) => {
            info!(path = %path.display(), "loading persona");
            Persona::from_yaml_file(path)?
        }
        None => Persona::default(),
    };

    if !args.static_dir.is_dir() {
        warn!(static_dir = %args.static_dir.display(), "static directory not found; page requests will 404");
    }

    let config = ApiConfig {
        bind_addr: args.bind.clone(),
        static_dir: args.static_dir.clone(),
        limits: CompletionLimits {
            max_tokens: args.max_tokens,
        },
    };

    let state = cachamita_api::AppState {
        menu,
        completions,
        persona: Arc::new(persona),
        config: config.clone(),
    };

    let app = cachamita_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "chat relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

/// Connect the configured menu source.
async fn build_menu(args: &Args) -> Result<Arc<dyn MenuLookup>, Box<dyn std::error::Error>> {
    if let Some(database_url) = &args.database_url {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await?;

        info!("running database migrations");
        cachamita_core::migrate::migrate(&pool).await?;
        return Ok(Arc::new(PgMenu::new(pool)));
    }

    if let Some(path) = &args.menu_file {
        let menu = InMemoryMenu::from_json_file(path)?;
        info!(path = %path.display(), items = menu.len(), "loaded menu file");
        return Ok(Arc::new(menu));
    }

    Err("no menu source configured: set DATABASE_URL or MENU_FILE".into())
}

/// Build the configured inference provider.
fn build_provider(args: &Args) -> Result<Arc<dyn CompletionProvider>, CompletionError> {
    let client = reqwest::Client::new();
    let provider: Arc<dyn CompletionProvider> = match args.provider {
        Provider::Cloudflare => Arc::new(CloudflareAi::from_env(client, &args.model)?),
        Provider::Openai => Arc::new(OpenAiCompatible::from_env(client, &args.model)),
    };
    Ok(provider)
}
