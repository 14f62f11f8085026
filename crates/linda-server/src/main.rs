use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use linda_api::llm::OpenAiChat;
use linda_api::storage::LocalStore;
use linda_api::transcribe::WhisperTranscriber;
use linda_api::{AppState, AppStateInner};
use linda_db::Database;
use linda_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "linda=debug,linda_api=debug,linda_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    // The API keeps serving public content without a database.
    let db = match open_database(&config) {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("Database not available ({}): {:#}", config.db_path.display(), e);
            None
        }
    };

    let store = LocalStore::new(config.upload_dir.clone(), &config.public_url).await?;
    let upload_dir = store.dir().to_path_buf();

    if config.llm_api_key.is_empty() {
        warn!("LINDA_LLM_API_KEY is not set; chat and transcription calls will likely fail");
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        owner_open_id: config.owner_open_id.clone(),
        chat_model: Arc::new(OpenAiChat::new(
            &config.llm_api_url,
            &config.llm_api_key,
            &config.llm_model,
        )),
        transcriber: Arc::new(WhisperTranscriber::new(
            &config.llm_api_url,
            &config.llm_api_key,
            &config.stt_model,
        )),
        store: Arc::new(store),
    });

    let app = linda_api::app(state)
        .merge(linda_api::router::uploads(upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Linda server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = Database::open(&config.db_path)?;
    let seeded = db.seed_defaults()?;
    info!(
        "Database ready at {} (seeded {} lessons, {} tips, {} help centers, {} stories)",
        config.db_path.display(),
        seeded.lessons,
        seeded.privacy_tips,
        seeded.help_centers,
        seeded.stories
    );
    Ok(db)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
