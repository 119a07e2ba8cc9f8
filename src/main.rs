mod config;
mod db;
mod services;
mod store;

use std::process::ExitCode;
use std::sync::Arc;

use scene::session::SessionCore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::services::auth::{AuthError, GoTrueClient, IdentityProvider};
use crate::services::feed::{self, PgPresenceChannel};
use crate::services::session::{Collaborators, SessionActor, SessionCommand, SessionInput};
use crate::store::{PgSceneRepository, StoreError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl StartupError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Database(_) => "E_DATABASE",
            Self::Store(e) => e.error_code(),
            Self::Auth(e) => e.error_code(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenv {
        debug!(error = %e, "no .env loaded");
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "scenebuilder failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    let auth = Arc::new(GoTrueClient::new(&config.auth));
    let account = auth
        .sign_in(&config.auth.email, &config.auth.password)
        .await?;

    let (tx, rx) = mpsc::channel(config.session_queue_capacity);
    let feed = feed::spawn_feed(&pool, tx.clone()).await?;
    let driver = spawn_driver(tx.clone());

    let deps = Collaborators {
        repo: Arc::new(PgSceneRepository::new(pool.clone())),
        presence: Arc::new(PgPresenceChannel::new(pool)),
        auth,
    };
    let core = SessionCore::with_settings(config.tombstone_ttl_ms, config.notice_duration_ms);
    let mut actor = SessionActor::new(core, deps, tx, account.access_token);
    actor.start(account.identity);
    info!("scenebuilder session running; reading commands from stdin");

    let core = actor.run(rx).await;
    feed.abort();
    driver.abort();
    info!(objects = core.scene.len(), "session finished");
    Ok(())
}

/// Forward newline-delimited JSON commands from stdin. End of input signs out.
fn spawn_driver(tx: mpsc::Sender<SessionInput>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "stdin read failed");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionCommand>(line) {
                Ok(command) => {
                    if tx.send(SessionInput::Command(command)).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, %line, "unrecognized command"),
            }
        }
        if tx
            .send(SessionInput::Command(SessionCommand::SignOut))
            .await
            .is_err()
        {
            debug!("session already closed at end of input");
        }
    })
}
