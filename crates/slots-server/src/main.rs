//! `timeslots` binary.
//!
//! Reads `timeslots.toml` (or the path given with `--config`), opens the
//! SQLite store and either runs the reminder worker or performs a one-off
//! administrative command.
//!
//! # Key generation
//!
//! ```text
//! openssl genrsa -out keys/private_rsa.pem 2048
//! openssl rsa -in keys/private_rsa.pem -pubout -out keys/public_rsa.pem
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use slots_auth::{Authenticator, PasswordHasher, TokenIssuer, TokenVerifier, keys};
use slots_core::{clock::SystemClock, user::Role};
use slots_server::ServerConfig;
use slots_service::{CreateUser, LogNotifier, ScheduleService, Worker};
use slots_store_sqlite::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Coach/client meeting scheduler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "timeslots.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the reminder worker until interrupted.
  Serve,

  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,

  /// Create a user; the password is read from stdin.
  CreateUser {
    #[arg(long)]
    last_name:   String,
    #[arg(long)]
    first_name:  String,
    #[arg(long)]
    phone:       String,
    #[arg(long)]
    email:       Option<String>,
    #[arg(long)]
    role:        Role,
    /// Minutes before a meeting at which the reminder is sent.
    #[arg(long)]
    notify_lead: Option<i64>,
  },

  /// Log in with a phone number; prints a bearer token.
  Login {
    #[arg(long)]
    phone: String,
  },

  /// Check a bearer token and print its claims.
  VerifyToken { token: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to read config {:?}", cli.config))?;

  match cli.command {
    Command::Serve => serve(&cfg).await,
    Command::HashPassword => {
      let hasher = PasswordHasher::new(cfg.hash)?;
      println!("{}", hasher.hash(&read_password()?)?);
      Ok(())
    }
    Command::CreateUser {
      last_name,
      first_name,
      phone,
      email,
      role,
      notify_lead,
    } => {
      let service = service(&cfg).await?;
      let user = service
        .create_user(CreateUser {
          last_name,
          first_name,
          phone,
          email,
          password: read_password()?,
          role,
          notify_lead,
        })
        .await?;
      println!("{}", serde_json::to_string_pretty(&user)?);
      Ok(())
    }
    Command::Login { phone } => {
      let service = service(&cfg).await?;
      println!("{}", service.login(&phone, &read_password()?).await?);
      Ok(())
    }
    Command::VerifyToken { token } => {
      let key = keys::load_verifying_key(&cfg.public_key_path)
        .context("failed to load public key")?;
      let claims = TokenVerifier::new(key, &cfg.token.issuer).verify(&token)?;
      println!("{}", serde_json::to_string_pretty(&claims)?);
      Ok(())
    }
  }
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<Arc<SqliteStore>> {
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  Ok(Arc::new(store))
}

async fn service(cfg: &ServerConfig) -> anyhow::Result<ScheduleService<SqliteStore>> {
  let signing = keys::load_signing_key(&cfg.private_key_path)
    .context("failed to load private key")?;
  let auth = Authenticator::new(
    PasswordHasher::new(cfg.hash)?,
    TokenIssuer::new(signing, cfg.token.issuer.clone(), cfg.token.ttl())?,
  )?;
  Ok(ScheduleService::new(open_store(cfg).await?, auth))
}

async fn serve(cfg: &ServerConfig) -> anyhow::Result<()> {
  // Both keys must be present at startup even though only the worker runs
  // in this process.
  let service = service(cfg).await?;
  keys::load_verifying_key(&cfg.public_key_path)
    .context("failed to load public key")?;

  let cancel = CancellationToken::new();
  let worker = Worker::new(
    Arc::clone(service.store()),
    LogNotifier,
    Arc::new(SystemClock),
    cfg.worker,
  )
  .start(cancel.clone());

  tracing::info!(store = ?cfg.store_path, "timeslots running");
  tokio::signal::ctrl_c()
    .await
    .context("failed to listen for ctrl-c")?;

  tracing::info!("shutting down");
  cancel.cancel();
  worker.await.context("reminder worker panicked")?;
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
