use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use porygonbot_core::platforms::twitch::eventsub::DEFAULT_EVENTSUB_URL;

mod config;
mod context;
mod dashboard;
mod server;

use config::FileConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "porygonbot")]
#[command(author, version, about = "Porygon Bot - Twitch chat bot")]
pub struct Args {
    /// Twitch application client id.
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    pub client_id: String,

    /// Twitch application client secret (needed for code exchange and refresh).
    #[arg(long, env = "TWITCH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// User id of the bot account.
    #[arg(long, env = "BOT_ID", default_value = "1388303571")]
    pub bot_id: String,

    /// User id of the channel owner, used for startup hints only.
    #[arg(long, env = "OWNER_ID", default_value = "68184174")]
    pub owner_id: String,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://tokens.db")]
    pub database_url: String,

    /// Address for the OAuth callback and the chatter API.
    #[arg(long, env = "HTTP_ADDR", default_value = "127.0.0.1:3000")]
    pub http_addr: SocketAddr,

    #[arg(long, env = "REDIRECT_URI", default_value = "http://localhost:3000/oauth/callback")]
    pub redirect_uri: String,

    #[arg(long, env = "EVENTSUB_URL", default_value = DEFAULT_EVENTSUB_URL)]
    pub eventsub_url: String,

    /// Optional JSON file with classifier texts, activity retention and OAuth scopes.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("porygonbot_core=info,porygonbot_server=info,tower_http=info"));
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    dotenv::dotenv().ok();
    init_tracing()?;

    let args = Args::parse();
    info!(
        "Porygon Bot starting. bot_id={}, db={}, http={}",
        args.bot_id, args.database_url, args.http_addr
    );

    let file_config = FileConfig::load(args.config.as_deref())?;

    if let Err(e) = server::run_server(args, file_config).await {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
