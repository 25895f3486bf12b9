//! porygonbot-server/src/server.rs
//!
//! Startup replay, the long-running tasks, and the shutdown drain.

use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use porygonbot_core::auth::oauth_routes;
use porygonbot_core::platforms::twitch::EventSubSession;
use porygonbot_core::repositories::CredentialsRepository;
use porygonbot_core::Error;

use crate::config::FileConfig;
use crate::context::ServerContext;
use crate::dashboard;
use crate::Args;

/// How long credential writes still in flight may hold up shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run_server(args: Args, cfg: FileConfig) -> Result<(), Error> {
    let ctx = ServerContext::new(&args, &cfg).await?;

    // 1) Dispatcher subscribes before anything can publish
    let rx = ctx.event_bus.subscribe(None).await;
    let dispatcher_handle = {
        let dispatcher = ctx.dispatcher.clone();
        tokio::spawn(async move { dispatcher.run(rx).await })
    };

    // 2) Websocket session; subscriptions wait on its session id
    let session = EventSubSession::new(ctx.transport.clone(), ctx.event_bus.clone())
        .with_url(args.eventsub_url.clone());
    let session_handle = tokio::spawn(async move {
        if let Err(e) = session.run().await {
            error!("EventSub session ended with error: {}", e);
        }
    });

    // 3) Startup replay: stored credentials -> token cache -> subscriptions
    let records = ctx.credentials_repo.list_all().await?;
    info!("Loaded {} stored credential(s)", records.len());
    let restore = ctx.authenticator.restore(&records).await?;
    for (uid, reason) in &restore.failed {
        warn!("user_id={} must authorize again: {}", uid, reason);
    }
    if !records.iter().any(|r| r.user_id == args.bot_id) {
        warn!(
            "No credentials for the bot account; authorize it at http://{}/oauth",
            args.http_addr
        );
    }
    if !records.iter().any(|r| r.user_id == args.owner_id) {
        info!(
            "Channel owner {} has not authorized yet; visit http://{}/oauth",
            args.owner_id, args.http_addr
        );
    }
    let report = ctx.subscriptions.bootstrap(&records).await;
    info!(
        "Listening to {} channel(s), {} rejected",
        report.accepted.len(),
        report.rejected.len()
    );

    // 4) HTTP: OAuth callback + chatter API
    let app = oauth_routes(ctx.oauth_state.clone())
        .merge(dashboard::routes(ctx.activity.clone()))
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(args.http_addr).await?;
    info!("HTTP server listening on http://{}", args.http_addr);
    let http_handle = {
        let bus = ctx.event_bus.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { bus.wait_for_shutdown().await })
                .await
        })
    };

    // 5) Ctrl-C flips the shutdown flag everything above listens to
    {
        let bus = ctx.event_bus.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Error waiting for ctrl_c: {:?}", e);
            }
            info!("Ctrl-C detected; shutting down event bus...");
            bus.shutdown();
        });
    }

    ctx.event_bus.wait_for_shutdown().await;
    info!("Shutdown signaled; draining.");

    match dispatcher_handle.await {
        Ok(rx) => {
            if !ctx.dispatcher.drain(rx, DRAIN_TIMEOUT).await {
                warn!("Some credential writes did not finish before shutdown");
            }
        }
        Err(e) => warn!("Dispatcher task ended abnormally: {}", e),
    }
    if let Err(e) = session_handle.await {
        warn!("EventSub task ended abnormally: {}", e);
    }
    match http_handle.await {
        Ok(Err(e)) => warn!("HTTP server error: {}", e),
        Err(e) => warn!("HTTP task ended abnormally: {}", e),
        Ok(Ok(())) => {}
    }

    ctx.db.close().await;
    info!("Server shutdown complete.");
    Ok(())
}
