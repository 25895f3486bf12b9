// File: porygonbot-core/src/platforms/twitch/eventsub.rs

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::eventbus::EventBus;
use crate::Error;
use super::events::{parse_twitch_notification, EventSubMessage, EventSubNotificationEnvelope, SessionPayload};
use super::transport::TwitchTransport;

pub const DEFAULT_EVENTSUB_URL: &str = "wss://eventsub.wss.twitch.tv/ws";

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read timeout before the first welcome tells us the real keepalive.
const INITIAL_IDLE_LIMIT: Duration = Duration::from_secs(30);
/// Slack on top of Twitch's keepalive before the socket counts as dead.
const KEEPALIVE_GRACE: Duration = Duration::from_secs(5);

/// Keeps one EventSub websocket alive and forwards notifications to the bus.
pub struct EventSubSession {
    transport: Arc<TwitchTransport>,
    event_bus: Arc<EventBus>,
    url: String,
    retry_delay: Duration,
}

impl EventSubSession {
    pub fn new(transport: Arc<TwitchTransport>, event_bus: Arc<EventBus>) -> Self {
        Self {
            transport,
            event_bus,
            url: DEFAULT_EVENTSUB_URL.to_string(),
            retry_delay: Duration::from_secs(15),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Runs until the bus shuts down.
    pub async fn run(self) -> Result<(), Error> {
        tokio::select! {
            res = self.start_loop() => res,
            _ = self.event_bus.wait_for_shutdown() => {
                info!("[EventSub] shutdown requested, closing session loop");
                self.transport.on_session_lost();
                Ok(())
            }
        }
    }

    /// Keeps the socket alive and hops when Twitch says so.
    async fn start_loop(&self) -> Result<(), Error> {
        let mut url = self.url.clone();
        let mut current_ws: Option<Ws> = None;

        loop {
            if current_ws.is_none() {
                match connect_async(url.as_str()).await {
                    Ok((ws, _)) => {
                        info!("[EventSub] connected → {}", url);
                        current_ws = Some(ws);
                    }
                    Err(e) => {
                        error!("[EventSub] connect error: {}", e);
                        self.transport.on_session_lost();
                        sleep(self.retry_delay).await;
                        url = self.url.clone();
                        continue;
                    }
                }
            }

            let Some(mut ws) = current_ws.take() else { continue };
            match self.run_read_loop(&mut ws).await {
                // Twitch asked us to hop to a new URL
                Ok(Some(new_url)) => {
                    warn!("[EventSub] reconnecting → {}", new_url);
                    match self.handle_reconnect(&mut ws, &new_url).await {
                        Ok(new_ws) => {
                            info!("[EventSub] Reconnect successful");
                            current_ws = Some(new_ws);
                            url = new_url;
                        }
                        Err(e) => {
                            error!("[EventSub] Reconnect failed: {}", e);
                            let _ = ws.close(None).await;
                            self.transport.on_session_lost();
                            sleep(self.retry_delay).await;
                            url = self.url.clone();
                        }
                    }
                }
                Ok(None) => {
                    warn!("[EventSub] websocket closed by server");
                    self.transport.on_session_lost();
                    sleep(self.retry_delay).await;
                    url = self.url.clone();
                }
                Err(e) => {
                    error!("[EventSub] loop error: {}", e);
                    let _ = ws.close(None).await;
                    self.transport.on_session_lost();
                    sleep(self.retry_delay).await;
                    url = self.url.clone();
                }
            }
        }
    }

    /// Connect to the new URL while the old connection stays open, and only
    /// drop the old one once the new welcome arrived.
    async fn handle_reconnect(&self, old_ws: &mut Ws, new_url: &str) -> Result<Ws, Error> {
        let (mut new_ws, _) = connect_async(new_url)
            .await
            .map_err(|e| Error::Platform(format!("Failed to connect to reconnect URL: {e}")))?;

        info!("[EventSub] Connected to new URL, waiting for welcome message...");
        match timeout(Duration::from_secs(10), Self::wait_for_welcome(&mut new_ws)).await {
            Ok(Ok(session_id)) => {
                // Subscriptions carry over on a reconnect hop.
                self.transport.on_session_migrated(&session_id).await;
                let _ = old_ws.close(None).await;
                Ok(new_ws)
            }
            Ok(Err(e)) => {
                let _ = new_ws.close(None).await;
                Err(e)
            }
            Err(_) => {
                let _ = new_ws.close(None).await;
                Err(Error::Platform("Timeout waiting for welcome message on reconnect".into()))
            }
        }
    }

    async fn wait_for_welcome(ws: &mut Ws) -> Result<String, Error> {
        while let Some(msg_res) = ws.next().await {
            let msg = msg_res?;
            if msg.is_close() {
                return Err(Error::Platform("Connection closed while waiting for welcome".into()));
            }
            let Message::Text(txt) = msg else { continue };
            let parsed: EventSubMessage = serde_json::from_str(txt.as_str())?;
            if parsed.metadata.message_type == "session_welcome" {
                let session: SessionPayload = serde_json::from_value(parsed.payload)?;
                return Ok(session.session.id);
            }
        }
        Err(Error::Platform("Connection closed without welcome message".into()))
    }

    /// Reads until the socket closes or a reconnect URL arrives.
    /// `Ok(Some(url))` → caller must reconnect to `url`.
    async fn run_read_loop(&self, ws: &mut Ws) -> Result<Option<String>, Error> {
        let mut idle_limit = INITIAL_IDLE_LIMIT;

        loop {
            let next = timeout(idle_limit, ws.next())
                .await
                .map_err(|_| Error::Platform("no message within keepalive window".into()))?;
            let Some(msg_res) = next else { return Ok(None) };
            let msg = msg_res?;

            if msg.is_close() {
                return Ok(None);
            }
            let Message::Text(txt) = msg else { continue };

            let parsed: EventSubMessage = match serde_json::from_str(txt.as_str()) {
                Ok(p) => p,
                Err(e) => {
                    warn!("[EventSub] bad json: {}", e);
                    continue;
                }
            };

            match parsed.metadata.message_type.as_str() {
                "session_welcome" => {
                    let session: SessionPayload = serde_json::from_value(parsed.payload)?;
                    if let Some(k) = session.session.keepalive_timeout_seconds {
                        idle_limit = Duration::from_secs(k) + KEEPALIVE_GRACE;
                    }
                    info!("[EventSub] session {} is live", session.session.id);
                    if let Err(e) = self.transport.on_session_welcome(&session.session.id).await {
                        error!("[EventSub] re-subscribe failed: {e}");
                    }
                }
                "session_keepalive" => trace!("keepalive"),
                "session_reconnect" => {
                    let session: SessionPayload = serde_json::from_value(parsed.payload)?;
                    let url = session
                        .session
                        .reconnect_url
                        .ok_or_else(|| Error::Platform("missing reconnect_url".into()))?;
                    return Ok(Some(url));
                }
                "notification" => {
                    debug!("[EventSub] notification {:?}", parsed.metadata.subscription_type);
                    let env: EventSubNotificationEnvelope = match serde_json::from_value(parsed.payload) {
                        Ok(env) => env,
                        Err(e) => {
                            warn!("[EventSub] bad notification envelope: {}", e);
                            continue;
                        }
                    };
                    if let Some(evt) = parse_twitch_notification(
                        &env.subscription.sub_type,
                        &env.event,
                        parsed.metadata.message_timestamp,
                    ) {
                        self.event_bus.publish(evt).await;
                    }
                }
                "revocation" => warn!("[EventSub] subscription revoked – check scopes"),
                other => debug!("unhandled message_type={:?}", other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventbus::BotEvent;
    use crate::platforms::twitch::auth::TwitchOAuthClient;
    use futures_util::SinkExt;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    fn welcome(id: &str) -> Value {
        json!({
            "metadata": {"message_id": "w", "message_type": "session_welcome",
                         "message_timestamp": "2024-05-01T12:00:00.123456789Z"},
            "payload": {"session": {"id": id, "status": "connected",
                        "keepalive_timeout_seconds": 10, "reconnect_url": null}}
        })
    }

    fn chat_notification(text: &str) -> Value {
        json!({
            "metadata": {"message_id": "n", "message_type": "notification",
                         "message_timestamp": "2024-05-01T12:00:01Z",
                         "subscription_type": "channel.chat.message",
                         "subscription_version": "1"},
            "payload": {
                "subscription": {"id": "sub", "type": "channel.chat.message", "version": "1",
                                 "status": "enabled", "condition": {}},
                "event": {
                    "broadcaster_user_id": "68184174", "broadcaster_user_login": "itsmejoji",
                    "broadcaster_user_name": "ItsMeJoji", "chatter_user_id": "555",
                    "chatter_user_login": "viewer", "chatter_user_name": "Viewer",
                    "message_id": "m1", "message": {"text": text}
                }
            }
        })
    }

    /// Accepts one websocket client, plays `script`, then idles.
    async fn scripted_server(script: Vec<Value>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for frame in script {
                ws.send(Message::text(frame.to_string())).await.unwrap();
            }
            sleep(Duration::from_secs(5)).await;
        });
        format!("ws://{addr}")
    }

    fn transport() -> Arc<TwitchTransport> {
        let http = reqwest::Client::new();
        let oauth = TwitchOAuthClient::new(http.clone(), "cid", None, "http://x");
        Arc::new(TwitchTransport::new(http, oauth, "1388303571"))
    }

    async fn next_chat(rx: &mut tokio::sync::mpsc::Receiver<BotEvent>) -> String {
        let evt = timeout(Duration::from_secs(3), rx.recv()).await.unwrap().unwrap();
        match evt {
            BotEvent::ChatMessage(c) => c.text,
            other => panic!("unexpected {}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn welcome_then_notification_reaches_bus() {
        let url = scripted_server(vec![welcome("sess-1"), chat_notification("hello")]).await;
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe(Some(8)).await;
        let transport = transport();

        let session = EventSubSession::new(transport.clone(), bus.clone())
            .with_url(url)
            .with_retry_delay(Duration::from_millis(50));
        let handle = tokio::spawn(session.run());

        assert_eq!(next_chat(&mut rx).await, "hello");
        assert_eq!(transport.current_session().as_deref(), Some("sess-1"));

        bus.shutdown();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap().unwrap();
        assert!(transport.current_session().is_none());
    }

    #[tokio::test]
    async fn reconnect_hops_to_new_url() {
        let second = scripted_server(vec![welcome("sess-2"), chat_notification("after hop")]).await;
        let reconnect = json!({
            "metadata": {"message_id": "r", "message_type": "session_reconnect",
                         "message_timestamp": "2024-05-01T12:00:02Z"},
            "payload": {"session": {"id": "sess-1", "status": "reconnecting",
                        "keepalive_timeout_seconds": null, "reconnect_url": second}}
        });
        let first = scripted_server(vec![welcome("sess-1"), reconnect]).await;

        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe(Some(8)).await;
        let transport = transport();
        let handle = tokio::spawn(
            EventSubSession::new(transport.clone(), bus.clone())
                .with_url(first)
                .with_retry_delay(Duration::from_millis(50))
                .run(),
        );

        assert_eq!(next_chat(&mut rx).await, "after hop");
        assert_eq!(transport.current_session().as_deref(), Some("sess-2"));

        bus.shutdown();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap().unwrap();
    }
}
