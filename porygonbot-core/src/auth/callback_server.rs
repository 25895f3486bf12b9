use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use dashmap::DashSet;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tracing::{error, info, warn};

use porygonbot_common::traits::ChatTransport;
use crate::eventbus::EventBus;
use crate::platforms::twitch::TwitchOAuthClient;

/// `GET /oauth?scopes=a+b`
#[derive(Debug, Deserialize)]
pub struct StartQuery {
    scopes: Option<String>,
}

/// Query string we expect from Twitch: ?code=xxx&state=...
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Shared state for the OAuth routes.
#[derive(Clone)]
pub struct OAuthRouteState {
    pub oauth: TwitchOAuthClient,
    pub transport: Arc<dyn ChatTransport>,
    pub event_bus: Arc<EventBus>,
    pub default_scopes: Vec<String>,
    pending_states: Arc<DashSet<String>>,
}

impl OAuthRouteState {
    pub fn new(
        oauth: TwitchOAuthClient,
        transport: Arc<dyn ChatTransport>,
        event_bus: Arc<EventBus>,
        default_scopes: Vec<String>,
    ) -> Self {
        Self {
            oauth,
            transport,
            event_bus,
            default_scopes,
            pending_states: Arc::new(DashSet::new()),
        }
    }
}

/// `/oauth` (redirect to Twitch) and `/oauth/callback` (code exchange).
pub fn oauth_routes(state: OAuthRouteState) -> Router {
    Router::new()
        .route("/oauth", get(start_oauth))
        .route("/oauth/callback", get(handle_callback))
        .with_state(state)
}

fn new_state_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

async fn start_oauth(
    State(state): State<OAuthRouteState>,
    Query(query): Query<StartQuery>,
) -> Redirect {
    let scopes: Vec<String> = match query.scopes.as_deref() {
        Some(s) if !s.trim().is_empty() => s.split_whitespace().map(str::to_string).collect(),
        _ => state.default_scopes.clone(),
    };
    let token = new_state_token();
    state.pending_states.insert(token.clone());
    Redirect::to(&state.oauth.authorize_url(&scopes, &token))
}

async fn handle_callback(
    State(state): State<OAuthRouteState>,
    Query(query): Query<AuthQuery>,
) -> Response {
    if let Some(err) = query.error.as_ref() {
        let desc = query.error_description.clone().unwrap_or_default();
        warn!("OAuth error from Twitch: {} {}", err, desc);
        let msg = format!("<h2>OAuth Error</h2><p>{}</p><p>{}</p>", err, desc);
        return (StatusCode::BAD_REQUEST, Html(msg)).into_response();
    }

    let known_state = query
        .state
        .as_ref()
        .is_some_and(|s| state.pending_states.remove(s).is_some());
    if !known_state {
        return (StatusCode::BAD_REQUEST, Html("<h2>Unknown or missing state</h2>")).into_response();
    }

    let Some(code) = query.code.as_deref() else {
        let msg = "<h2>Missing 'code' query param</h2><p>Check logs or try again.</p>";
        return (StatusCode::BAD_REQUEST, Html(msg)).into_response();
    };

    let grant = match state.oauth.exchange_code(code).await {
        Ok(g) => g,
        Err(e) => {
            error!("OAuth code exchange failed: {}", e);
            return (StatusCode::BAD_GATEWAY, Html("<h2>Token exchange failed</h2>")).into_response();
        }
    };

    // The claimed id comes from asking Twitch who the fresh token belongs to.
    let claimed = match state.transport.validate_token(&grant.access_token).await {
        Ok(identity) => identity.user_id,
        Err(e) => {
            error!("Freshly issued token did not validate: {}", e);
            return (StatusCode::BAD_GATEWAY, Html("<h2>Token validation failed</h2>")).into_response();
        }
    };

    info!("OAuth completed for user_id={}", claimed);
    state
        .event_bus
        .publish_authorized(Some(claimed), &grant.access_token, &grant.refresh_token)
        .await;

    let success = r#"
<h2>Authentication Successful</h2>
<p>Porygon Bot is now connected. You can close this window now.</p>
"#;
    (StatusCode::OK, Html(success)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventbus::BotEvent;
    use crate::test_utils::FakeTransport;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::{routing::post, Json};
    use tower::ServiceExt;

    async fn fake_token_endpoint() -> String {
        let router = Router::new().route(
            "/token",
            post(|| async {
                Json(serde_json::json!({
                    "access_token": "A1", "refresh_token": "R1", "expires_in": 14000
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn route_state(oauth_base: &str, bus: Arc<EventBus>) -> OAuthRouteState {
        let oauth = TwitchOAuthClient::new(reqwest::Client::new(), "cid", None, "http://localhost/oauth/callback")
            .with_oauth_base(oauth_base);
        let transport = Arc::new(FakeTransport::new("1388303571").with_user("A1", "111"));
        OAuthRouteState::new(oauth, transport, bus, vec!["channel:bot".into()])
    }

    fn state_param(location: &str) -> String {
        let url = url::Url::parse(location).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn start_redirects_with_scopes() {
        let bus = Arc::new(EventBus::new());
        let app = oauth_routes(route_state("http://unused", bus));

        let resp = app
            .oneshot(Request::get("/oauth?scopes=user:read:chat%20user:bot").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.contains("scope=user%3Aread%3Achat%20user%3Abot"));
    }

    #[tokio::test]
    async fn callback_publishes_authorized_with_validated_id() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe(Some(4)).await;
        let base = fake_token_endpoint().await;
        let app = oauth_routes(route_state(&base, bus.clone()));

        let start = app
            .clone()
            .oneshot(Request::get("/oauth").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let location = start.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(location.contains("scope=channel%3Abot"));
        let st = state_param(&location);

        let resp = app
            .clone()
            .oneshot(
                Request::get(format!("/oauth/callback?code=abc&state={st}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        match rx.recv().await.unwrap() {
            BotEvent::Authorized(a) => {
                assert_eq!(a.claimed_user_id.as_deref(), Some("111"));
                assert_eq!(a.tokens.access_token, "A1");
                assert_eq!(a.tokens.refresh_token, "R1");
            }
            other => panic!("unexpected {}", other.event_type()),
        }

        // a state is single-use
        let replay = app
            .oneshot(
                Request::get(format!("/oauth/callback?code=abc&state={st}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_error_param_is_rejected() {
        let bus = Arc::new(EventBus::new());
        let app = oauth_routes(route_state("http://unused", bus));
        let resp = app
            .oneshot(
                Request::get("/oauth/callback?error=access_denied&error_description=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
