//! Read-only query server
//!
//! Every handler reads [`SharedState`] at request time and never blocks the
//! poll loop for longer than one snapshot clone.

use axum::{
    Json, Router,
    extract::State,
    response::Html,
    routing::get,
};
use chrono::{DateTime, Utc};
use namewatch_core::{SharedState, Snapshot};
use serde_json::{Value, json};

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Latest published snapshot
    pub state: SharedState,
    /// Tracked handle, shown before the first observation
    pub handle: String,
}

/// Build the query router
pub fn router(state: SharedState, handle: impl Into<String>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/state", get(api_state))
        .route("/health", get(health))
        .with_state(AppState {
            state,
            handle: handle.into(),
        })
}

async fn index(State(app): State<AppState>) -> Html<String> {
    Html(render_index(&app.handle, app.state.read().await.as_ref()))
}

async fn api_state(State(app): State<AppState>) -> Json<Value> {
    Json(match app.state.read().await {
        Some(snapshot) => json!({ "status": "ok", "snapshot": snapshot }),
        None => json!({ "status": "pending" }),
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn render_index(handle: &str, snapshot: Option<&Snapshot>) -> String {
    let content = match snapshot {
        None => format!(
            "<p>Waiting for the first check of @{}...</p>",
            escape(handle)
        ),
        Some(snapshot) => {
            let status = if snapshot.changed() {
                "Name Updated! 🟢"
            } else {
                "No Name Change Detected. 🔴"
            };
            let last_change = snapshot
                .last_changed_at()
                .map(format_time)
                .unwrap_or_else(|| "No change observed yet".to_string());

            format!(
                "<h2>{name}</h2>\n\
                 <p>@{handle}</p>\n\
                 <p>Last checked: {observed}</p>\n\
                 <p>Last change: {last_change}</p>\n\
                 <p>Status: {status}</p>",
                name = escape(snapshot.name()),
                handle = escape(snapshot.handle()),
                observed = format_time(snapshot.observed_at()),
                last_change = last_change,
                status = status,
            )
        }
    };

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><meta http-equiv=\"refresh\" content=\"60\">\
         <title>namewatch</title></head>\n\
         <body>\n<h1>Display name tracker</h1>\n{}\n</body>\n\
         </html>\n",
        content
    )
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %I:%M:%S %p UTC").to_string()
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use namewatch_core::traits::Profile;
    use tower::ServiceExt;

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_732_800, 0).unwrap()
    }

    #[tokio::test]
    async fn test_api_state_pending_before_first_observation() {
        let app = router(SharedState::new(), "elonmusk");

        let (status, body) = get_body(app, "/api/state").await;
        assert_eq!(status, StatusCode::OK);

        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, json!({ "status": "pending" }));
    }

    #[tokio::test]
    async fn test_api_state_reflects_latest_snapshot() {
        let state = SharedState::new();
        let app = router(state.clone(), "elonmusk");

        state
            .write(Snapshot::new(
                &Profile::new("Kekius Maximus", "elonmusk"),
                t0(),
                true,
                Some(t0()),
            ))
            .await;

        let (_, body) = get_body(app, "/api/state").await;
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["status"], "ok");
        assert_eq!(value["snapshot"]["name"], "Kekius Maximus");
        assert_eq!(value["snapshot"]["handle"], "elonmusk");
        assert_eq!(value["snapshot"]["changed"], true);
    }

    #[tokio::test]
    async fn test_index_renders_snapshot() {
        let state = SharedState::new();
        state
            .write(Snapshot::new(
                &Profile::new("Elon Musk", "elonmusk"),
                t0(),
                false,
                None,
            ))
            .await;

        let (status, body) = get_body(router(state, "elonmusk"), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h2>Elon Musk</h2>"));
        assert!(body.contains("Last checked: 2025-01-01 12:00:00 PM UTC"));
        assert!(body.contains("No change observed yet"));
        assert!(body.contains("No Name Change Detected."));
    }

    #[tokio::test]
    async fn test_index_before_first_observation() {
        let (_, body) = get_body(router(SharedState::new(), "jack"), "/").await;
        assert!(body.contains("Waiting for the first check of @jack"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_body(router(SharedState::new(), "jack"), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_display_name_is_escaped() {
        let snapshot = Snapshot::new(
            &Profile::new("<script>alert('x')</script> & co", "jack"),
            t0(),
            false,
            None,
        );

        let html = render_index("jack", Some(&snapshot));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; co"));
    }
}
