//! Request helpers and waits for integration tests

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tidlarr::Event;
use tower::ServiceExt;

/// Send a request through the router, returning status and body text
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_json(app: &Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{uri} answered {status}: {body}");
    serde_json::from_str(&body).unwrap_or_else(|e| panic!("{uri} is not JSON ({e}): {body}"))
}

/// Path and query of an absolute link, so it can be replayed against the router
pub fn local_path(link: &str) -> String {
    let url = url::Url::parse(link).unwrap();
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Multipart upload of an NZB to `mode=addfile`
pub fn addfile_request(api_key: &str, file_name: &str, content: &str) -> Request<Body> {
    let boundary = "integration-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"name\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/x-nzb\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::post(format!("/api?mode=addfile&cat=music&apikey={api_key}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Wait for the acquisition of `id` to end, returning the terminal event
pub async fn wait_for_outcome(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: &str,
) -> Event {
    tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            match events.recv().await {
                Ok(event @ Event::Completed { .. })
                | Ok(event @ Event::Stalled { .. })
                | Ok(event @ Event::Failed { .. }) => {
                    let event_id = match &event {
                        Event::Completed { id, .. }
                        | Event::Stalled { id, .. }
                        | Event::Failed { id, .. } => id.as_str().to_string(),
                        _ => String::new(),
                    };
                    if event_id == id {
                        return event;
                    }
                }
                Ok(_) => continue,
                Err(e) => panic!("event channel failed: {e}"),
            }
        }
    })
    .await
    .expect("acquisition did not finish in time")
}
