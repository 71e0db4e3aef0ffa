//! SDShare feed endpoints.

use axum::{
    extract::{Query, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE, VARY},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use cassa_core::{AcceptList, FeedHandler, FeedProducer, GraphRef, UNKNOWN_MODIFICATION};
use serde::Deserialize;

use super::graphs::header_str;
use crate::error::{Error, Result};
use crate::state::AppState;

fn default_since() -> i64 {
    UNKNOWN_MODIFICATION
}

/// Query parameters of the per-graph feeds.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub graph: Option<String>,
    pub default: Option<String>,
    /// Only changes strictly after this instant (epoch millis) are listed.
    #[serde(default = "default_since")]
    pub since: i64,
}

impl FeedParams {
    fn target(&self) -> Result<GraphRef> {
        match (&self.graph, &self.default) {
            (Some(uri), None) => Ok(GraphRef::named(uri.clone())),
            (None, Some(_)) => Ok(GraphRef::Default),
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "'graph' and 'default' are mutually exclusive".into(),
            )),
            (None, None) => Err(Error::InvalidInput(
                "either 'graph' or 'default' is required".into(),
            )),
        }
    }
}

/// GET /feeds
pub async fn collection_feed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    render_feed(state, &headers, |producer, handler| {
        producer.collection_feed(handler)
    })
    .await
}

/// GET /feeds/fragments?graph=|default[&since=]
pub async fn fragments_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let graph = params.target()?;
    let since = params.since;
    Ok(render_feed(state, &headers, move |producer, handler| {
        producer.fragments_feed(handler, &graph, since)
    })
    .await)
}

/// GET /feeds/snapshots?graph=|default
pub async fn snapshots_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let graph = params.target()?;
    Ok(render_feed(state, &headers, move |producer, handler| {
        producer.snapshots_feed(handler, &graph)
    })
    .await)
}

/// Negotiates a feed writer and renders one feed into the response body.
async fn render_feed<F>(state: AppState, headers: &HeaderMap, produce: F) -> Response
where
    F: FnOnce(&FeedProducer<'_>, &mut dyn FeedHandler) -> cassa_core::Result<()>
        + Send
        + 'static,
{
    let accept = AcceptList::from_header(header_str(headers, ACCEPT));
    let rendered = tokio::task::spawn_blocking(move || -> cassa_core::Result<_> {
        let factory = state
            .feeds
            .negotiate(&accept)
            .map_err(|supported| cassa_core::Error::NotAcceptable { supported })?;
        let mut buf = Vec::new();
        {
            let mut handler = factory.create(Box::new(&mut buf));
            produce(&state.feed_producer(), handler.as_mut())?;
        }
        Ok((factory.media_type(), buf))
    })
    .await;

    let mut response = match rendered {
        Ok(Ok((media_type, body))) => match HeaderValue::from_str(&media_type.to_string()) {
            Ok(content_type) => (StatusCode::OK, [(CONTENT_TYPE, content_type)], body).into_response(),
            Err(e) => Error::Internal(e.to_string()).into_response(),
        },
        Ok(Err(e)) => Error::from(e).into_response(),
        Err(e) => Error::from(e).into_response(),
    };
    response
        .headers_mut()
        .insert(VARY, HeaderValue::from_static("Accept"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(graph: Option<&str>, default: Option<&str>) -> FeedParams {
        FeedParams {
            graph: graph.map(str::to_string),
            default: default.map(str::to_string),
            since: default_since(),
        }
    }

    #[test]
    fn test_feed_target() {
        assert_eq!(
            params(Some("urn:g"), None).target().unwrap(),
            GraphRef::named("urn:g")
        );
        assert_eq!(params(None, Some("")).target().unwrap(), GraphRef::Default);
        assert!(params(None, None).target().is_err());
        assert!(params(Some("urn:g"), Some("")).target().is_err());
    }
}
