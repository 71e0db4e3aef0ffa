//! Graph resource endpoints: direct (`/g/{*path}`) and indirect
//! (`/service?graph=` / `/service?default`) identification.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{
        header::{
            ACCEPT, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
            LOCATION, VARY,
        },
        HeaderMap, HeaderName, HeaderValue, Method as HttpMethod, StatusCode,
    },
    response::{IntoResponse, Response},
};
use cassa_core::conditional::quote_etag;
use cassa_core::{
    dates, AcceptList, GraphRef, MediaType, Method, Outcome, Preconditions, ProtocolRequest,
    Validators,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::state::AppState;

/// Query parameters of `/g/{*path}`.
#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
    /// Restricts PUT and DELETE to the statements of one subject.
    pub subject: Option<String>,
}

/// Query parameters of `/service`.
#[derive(Debug, Default, Deserialize)]
pub struct ServiceParams {
    pub graph: Option<String>,
    /// Present (with any value) to address the default graph.
    pub default: Option<String>,
    pub subject: Option<String>,
}

impl ServiceParams {
    /// The addressed graph; `None` if neither `graph` nor `default` is given.
    pub fn target(&self) -> Result<Option<GraphRef>> {
        match (&self.graph, &self.default) {
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "'graph' and 'default' are mutually exclusive".into(),
            )),
            (Some(uri), None) => Ok(Some(GraphRef::named(uri.clone()))),
            (None, Some(_)) => Ok(Some(GraphRef::Default)),
            (None, None) => Ok(None),
        }
    }
}

/// Any method on `/g/{*path}`.
pub async fn direct_graph(
    State(state): State<AppState>,
    method: HttpMethod,
    Path(path): Path<String>,
    Query(params): Query<GraphParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let target = GraphRef::named(state.endpoint.resolve_path(&path));
    let request = protocol_request(&method, Some(target), params.subject, &headers, body)?;
    execute(state, request).await
}

/// Any method on `/service`.
pub async fn service_graph(
    State(state): State<AppState>,
    method: HttpMethod,
    Query(params): Query<ServiceParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let target = params.target()?;
    let request = protocol_request(&method, target, params.subject, &headers, body)?;
    execute(state, request).await
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn protocol_request(
    method: &HttpMethod,
    target: Option<GraphRef>,
    subject: Option<String>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<ProtocolRequest> {
    let method: Method = method.as_str().parse()?;
    let accept = AcceptList::from_header(header_str(headers, ACCEPT));
    let preconditions = Preconditions::from_headers(
        header_str(headers, IF_NONE_MATCH),
        header_str(headers, IF_MODIFIED_SINCE),
    );

    let mut request = ProtocolRequest::new(method, target)
        .with_accept(accept)
        .with_preconditions(preconditions)
        .with_body(body.to_vec());
    if let Some(content_type) = header_str(headers, CONTENT_TYPE) {
        request = request.with_content_type(MediaType::parse(content_type)?);
    }
    if let Some(subject) = subject {
        request = request.with_subject(subject);
    }
    Ok(request)
}

/// Runs the request on the blocking pool; stores do synchronous I/O.
async fn execute(state: AppState, request: ProtocolRequest) -> Result<Response> {
    let method = request.method;
    let protocol = state.protocol.clone();
    let (outcome, body) = tokio::task::spawn_blocking(move || -> cassa_core::Result<_> {
        let mut outcome = protocol.handle(request)?;
        let body = match &mut outcome {
            Outcome::Ok { representation, .. } => {
                representation.take().map(|r| r.into_bytes()).transpose()?
            }
            _ => None,
        };
        Ok((outcome, body))
    })
    .await??;

    tracing::debug!(%method, status = outcome.status_code(), "graph request handled");
    outcome_response(outcome, body)
}

fn outcome_response(outcome: Outcome, body: Option<Vec<u8>>) -> Result<Response> {
    let vary = outcome.varies_on_accept();
    let mut response = match outcome {
        Outcome::Ok {
            media_type,
            validators,
            ..
        } => {
            let mut headers = validator_headers(&validators)?;
            headers.insert(CONTENT_TYPE, header_value(&media_type.to_string())?);
            (StatusCode::OK, headers, Body::from(body.unwrap_or_default())).into_response()
        }
        Outcome::NotModified { validators } => {
            (StatusCode::NOT_MODIFIED, validator_headers(&validators)?).into_response()
        }
        Outcome::Created { location, .. } => {
            (StatusCode::CREATED, [(LOCATION, header_value(&location)?)]).into_response()
        }
        Outcome::NoContent => StatusCode::NO_CONTENT.into_response(),
        Outcome::Accepted => StatusCode::ACCEPTED.into_response(),
        Outcome::NotAcceptable { supported } => {
            Error::from(cassa_core::Error::NotAcceptable { supported }).into_response()
        }
        Outcome::BadRequest { reason } => Error::InvalidInput(reason).into_response(),
    };
    if vary {
        response
            .headers_mut()
            .insert(VARY, HeaderValue::from_static("Accept"));
    }
    Ok(response)
}

fn validator_headers(validators: &Validators) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(etag) = &validators.etag {
        headers.insert(ETAG, header_value(&quote_etag(etag))?);
    }
    if let Some(date) = validators.last_modified.and_then(dates::to_http_date) {
        headers.insert(LAST_MODIFIED, header_value(&date)?);
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Internal(format!("invalid header value {:?}: {}", value, e)))
}
