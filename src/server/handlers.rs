//! server::handlers
//!
//! Request handlers for the publish (`POST /`) and query (`GET /?q=`)
//! endpoints.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::auth::bearer_token;
use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::mf2::document::ACCESS_TOKEN;
use crate::mf2::{CreateRequest, ValidationError};
use crate::publisher::PublishError;

/// The only action this endpoint performs.
const CREATE_ACTION: &str = "create";

const JSON_TYPE: &str = "application/json";
const FORM_TYPE: &str = "application/x-www-form-urlencoded";

/// `POST /`: publish a new post.
///
/// Answers `202 Accepted` with the post's public URL in `Location`.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let request = decode_body(&headers, &body)?;

    let token = header_token(&headers).or_else(|| request.access_token());
    state.authorizer.authorize(token).await?;

    if let Some(action) = request.action() {
        if action != CREATE_ACTION {
            return Err(ApiError::UnsupportedAction(action.to_string()));
        }
    }

    let now = Utc::now().with_timezone(&state.publisher.offset());
    let published = state.publisher.publish(request, now).await?;
    info!(location = %published.location, "create request accepted");

    Ok((StatusCode::ACCEPTED, [(LOCATION, published.location)]).into_response())
}

/// `GET /?q=...`: answer a configuration query.
pub async fn query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let token = header_token(&headers).or_else(|| params.get(ACCESS_TOKEN).map(String::as_str));
    state.authorizer.authorize(token).await?;

    let q = params
        .get("q")
        .ok_or_else(|| ApiError::BadQuery("missing 'q' parameter".to_string()))?;
    debug!(%q, "query");

    match q.as_str() {
        "config" => {
            let mut body = Map::new();
            if let Some(endpoint) = &state.query.media_endpoint {
                body.insert("media-endpoint".to_string(), Value::from(endpoint.as_str()));
            }
            if !state.query.syndicate_to.is_empty() {
                body.insert("syndicate-to".to_string(), syndication_targets(&state));
            }
            Ok(Json(Value::Object(body)))
        }
        "syndicate-to" => Ok(Json(json!({ "syndicate-to": syndication_targets(&state) }))),
        other => Err(ApiError::BadQuery(format!("unsupported query '{other}'"))),
    }
}

fn syndication_targets(state: &AppState) -> Value {
    state
        .query
        .syndicate_to
        .iter()
        .map(|t| json!({ "uid": t.uid, "name": t.name }))
        .collect()
}

fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

/// Decode a create request body according to its content type.
fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<CreateRequest, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        JSON_TYPE => {
            let value: Value = serde_json::from_slice(body).map_err(|e| {
                PublishError::Validation(ValidationError::MalformedJson(e.to_string()))
            })?;
            Ok(CreateRequest::from_parts(Some(value), Vec::new()))
        }
        FORM_TYPE => {
            let fields = url::form_urlencoded::parse(body).into_owned().collect();
            Ok(CreateRequest::Form(fields))
        }
        "" => Err(ApiError::UnsupportedMediaType(
            "missing content type".to_string(),
        )),
        _ => Err(ApiError::UnsupportedMediaType(content_type.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_type(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    mod decoding {
        use super::*;

        #[test]
        fn form_fields_keep_order() {
            let request = decode_body(
                &with_type("application/x-www-form-urlencoded; charset=utf-8"),
                b"category[]=b&content=hi+there&category[]=a",
            )
            .unwrap();
            assert_eq!(
                request,
                CreateRequest::Form(vec![
                    ("category[]".into(), "b".into()),
                    ("content".into(), "hi there".into()),
                    ("category[]".into(), "a".into()),
                ])
            );
        }

        #[test]
        fn json_body() {
            let request = decode_body(&with_type("Application/JSON"), br#"{"type":["h-entry"]}"#)
                .unwrap();
            assert!(matches!(request, CreateRequest::Json(_)));
        }

        #[test]
        fn malformed_json_is_validation() {
            let err = decode_body(&with_type("application/json"), b"{").unwrap_err();
            assert!(matches!(
                err,
                ApiError::Publish(PublishError::Validation(ValidationError::MalformedJson(_)))
            ));
        }

        #[test]
        fn other_types_rejected() {
            assert!(matches!(
                decode_body(&with_type("text/plain"), b"x"),
                Err(ApiError::UnsupportedMediaType(_))
            ));
            assert!(matches!(
                decode_body(&HeaderMap::new(), b"x"),
                Err(ApiError::UnsupportedMediaType(_))
            ));
        }
    }

    #[test]
    fn header_token_requires_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(header_token(&headers), Some("tok"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic tok"));
        assert_eq!(header_token(&headers), None);
    }
}
