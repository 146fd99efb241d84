//! Warden HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the request plumbing they share: actor
//! extraction, the internal API-key guard, and paging parameters.
pub mod changes;
pub mod check;
pub mod error;
pub mod menus;
pub mod openapi;
pub mod permissions;
pub mod roles;
pub mod system;
pub mod types;
pub mod users;

use crate::api::error::{ApiError, api_unauthorized, api_validation_error};
use crate::app::AppState;
use crate::model::{Actor, ActorType};
use crate::principal::API_KEY_HEADER;
use crate::store::PageRequest;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_TYPE_HEADER: &str = "X-Actor-Type";

/// Caller identity recorded on change records.
///
/// Missing headers fall back to an anonymous user; an unknown actor type is
/// rejected.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let id = header(ACTOR_ID_HEADER).unwrap_or("anonymous").to_string();
        let kind = match header(ACTOR_TYPE_HEADER) {
            Some(value) => value
                .to_ascii_uppercase()
                .parse::<ActorType>()
                .map_err(|err| api_validation_error(&err))?,
            None => ActorType::User,
        };
        Ok(Self(Actor { id, kind }))
    }
}

/// Rejects `/v1` requests without the configured internal API key.
pub(crate) async fn require_internal_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.internal_api_key.as_deref() {
        let presented = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected) {
            tracing::warn!(uri = %request.uri(), "rejected request without internal api key");
            return Err(api_unauthorized("missing or invalid internal api key"));
        }
    }
    Ok(next.run(request).await)
}

/// Reads `page` and `page_size`; malformed values fall back to defaults.
pub(crate) fn page_from_query(params: &HashMap<String, String>) -> PageRequest {
    let defaults = PageRequest::default();
    let read = |name: &str, fallback: u32| {
        params
            .get(name)
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(fallback)
    };
    PageRequest {
        page: read("page", defaults.page),
        page_size: read("page_size", defaults.page_size),
    }
    .normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    async fn actor_from(request: HttpRequest<()>) -> Result<Actor, ApiError> {
        let (mut parts, _) = request.into_parts();
        RequestActor::from_request_parts(&mut parts, &())
            .await
            .map(|actor| actor.0)
    }

    #[tokio::test]
    async fn actor_defaults_to_anonymous_user() {
        let actor = actor_from(HttpRequest::new(())).await.expect("actor");
        assert_eq!(actor, Actor::user("anonymous"));
    }

    #[tokio::test]
    async fn actor_type_is_case_insensitive() {
        let request = HttpRequest::builder()
            .header(ACTOR_ID_HEADER, "billing-sync")
            .header(ACTOR_TYPE_HEADER, "service")
            .body(())
            .expect("request");
        let actor = actor_from(request).await.expect("actor");
        assert_eq!(actor, Actor::service("billing-sync"));
    }

    #[tokio::test]
    async fn unknown_actor_type_is_rejected() {
        let request = HttpRequest::builder()
            .header(ACTOR_TYPE_HEADER, "robot")
            .body(())
            .expect("request");
        let err = actor_from(request).await.expect_err("rejected");
        assert_eq!(err.body.code, "validation_error");
    }

    #[test]
    fn page_query_is_clamped() {
        let params = HashMap::from([
            ("page".to_string(), "0".to_string()),
            ("page_size".to_string(), "1000".to_string()),
        ]);
        let page = page_from_query(&params);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, crate::store::MAX_PAGE_SIZE);
        assert_eq!(page_from_query(&HashMap::new()), PageRequest::default());
    }
}
