//! Credential extraction middleware.
//!
//! Collects every place a session token may appear in a request and stores
//! the winning [`Credential`] in the request extensions for the auth
//! extractors. JSON bodies are buffered so a `token` or `discordAuth` field
//! can be read, then handed on unchanged.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::AppError;
use crate::services::identity::{Credential, CredentialSources};

/// Largest request body buffered while looking for a credential.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Header carrying a raw session token.
pub const TOKEN_HEADER: &str = "token";

/// Find the request's credential and store it in the extensions.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if a JSON body cannot be read.
pub async fn extract_credential(request: Request, next: Next) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let body = if is_json(&parts.headers) {
        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("Unreadable request body: {e}")))?;
        let json: Option<Value> = serde_json::from_slice(&bytes).ok();
        if let Some(credential) = pick(&parts, json.as_ref()) {
            parts.extensions.insert(credential);
        }
        Body::from(bytes)
    } else {
        if let Some(credential) = pick(&parts, None) {
            parts.extensions.insert(credential);
        }
        body
    };

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn pick(parts: &Parts, json: Option<&Value>) -> Option<Credential> {
    let query = parts.uri.query().unwrap_or_default();
    let query_param = |name: &str| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };
    let query_oauth = query_param("discordAuth");
    let query_token = query_param("token");
    let header = header_token(&parts.headers);

    CredentialSources {
        query_oauth: query_oauth.as_deref(),
        body: json,
        header: header.as_deref(),
        query_token: query_token.as_deref(),
    }
    .pick()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Token from the `token` header, or an `Authorization: Bearer` header.
fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .or_else(|| headers.get(header::AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::services::identity::CredentialSource;

    fn parts(uri: &str, headers: &[(&'static str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, HeaderValue::from_str(value).unwrap());
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_and_raw_header() {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(header_token(&map).as_deref(), Some("abc"));

        map.insert(TOKEN_HEADER, HeaderValue::from_static("raw"));
        assert_eq!(header_token(&map).as_deref(), Some("raw"));
    }

    #[test]
    fn test_oauth_query_outranks_header() {
        let parts = parts("/me?discordAuth=oauth&token=query", &[("token", "header")]);
        let credential = pick(&parts, None).unwrap();
        assert_eq!(credential.source, CredentialSource::OAuthQuery);
        assert_eq!(credential.token, "oauth");
    }

    #[test]
    fn test_header_outranks_query_and_body() {
        let parts = parts("/me?token=query", &[("token", "header")]);
        let body = json!({"token": "body"});
        let credential = pick(&parts, Some(&body)).unwrap();
        assert_eq!(credential.source, CredentialSource::Header);
    }

    #[test]
    fn test_body_token_is_last_resort() {
        let parts = parts("/shop/purchase", &[]);
        let body = json!({"itemID": "sticker", "token": "body"});
        let credential = pick(&parts, Some(&body)).unwrap();
        assert_eq!(credential.source, CredentialSource::Body);
        assert_eq!(credential.token, "body");
        assert!(pick(&parts, None).is_none());
    }

    #[test]
    fn test_is_json() {
        let mut map = HeaderMap::new();
        assert!(!is_json(&map));
        map.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&map));
    }
}
