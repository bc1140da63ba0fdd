//! JSON request bodies.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Extracts a JSON body like [`axum::Json`], but a missing or malformed body
/// is answered with the usual `{"success": false, "message": ...}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{StatusCode, header},
        response::IntoResponse,
    };
    use serde::Deserialize;
    use serde_json::Value;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        name: String,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn rejection(req: Request) -> (StatusCode, Value) {
        let err = ApiJson::<Greeting>::from_request(req, &()).await.unwrap_err();
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let req = request(Some("application/json"), r#"{"name": "Ada"}"#);
        let ApiJson(body) = ApiJson::<Greeting>::from_request(req, &()).await.unwrap();
        assert_eq!(body.name, "Ada");
    }

    #[tokio::test]
    async fn test_bad_bodies_get_api_error_shape() {
        for req in [
            request(Some("application/json"), "{not json"),
            request(Some("application/json"), r#"{"nom": "Ada"}"#),
            request(None, r#"{"name": "Ada"}"#),
            request(Some("application/json"), ""),
        ] {
            let (status, body) = rejection(req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(!body["message"].as_str().unwrap().is_empty());
        }
    }
}
