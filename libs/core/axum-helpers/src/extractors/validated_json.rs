//! JSON extractor with content-type enforcement and validation.

use crate::errors::JsonError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Rejects with:
/// - `415` when the request is not `Content-Type: application/json`
/// - `400` when the body does not decode into `T`
/// - `400` with per-field `details` when `T::validate` fails
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use axum::routing::post;
/// use axum_helpers::extractors::ValidatedJson;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct CreateUser {
///     #[validate(length(min = 3, max = 50))]
///     username: String,
/// }
///
/// async fn create_user(ValidatedJson(payload): ValidatedJson<CreateUser>) -> String {
///     format!("Creating user: {}", payload.username)
/// }
///
/// let app = Router::new().route("/users", post(create_user));
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = JsonError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;

        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        routing::post,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct CreateItem {
        #[validate(length(min = 3))]
        name: String,
    }

    async fn create(ValidatedJson(item): ValidatedJson<CreateItem>) -> String {
        item.name
    }

    fn app() -> Router {
        Router::new().route("/items", post(create))
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri("/items");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let response = app()
            .oneshot(request(Some("application/json"), r#"{"name":"widget"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"widget");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_415() {
        let response = app()
            .oneshot(request(None, r#"{"name":"widget"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "invalid content type");
        assert_eq!(json["status"], 415);
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_415() {
        let response = app()
            .oneshot(request(Some("text/plain"), r#"{"name":"widget"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let response = app()
            .oneshot(request(Some("application/json"), r#"{"name":"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["status"], 400);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .starts_with("invalid JSON body")
        );
    }

    #[tokio::test]
    async fn test_validation_failure_has_field_details() {
        let response = app()
            .oneshot(request(Some("application/json"), r#"{"name":"ab"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "request validation failed");
        assert_eq!(json["details"]["name"][0]["code"], "length");
    }
}
