//! JSON response writing.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

const ENCODE_FAILURE_BODY: &[u8] = br#"{"error":"failed to encode response","status":500}"#;

/// Serialize `value` as the JSON body of a response with the given status.
///
/// The body is encoded before anything is written, so a value that fails to
/// serialize turns into a `500` with a JSON error body instead of a
/// truncated success response.
pub fn write_json<T>(status: StatusCode, value: &T) -> Response
where
    T: Serialize + ?Sized,
{
    match serde_json::to_vec(value) {
        Ok(body) => (status, json_content_type(), body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, status = status.as_u16(), "failed to encode JSON response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_content_type(),
                ENCODE_FAILURE_BODY,
            )
                .into_response()
        }
    }
}

fn json_content_type() -> [(header::HeaderName, HeaderValue); 1] {
    [(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    )]
}

/// A status code paired with a serializable body, for returning from handlers.
///
/// ```ignore
/// async fn create() -> JsonResponse<Item> {
///     JsonResponse(StatusCode::CREATED, item)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct JsonResponse<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for JsonResponse<T> {
    fn into_response(self) -> Response {
        write_json(self.0, &self.1)
    }
}
