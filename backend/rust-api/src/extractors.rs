use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// JSON body extractor whose rejections use the API's `{message, status}`
/// error shape. Syntax, type and content-type errors are all 400.
pub struct AppJson<T>(pub T);

fn rejection_response(rejection: JsonRejection) -> Response {
    let message = format!("Failed to parse JSON request body: {}", rejection.body_text());
    tracing::warn!(rejected_status = %rejection.status(), "{}", message);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message, "status": 400 })),
    )
        .into_response()
}

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(rejection_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        answers: Vec<i32>,
    }

    async fn extract(content_type: Option<&str>, body: &str) -> Result<AppJson<Payload>, Response> {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        AppJson::<Payload>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn test_rejections_are_json_400() {
        for (content_type, body) in [
            (Some("application/json"), "{not json"),
            (Some("application/json"), r#"{"answers": "all of them"}"#),
            (None, r#"{"answers": [1]}"#),
        ] {
            let response = extract(content_type, body).await.err().unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["status"], 400);
            assert!(json["message"]
                .as_str()
                .unwrap()
                .starts_with("Failed to parse JSON request body"));
        }
    }

    #[tokio::test]
    async fn test_accepts_valid_body() {
        let AppJson(payload) = extract(Some("application/json"), r#"{"answers": [0, 2]}"#)
            .await
            .ok()
            .unwrap();
        assert_eq!(payload.answers, vec![0, 2]);
    }
}
