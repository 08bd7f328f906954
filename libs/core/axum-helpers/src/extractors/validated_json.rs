//! JSON extractor with automatic validation using the validator crate.

use crate::errors::AppError;
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor that validates the body before it reaches the handler.
///
/// Deserializes the request body and runs the `validator` crate's
/// `Validate::validate` on it. Malformed JSON and failed validation both
/// produce a structured 400 response, so handlers only ever see well-formed,
/// rule-conforming commands.
///
/// # Example
/// ```ignore
/// use axum_helpers::ValidatedJson;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct CreateThing {
///     #[validate(length(min = 1, max = 255))]
///     name: String,
/// }
///
/// async fn create_thing(ValidatedJson(payload): ValidatedJson<CreateThing>) {
///     // payload.name is guaranteed non-empty here
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::JsonExtractorRejection(e).into_response())?;

        data.validate()
            .map_err(|e| AppError::ValidationError(e).into_response())?;

        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use serde::Deserialize;

    #[derive(Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1))]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_payload() {
        let req = json_request(r#"{"name":"widget"}"#);
        let extracted = ValidatedJson::<Payload>::from_request(req, &()).await;
        assert_eq!(extracted.unwrap().0.name, "widget");
    }

    #[tokio::test]
    async fn rejects_failed_validation() {
        let req = json_request(r#"{"name":""}"#);
        let rejection = ValidatedJson::<Payload>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let req = json_request("{not json");
        let rejection = ValidatedJson::<Payload>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert!(rejection.status().is_client_error());
    }
}
