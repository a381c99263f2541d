use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::services::GateError;

/// Json extractor that rejects missing or malformed fields with the
/// `missing_fields` error code before a handler ever runs.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| GateError::MissingFields(e.body_text()).into_response())?;

        value.validate().map_err(|e| {
            let fields: Vec<&str> = e.field_errors().keys().copied().collect();
            GateError::MissingFields(fields.join(", ")).into_response()
        })?;

        Ok(ValidatedJson(value))
    }
}
