use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use serde::Deserialize;

use super::error::EndpointError;

/// Body of `POST /api/auth/token`, accepted as multipart or urlencoded form.
///
/// Any other (or missing) content type yields an empty form.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TokenForm {
    pub(super) code: Option<String>,
    pub(super) platform: Option<String>,
    pub(super) code_verifier: Option<String>,
}

impl<S: Send + Sync> FromRequest<S> for TokenForm {
    type Rejection = EndpointError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| EndpointError::InvalidForm(e.body_text()))?;

            let mut form = Self::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| EndpointError::InvalidForm(e.body_text()))?
            {
                let name = field.name().unwrap_or_default().to_owned();
                let value = field
                    .text()
                    .await
                    .map_err(|e| EndpointError::InvalidForm(e.body_text()))?;
                match name.as_str() {
                    "code" => form.code = Some(value),
                    "platform" => form.platform = Some(value),
                    "code_verifier" => form.code_verifier = Some(value),
                    _ => {}
                }
            }
            Ok(form)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<Self>::from_request(req, state)
                .await
                .map_err(|e| EndpointError::InvalidForm(e.body_text()))?;
            Ok(form)
        } else {
            Ok(Self::default())
        }
    }
}
