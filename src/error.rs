//! Errores de la API HTTP. Cada variante se traduce a un código de estado y
//! a un cuerpo JSON `{"error": mensaje}`; los fallos del modelo conservan su
//! tipo para que un 502/503 sea distinguible de una respuesta real.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Entrada del cliente inválida (extensión, duplicado, contenido vacío...).
    #[error("{0}")]
    BadRequest(String),

    /// Recurso inexistente.
    #[error("{0}")]
    NotFound(String),

    /// Fallo del modelo generativo en la vía final, sin retroceso posible.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Llm(LlmError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Llm(_) => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
