//! Modelos de petición y respuesta de la API de chat.

use serde::{Deserialize, Serialize};

/// Petición de chat. El historial llega del frontend pero es meramente
/// informativo: la generación sólo usa `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<serde_json::Value>,
}

/// Origen real de la respuesta generada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    LocalKnowledge,
    GeneralKnowledge,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub source: AnswerSource,
}

/// Entrada de la lista de documentos.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content_preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentInfo>,
    pub total_size: usize,
    pub total_documents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub filename: String,
    /// Bytes del fichero recibido, no del texto almacenado.
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
    pub filename: String,
}

/// Sonda de vida del servicio.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub documents_count: usize,
    pub gemini_configured: bool,
    pub retrieval_strategy: String,
    pub version: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_source_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnswerSource::LocalKnowledge).unwrap(),
            "\"local_knowledge\""
        );
        assert_eq!(
            serde_json::to_string(&AnswerSource::GeneralKnowledge).unwrap(),
            "\"general_knowledge\""
        );
    }

    #[test]
    fn chat_request_history_defaults_to_empty() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hola"}"#).unwrap();
        assert_eq!(req.message, "hola");
        assert!(req.history.is_empty());
    }

    #[test]
    fn document_info_uses_type_key() {
        let info = DocumentInfo {
            filename: "a.txt".into(),
            size: 5,
            doc_type: "txt".into(),
            content_preview: "hola".into(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "txt");
        assert!(value.get("doc_type").is_none());
    }
}
