use axum::{
    extract::{Json, Multipart, Path, State},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    app_state::AppState,
    config::RetrievalStrategy,
    error::ApiError,
    models::{
        ChatRequest, ChatResponse, DeleteResponse, DocumentInfo, DocumentListResponse,
        HealthResponse, UploadResponse,
    },
    rag,
    store::{Document, DocumentStore},
    vector_store::VectorIndex,
};

/// Longitud máxima de la vista previa de contenido en `/documents`.
const PREVIEW_CHARS: usize = 100;

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/chat", post(chat_handler))
        .route("/upload_document", post(upload_document_handler))
        .route("/documents", get(list_documents_handler))
        .route("/documents/:filename", delete(delete_document_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "RAG Chat API is running", "status": "ok" }))
}

#[axum::debug_handler]
async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // El historial llega del frontend pero la generación es por turno único.
    debug!(
        "Consulta de chat recibida ({} entradas de historial)",
        payload.history.len()
    );

    let (response, source) = rag::answer_query(
        &state.store,
        &state.vector_index,
        state.llm.as_ref(),
        state.embedder.as_ref(),
        state.config.retrieval_strategy,
        &payload.message,
    )
    .await?;

    Ok(Json(ChatResponse { response, source }))
}

#[axum::debug_handler]
async fn upload_document_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut filename: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::BadRequest(format!("Failed to read uploaded file: {err}"))
                })?;
                file_bytes = Some(bytes.to_vec());
            }
            "filename" => {
                let text = field.text().await.map_err(|err| {
                    ApiError::BadRequest(format!("Failed to read filename field: {err}"))
                })?;
                filename = Some(text);
            }
            _ => {}
        }
    }

    let filename =
        filename.ok_or_else(|| ApiError::BadRequest("Missing 'filename' form field".to_string()))?;
    let data =
        file_bytes.ok_or_else(|| ApiError::BadRequest("Missing 'file' form field".to_string()))?;

    let response = store_document(&state.store, &filename, &data)?;
    info!(
        "Documento '{}' almacenado ({} bytes)",
        response.filename, response.size
    );

    rebuild_index_if_needed(&state).await;
    Ok(Json(response))
}

#[axum::debug_handler]
async fn list_documents_handler(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents: Vec<DocumentInfo> = state
        .store
        .snapshot()
        .iter()
        .map(|doc| DocumentInfo {
            filename: doc.name.clone(),
            size: doc.size_bytes(),
            doc_type: doc.doc_type().to_string(),
            content_preview: preview(&doc.content),
        })
        .collect();

    let total_size = documents.iter().map(|doc| doc.size).sum();
    let total_documents = documents.len();

    Json(DocumentListResponse {
        documents,
        total_size,
        total_documents,
    })
}

#[axum::debug_handler]
async fn delete_document_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.store.remove(&filename) {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    info!("Documento '{}' eliminado", filename);
    rebuild_index_if_needed(&state).await;

    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        message: "Document deleted successfully".to_string(),
        filename,
    }))
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        documents_count: state.store.len(),
        gemini_configured: state.config.gemini_api_key_set,
        retrieval_strategy: state.config.retrieval_strategy.as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

// --- Validación y almacenamiento de subidas ---

/// Valida y guarda una subida. El orden de las comprobaciones es parte del
/// contrato: extensión, nombre duplicado, contenido y vacío, en ese orden.
fn store_document(
    store: &DocumentStore,
    filename: &str,
    data: &[u8],
) -> Result<UploadResponse, ApiError> {
    if !(filename.ends_with(".txt") || filename.ends_with(".pdf")) {
        return Err(ApiError::BadRequest(
            "Only .txt and .pdf files are allowed.".to_string(),
        ));
    }

    if store.contains(filename) {
        return Err(ApiError::BadRequest(format!(
            "A file with the name '{filename}' already exists."
        )));
    }

    let content = if filename.ends_with(".pdf") {
        // La extracción de PDF no está disponible; se guarda un marcador fijo.
        format!(
            "[PDF File: {filename}]\nPDF content parsing not available in this lightweight version. Please upload as .txt file for full text search."
        )
    } else {
        String::from_utf8(data.to_vec())
            .map_err(|err| ApiError::BadRequest(format!("Failed to process file: {err}")))?
    };

    if content.trim().is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    // insert rechaza duplicados también aquí por si dos subidas compiten
    if !store.insert(Document {
        name: filename.to_string(),
        content,
    }) {
        return Err(ApiError::BadRequest(format!(
            "A file with the name '{filename}' already exists."
        )));
    }

    Ok(UploadResponse {
        status: "success".to_string(),
        message: "Document uploaded successfully".to_string(),
        filename: filename.to_string(),
        size: data.len(),
    })
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}

/// Reconstruye el índice vectorial tras una mutación del almacén. Con la
/// estrategia por palabras clave no hay índice que mantener. Un fallo de
/// embeddings deja un índice vacío y queda registrado; las consultas
/// siguientes degradan a conocimiento general.
async fn rebuild_index_if_needed(state: &AppState) {
    if state.config.retrieval_strategy != RetrievalStrategy::Vector {
        return;
    }

    let docs = state.store.snapshot();
    match VectorIndex::build(state.embedder.as_ref(), &docs).await {
        Ok(index) => {
            info!(
                "Índice vectorial reconstruido con {} fragmentos",
                index.len()
            );
            *state.vector_index.lock().unwrap() = index;
        }
        Err(err) => {
            warn!("No se pudo reconstruir el índice vectorial: {err}");
            *state.vector_index.lock().unwrap() = VectorIndex::empty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::{AnswerGenerator, EmbeddedChunk, Embedder, LlmError, LlmManager};
    use crate::models::AnswerSource;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct CannedLlm {
        constrained: &'static str,
        general: &'static str,
    }

    #[async_trait]
    impl AnswerGenerator for CannedLlm {
        async fn answer_from_context(
            &self,
            _question: &str,
            _context: &str,
        ) -> Result<String, LlmError> {
            Ok(self.constrained.to_string())
        }

        async fn answer_general(&self, _question: &str) -> Result<String, LlmError> {
            Ok(self.general.to_string())
        }
    }

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed_chunks(
            &self,
            chunks: &[(String, String)],
        ) -> Result<Vec<EmbeddedChunk>, LlmError> {
            Ok(chunks
                .iter()
                .map(|(id, text)| EmbeddedChunk {
                    id: id.clone(),
                    text: text.clone(),
                    vector: vec![1.0, 0.5],
                })
                .collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f64>, LlmError> {
            Ok(vec![1.0, 0.5])
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed_chunks(
            &self,
            _chunks: &[(String, String)],
        ) -> Result<Vec<EmbeddedChunk>, LlmError> {
            Err(LlmError::Embedding("cuota agotada".to_string()))
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f64>, LlmError> {
            Err(LlmError::Embedding("cuota agotada".to_string()))
        }
    }

    fn test_state(strategy: RetrievalStrategy) -> AppState {
        AppState {
            config: AppConfig {
                server_addr: "127.0.0.1:0".to_string(),
                gemini_api_key_set: false,
                retrieval_strategy: strategy,
                llm_chat_model: "gemini-2.0-flash-exp".to_string(),
                llm_embedding_model: "embedding-001".to_string(),
            },
            store: Arc::new(DocumentStore::new()),
            vector_index: Arc::new(Mutex::new(VectorIndex::empty())),
            llm: Arc::new(CannedLlm {
                constrained: "respuesta local",
                general: "respuesta general",
            }),
            embedder: Arc::new(FlatEmbedder),
        }
    }

    // ---- Raíz y salud ----

    #[tokio::test]
    async fn root_reports_the_service_is_alive() {
        let Json(body) = root_handler().await;
        assert_eq!(body["message"], "RAG Chat API is running");
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn health_reflects_store_and_config() {
        let state = test_state(RetrievalStrategy::Keyword);
        store_document(&state.store, "a.txt", b"hola mundo").unwrap();

        let Json(health) = health_handler(State(state)).await;

        assert_eq!(health.status, "healthy");
        assert_eq!(health.documents_count, 1);
        assert!(!health.gemini_configured);
        assert_eq!(health.retrieval_strategy, "keyword");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert!(!health.timestamp.is_empty());
    }

    // ---- Subida y validación ----

    #[test]
    fn upload_rejects_unsupported_extensions() {
        let store = DocumentStore::new();
        let err = store_document(&store, "imagen.png", b"datos").unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.to_string(), "Only .txt and .pdf files are allowed.");
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_upload_keeps_the_first_content() {
        let store = DocumentStore::new();
        store_document(&store, "a.txt", b"primero").unwrap();

        let err = store_document(&store, "a.txt", b"segundo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "A file with the name 'a.txt' already exists."
        );

        let docs = store.snapshot();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "primero");
    }

    #[test]
    fn blank_files_are_rejected() {
        let store = DocumentStore::new();
        let err = store_document(&store, "vacio.txt", b"   \n\t ").unwrap_err();

        assert_eq!(err.to_string(), "Uploaded file is empty");
        assert!(store.is_empty());
    }

    #[test]
    fn non_utf8_text_is_rejected() {
        let store = DocumentStore::new();
        let err = store_document(&store, "binario.txt", &[0xff, 0xfe, 0x00]).unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn pdf_content_is_a_fixed_placeholder() {
        let store = DocumentStore::new();
        // Bytes de PDF arbitrarios, ni siquiera UTF-8 válido
        let response = store_document(&store, "informe.pdf", &[0x25, 0x50, 0xff]).unwrap();

        assert_eq!(response.status, "success");
        assert_eq!(response.size, 3);

        let docs = store.snapshot();
        assert_eq!(
            docs[0].content,
            "[PDF File: informe.pdf]\nPDF content parsing not available in this lightweight version. Please upload as .txt file for full text search."
        );
    }

    // ---- Listado y borrado ----

    #[tokio::test]
    async fn upload_list_delete_round_trip() {
        let state = test_state(RetrievalStrategy::Keyword);
        store_document(&state.store, "notas.txt", b"Hello world").unwrap();

        let Json(listing) = list_documents_handler(State(state.clone())).await;
        assert_eq!(listing.total_documents, 1);
        assert_eq!(listing.total_size, 11);
        assert_eq!(listing.documents[0].filename, "notas.txt");
        assert_eq!(listing.documents[0].doc_type, "txt");
        assert_eq!(listing.documents[0].content_preview, "Hello world");

        let deleted = delete_document_handler(
            State(state.clone()),
            Path("notas.txt".to_string()),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(deleted.status, "success");
        assert_eq!(deleted.filename, "notas.txt");

        let Json(listing) = list_documents_handler(State(state.clone())).await;
        assert_eq!(listing.total_documents, 0);

        // El nombre queda libre para volver a subirse
        assert!(store_document(&state.store, "notas.txt", b"otra vez").is_ok());
    }

    #[tokio::test]
    async fn long_previews_are_cut_at_100_chars() {
        let state = test_state(RetrievalStrategy::Keyword);
        let content = "ñ".repeat(150);
        store_document(&state.store, "largo.txt", content.as_bytes()).unwrap();

        let Json(listing) = list_documents_handler(State(state)).await;
        let preview = &listing.documents[0].content_preview;

        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[tokio::test]
    async fn deleting_an_unknown_document_is_not_found() {
        let state = test_state(RetrievalStrategy::Keyword);
        let err = delete_document_handler(State(state), Path("nada.txt".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "File not found");
    }

    // ---- Chat ----

    #[tokio::test]
    async fn chat_tags_the_answer_source() {
        let state = test_state(RetrievalStrategy::Keyword);

        // Sin documentos la respuesta viene del conocimiento general
        let answer = chat_handler(
            State(state.clone()),
            Json(ChatRequest {
                message: "what is the capital of France".to_string(),
                history: Vec::new(),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(answer.source, AnswerSource::GeneralKnowledge);
        assert_eq!(answer.response, "respuesta general");

        // Con un documento relevante la respuesta sale del contexto local
        store_document(&state.store, "cielo.txt", b"The sky is blue.").unwrap();
        let answer = chat_handler(
            State(state),
            Json(ChatRequest {
                message: "what color is the sky".to_string(),
                history: Vec::new(),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(answer.source, AnswerSource::LocalKnowledge);
        assert_eq!(answer.response, "respuesta local");
    }

    #[tokio::test]
    async fn degraded_mode_surfaces_a_typed_config_error() {
        // Gestor real sin GEMINI_API_KEY: los documentos funcionan, el chat no
        let base = test_state(RetrievalStrategy::Keyword);
        let manager = Arc::new(LlmManager::from_config(&base.config));
        let state = AppState {
            llm: manager.clone(),
            embedder: manager,
            ..base
        };

        store_document(&state.store, "a.txt", b"contenido").unwrap();
        let Json(listing) = list_documents_handler(State(state.clone())).await;
        assert_eq!(listing.total_documents, 1);

        let err = chat_handler(
            State(state),
            Json(ChatRequest {
                message: "hola".to_string(),
                history: Vec::new(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::Llm(LlmError::NotConfigured)));
    }

    // ---- Ciclo de vida del índice vectorial ----

    #[tokio::test]
    async fn vector_strategy_rebuilds_the_index_on_mutations() {
        let state = test_state(RetrievalStrategy::Vector);
        assert!(state.vector_index.lock().unwrap().is_empty());

        store_document(&state.store, "a.txt", b"contenido de prueba").unwrap();
        rebuild_index_if_needed(&state).await;
        assert_eq!(state.vector_index.lock().unwrap().len(), 1);

        // El borrado reconstruye y deja el índice sin fragmentos
        delete_document_handler(State(state.clone()), Path("a.txt".to_string()))
            .await
            .unwrap();
        assert!(state.vector_index.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn keyword_strategy_never_touches_the_index() {
        let state = test_state(RetrievalStrategy::Keyword);
        store_document(&state.store, "a.txt", b"contenido de prueba").unwrap();
        rebuild_index_if_needed(&state).await;

        assert!(state.vector_index.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_rebuild_resets_to_an_empty_index() {
        let state = test_state(RetrievalStrategy::Vector);
        store_document(&state.store, "a.txt", b"contenido de prueba").unwrap();
        rebuild_index_if_needed(&state).await;
        assert_eq!(state.vector_index.lock().unwrap().len(), 1);

        // Mismo almacén e índice, embedder averiado
        let degraded = AppState {
            embedder: Arc::new(BrokenEmbedder),
            ..state.clone()
        };
        rebuild_index_if_needed(&degraded).await;

        assert!(state.vector_index.lock().unwrap().is_empty());
    }
}
