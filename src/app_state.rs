//! Estado compartido de la aplicación, clonado en cada handler de Axum.

use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::llm::{AnswerGenerator, Embedder};
use crate::store::DocumentStore;
use crate::vector_store::VectorIndex;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<DocumentStore>,
    /// Índice vectorial vigente; se reconstruye completo tras cada mutación
    /// del almacén cuando la estrategia es vectorial.
    pub vector_index: Arc<Mutex<VectorIndex>>,
    pub llm: Arc<dyn AnswerGenerator>,
    pub embedder: Arc<dyn Embedder>,
}
