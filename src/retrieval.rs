//! Selección de documentos relevantes para una consulta: filtro por palabras
//! clave o búsqueda vectorial, según la estrategia configurada.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::config::RetrievalStrategy;
use crate::llm::Embedder;
use crate::store::{Document, DocumentStore};
use crate::vector_store::VectorIndex;

/// Número máximo de documentos o chunks que entran en el contexto.
pub const MAX_RELEVANT_DOCS: usize = 3;

/// Extracto relevante: documento de origen y texto seleccionado.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantExcerpt {
    pub source: String,
    pub text: String,
}

/// Aplica la estrategia configurada. Una lista vacía significa "sin
/// conocimiento local para esta consulta".
pub async fn select_relevant(
    strategy: RetrievalStrategy,
    store: &DocumentStore,
    index: &Mutex<VectorIndex>,
    embedder: &dyn Embedder,
    query: &str,
) -> Vec<RelevantExcerpt> {
    match strategy {
        RetrievalStrategy::Keyword => select_by_keywords(query, &store.snapshot()),
        RetrievalStrategy::Vector => select_by_similarity(index, embedder, query).await,
    }
}

/// Filtro por palabras clave: un documento es relevante si alguna palabra de
/// la consulta con más de 2 caracteres aparece en su contenido, sin
/// distinguir mayúsculas. Se respeta el orden de subida y se corta en
/// `MAX_RELEVANT_DOCS`.
pub fn select_by_keywords(query: &str, docs: &[Document]) -> Vec<RelevantExcerpt> {
    let query_lower = query.to_lowercase();
    let keywords: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut relevant = Vec::new();
    for doc in docs {
        let content_lower = doc.content.to_lowercase();
        if keywords.iter().any(|word| content_lower.contains(word)) {
            relevant.push(RelevantExcerpt {
                source: doc.name.clone(),
                text: doc.content.clone(),
            });
            if relevant.len() == MAX_RELEVANT_DOCS {
                break;
            }
        }
    }
    relevant
}

async fn select_by_similarity(
    index: &Mutex<VectorIndex>,
    embedder: &dyn Embedder,
    query: &str,
) -> Vec<RelevantExcerpt> {
    // Índice vacío: no se gasta una llamada de embedding en buscar en nada
    if index.lock().unwrap().is_empty() {
        debug!("Índice vectorial vacío; sin candidatos locales");
        return Vec::new();
    }

    let query_vec = match embedder.embed_query(query).await {
        Ok(vec) => vec,
        Err(err) => {
            // Sin embedding de la consulta no hay búsqueda local posible
            warn!("No se pudo generar el embedding de la consulta: {err}");
            return Vec::new();
        }
    };

    let results = index.lock().unwrap().search(&query_vec, MAX_RELEVANT_DOCS);
    for (score, id, _) in &results {
        debug!("Chunk {id} recuperado con similitud {score:.4}");
    }

    results
        .into_iter()
        .map(|(_, _, hit)| RelevantExcerpt {
            source: hit.source,
            text: hit.text,
        })
        .collect()
}
