//! Canal de decisión RAG: intenta responder desde los documentos subidos y
//! retrocede a conocimiento general del modelo cuando no hay material local.
//!
//! Flujo:
//!   1. Almacén vacío → directo a conocimiento general.
//!   2. Selección de relevantes según la estrategia configurada; si queda
//!      vacía, conocimiento general.
//!   3. Construcción del contexto y generación restringida.
//!   4. Respuesta vacía, centinela NO_ANSWER o fallo de la llamada
//!      restringida → retroceso.
//!   5. La respuesta sale etiquetada con la vía que de verdad la produjo.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::config::RetrievalStrategy;
use crate::llm::{AnswerGenerator, Embedder, LlmError, NO_ANSWER_SENTINEL};
use crate::models::AnswerSource;
use crate::retrieval::{self, RelevantExcerpt};
use crate::store::DocumentStore;
use crate::vector_store::VectorIndex;

/// Longitud máxima de cada extracto dentro del contexto, en caracteres.
pub const MAX_EXCERPT_CHARS: usize = 1000;

/// Resuelve una consulta completa. Devuelve el texto y su origen; el error
/// sólo aparece cuando también la vía de conocimiento general falla.
pub async fn answer_query(
    store: &DocumentStore,
    index: &Mutex<VectorIndex>,
    llm: &dyn AnswerGenerator,
    embedder: &dyn Embedder,
    strategy: RetrievalStrategy,
    question: &str,
) -> Result<(String, AnswerSource), LlmError> {
    // 1) Sin documentos no hay conocimiento local que consultar
    if store.is_empty() {
        return answer_general(llm, question).await;
    }

    // 2) Selección de relevantes
    let excerpts = retrieval::select_relevant(strategy, store, index, embedder, question).await;
    if excerpts.is_empty() {
        debug!("Sin documentos relevantes para la consulta; usando conocimiento general");
        return answer_general(llm, question).await;
    }

    // 3) Contexto + generación restringida
    let context = build_context(&excerpts);
    match llm.answer_from_context(question, &context).await {
        Ok(text) if text.is_empty() || text.trim().contains(NO_ANSWER_SENTINEL) => {
            debug!("Respuesta restringida vacía o con centinela; retrocediendo a conocimiento general");
            answer_general(llm, question).await
        }
        Ok(text) => Ok((text, AnswerSource::LocalKnowledge)),
        Err(err) => {
            // 4) Un fallo en modo restringido no es fatal: aún queda la vía general
            warn!("Generación restringida fallida: {err}");
            answer_general(llm, question).await
        }
    }
}

async fn answer_general(
    llm: &dyn AnswerGenerator,
    question: &str,
) -> Result<(String, AnswerSource), LlmError> {
    let text = llm.answer_general(question).await?;
    Ok((text, AnswerSource::GeneralKnowledge))
}

/// Une los extractos en un único bloque de contexto, cada uno etiquetado con
/// su índice 1-based y su documento de origen. Devuelve cadena vacía si no
/// hay extractos; el llamante no debe invocar al modelo en ese caso.
pub fn build_context(excerpts: &[RelevantExcerpt]) -> String {
    excerpts
        .iter()
        .enumerate()
        .map(|(i, excerpt)| {
            format!(
                "Document {} ({}):\n{}",
                i + 1,
                excerpt.source,
                truncate_excerpt(&excerpt.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Corta en `MAX_EXCERPT_CHARS` caracteres (límite de chars, no de bytes)
/// añadiendo una elipsis cuando hubo corte.
fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() > MAX_EXCERPT_CHARS {
        let cut: String = text.chars().take(MAX_EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
