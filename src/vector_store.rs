//! Índice vectorial en memoria sobre los chunks de los documentos.
//!
//! API pública:
//!   - `split_into_chunks(&str, usize, usize)`
//!   - `VectorIndex::build(&dyn Embedder, &[Document])`
//!   - `VectorIndex::search(&[f64], usize)`.
//!
//! El índice se construye explícitamente desde el almacén completo y se
//! sustituye entero con cada subida o borrado. La búsqueda es una similitud
//! coseno exhaustiva sobre todos los chunks.

use uuid::Uuid;

use crate::llm::{Embedder, LlmError};
use crate::store::Document;

/// Tamaño de chunk, en caracteres.
pub const CHUNK_SIZE: usize = 1000;
/// Solapamiento entre chunks consecutivos, en caracteres.
pub const CHUNK_OVERLAP: usize = 200;

/// Chunk indexado con su embedding.
#[derive(Debug, Clone)]
struct IndexedChunk {
    id: String,
    source: String,
    text: String,
    vector: Vec<f64>,
}

/// Resultado mínimo de búsqueda: documento de origen y texto del chunk.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct VectorIndex {
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Índice sin chunks; es el estado inicial y el de reserva tras un
    /// fallo de reconstrucción.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Trocea todos los documentos y calcula sus embeddings en bloque.
    pub async fn build(embedder: &dyn Embedder, docs: &[Document]) -> Result<Self, LlmError> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        for doc in docs {
            for chunk_text in split_into_chunks(&doc.content, CHUNK_SIZE, CHUNK_OVERLAP) {
                pairs.push((Uuid::new_v4().to_string(), chunk_text));
                sources.push(doc.name.clone());
            }
        }

        if pairs.is_empty() {
            return Ok(Self::empty());
        }

        let embedded = embedder.embed_chunks(&pairs).await?;

        // No se confía en que toda implementación devuelva un vector por chunk
        if embedded.len() != sources.len() {
            return Err(LlmError::Embedding(format!(
                "number of embeddings ({}) does not match number of chunks ({})",
                embedded.len(),
                sources.len()
            )));
        }

        let chunks = embedded
            .into_iter()
            .zip(sources)
            .map(|(emb, source)| IndexedChunk {
                id: emb.id,
                source,
                text: emb.text,
                vector: emb.vector,
            })
            .collect();

        Ok(Self { chunks })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Devuelve los `top_k` chunks más parecidos como (similitud, id, hit),
    /// ordenados de mayor a menor similitud.
    pub fn search(&self, query_vec: &[f64], top_k: usize) -> Vec<(f64, String, ChunkHit)> {
        let mut scored: Vec<(f64, String, ChunkHit)> = self
            .chunks
            .iter()
            .map(|chunk| {
                (
                    cosine_similarity(query_vec, &chunk.vector),
                    chunk.id.clone(),
                    ChunkHit {
                        source: chunk.source.clone(),
                        text: chunk.text.clone(),
                    },
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

/// Trocea el texto en ventanas deslizantes de `chunk_size` caracteres con
/// `overlap` caracteres compartidos entre ventanas consecutivas. No descarta
/// contenido ni produce chunks vacíos; la última ventana puede ser corta.
pub fn split_into_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
