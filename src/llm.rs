//! Abstracción sobre Rig para hablar con Gemini: generación de respuestas
//! (restringida al contexto o libre) y embeddings.
//!
//! Los métodos devuelven errores tipados en lugar de texto de disculpa, de
//! modo que quien llama puede distinguir un fallo del modelo de una
//! respuesta legítima.

use async_trait::async_trait;
use rig::completion::Prompt;
use rig::embeddings::EmbeddingModel; // <- para .embed_texts
use thiserror::Error;

use crate::config::AppConfig;

/// Centinela que el modelo emite cuando el contexto no contiene la respuesta.
pub const NO_ANSWER_SENTINEL: &str = "NO_ANSWER";

const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

/// Fallos del modelo generativo, observables por el llamante.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("Gemini API is not properly configured. Please check the GEMINI_API_KEY environment variable.")]
    NotConfigured,
    #[error("Gemini generation failed: {0}")]
    Completion(String),
    #[error("Gemini embeddings failed: {0}")]
    Embedding(String),
}

/// Resultado de un embedding de un chunk.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub id: String,
    pub text: String,
    pub vector: Vec<f64>,
}

/// Generación de respuestas. El coordinador RAG trabaja contra este trait
/// para poder probarse con implementaciones guionizadas.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Modo restringido: responde sólo con el contexto suministrado, o emite
    /// el centinela `NO_ANSWER` si el contexto no alcanza.
    async fn answer_from_context(&self, question: &str, context: &str)
        -> Result<String, LlmError>;

    /// Modo libre: la pregunta va directa al modelo, sin contexto.
    async fn answer_general(&self, question: &str) -> Result<String, LlmError>;
}

/// Cálculo de embeddings para chunks y consultas.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeddings en bloque para una lista de (id, texto).
    async fn embed_chunks(
        &self,
        chunks: &[(String, String)],
    ) -> Result<Vec<EmbeddedChunk>, LlmError>;

    /// Embedding de una consulta suelta.
    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, LlmError>;
}

/// Gestor del LLM y de los embeddings sobre el proveedor Gemini de Rig.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub chat_model: String,
    pub embedding_model: String,
    /// `false` cuando GEMINI_API_KEY no está en el entorno: cada llamada
    /// devuelve `LlmError::NotConfigured` sin tocar la red.
    pub configured: bool,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            chat_model: cfg.llm_chat_model.clone(),
            embedding_model: cfg.llm_embedding_model.clone(),
            configured: cfg.gemini_api_key_set,
        }
    }

    fn chat_model_name(&self) -> &str {
        if self.chat_model.is_empty() {
            DEFAULT_CHAT_MODEL
        } else {
            self.chat_model.as_str()
        }
    }

    fn embedding_model_name(&self) -> &str {
        if self.embedding_model.is_empty() {
            DEFAULT_EMBEDDING_MODEL
        } else {
            self.embedding_model.as_str()
        }
    }
}

// ---------------------------------------------------------------------
// CHAT / COMPLETION
// ---------------------------------------------------------------------

const GROUNDED_SYSTEM_PROMPT: &str = r#"
You are a helpful assistant that answers questions based on the provided context.
Please provide a concise and accurate answer based ONLY on the supplied context.
If the answer isn't in the context, just say "NO_ANSWER".
"#;

#[async_trait]
impl AnswerGenerator for LlmManager {
    async fn answer_from_context(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, LlmError> {
        use rig::client::CompletionClient as _;
        use rig::providers::gemini;

        if !self.configured {
            return Err(LlmError::NotConfigured);
        }

        let client = gemini::Client::from_env();

        let full_context = format!("Context:\n{}\n\nQuestion: {}", context, question);

        let agent = client
            .agent(self.chat_model_name())
            .preamble(GROUNDED_SYSTEM_PROMPT)
            .context(&full_context)
            .build();

        let answer = agent
            .prompt(question)
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))?;
        Ok(answer)
    }

    async fn answer_general(&self, question: &str) -> Result<String, LlmError> {
        use rig::client::CompletionClient as _;
        use rig::providers::gemini;

        if !self.configured {
            return Err(LlmError::NotConfigured);
        }

        let client = gemini::Client::from_env();
        let agent = client.agent(self.chat_model_name()).build();

        agent
            .prompt(question)
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))
    }
}

// ---------------------------------------------------------------------
// EMBEDDINGS
// ---------------------------------------------------------------------

#[async_trait]
impl Embedder for LlmManager {
    async fn embed_chunks(
        &self,
        chunks: &[(String, String)],
    ) -> Result<Vec<EmbeddedChunk>, LlmError> {
        use rig::client::EmbeddingsClient as _;
        use rig::providers::gemini;

        if !self.configured {
            return Err(LlmError::NotConfigured);
        }
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let client = gemini::Client::from_env();
        let embedding_model = client.embedding_model(self.embedding_model_name());

        // Extraemos sólo los textos
        let texts: Vec<String> = chunks.iter().map(|(_, text)| text.clone()).collect();

        let embeddings = embedding_model
            .embed_texts(texts)
            .await
            .map_err(|e| LlmError::Embedding(e.to_string()))?;

        if embeddings.len() != chunks.len() {
            return Err(LlmError::Embedding(format!(
                "number of embeddings ({}) does not match number of chunks ({})",
                embeddings.len(),
                chunks.len()
            )));
        }

        // Reconstruimos EmbeddedChunk con id + texto + vector
        let mut result = Vec::new();
        for ((id, text), emb) in chunks.iter().zip(embeddings.iter()) {
            result.push(EmbeddedChunk {
                id: id.clone(),
                text: text.clone(),
                vector: emb.vec.clone(),
            });
        }

        Ok(result)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        use rig::client::EmbeddingsClient as _;
        use rig::providers::gemini;

        if !self.configured {
            return Err(LlmError::NotConfigured);
        }

        let client = gemini::Client::from_env();
        let embedding_model = client.embedding_model(self.embedding_model_name());

        let embeddings = embedding_model
            .embed_texts(vec![text.to_string()])
            .await
            .map_err(|e| LlmError::Embedding(e.to_string()))?;

        embeddings.into_iter().next().map(|e| e.vec).ok_or_else(|| {
            LlmError::Embedding("the embedding service returned no vector for the query".to_string())
        })
    }
}
