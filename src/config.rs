//! Carga y gestión de configuración de la aplicación (servidor + Gemini).

use std::env;
use anyhow::{anyhow, Result};

/// Estrategia de recuperación de conocimiento local.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetrievalStrategy {
    Keyword,
    Vector,
}

impl RetrievalStrategy {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "vector" => Ok(Self::Vector),
            other => Err(anyhow!("Estrategia de recuperación no soportada: {other}")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Vector => "vector",
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    /// `true` si GEMINI_API_KEY está definida y no vacía. Si es `false`, el
    /// servicio arranca en modo degradado: los endpoints de documentos
    /// funcionan y la generación devuelve un error tipado.
    pub gemini_api_key_set: bool,

    pub retrieval_strategy: RetrievalStrategy,
    pub llm_chat_model: String,
    pub llm_embedding_model: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let gemini_api_key_set = env::var("GEMINI_API_KEY")
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());

        let strategy_str =
            env::var("RETRIEVAL_STRATEGY").unwrap_or_else(|_| "keyword".to_string());
        let retrieval_strategy = RetrievalStrategy::from_str(&strategy_str)?;

        let llm_chat_model =
            env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string());
        let llm_embedding_model =
            env::var("LLM_EMBEDDING_MODEL").unwrap_or_else(|_| "embedding-001".to_string());

        Ok(Self {
            server_addr,
            gemini_api_key_set,
            retrieval_strategy,
            llm_chat_model,
            llm_embedding_model,
        })
    }
}
