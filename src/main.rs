// Módulos de la aplicación
mod api;
mod app_state;
mod config;
mod error;
mod llm;
mod models;
mod rag;
mod retrieval;
mod store;
mod vector_store;

use crate::app_state::AppState;
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().expect("Error al cargar la configuración");
    if !cfg.gemini_api_key_set {
        warn!(
            "GEMINI_API_KEY no está definida; el servicio arranca en modo degradado \
             y las consultas de chat devolverán 503"
        );
    }

    // 3. Inicializar gestor de LLMs
    let llm_manager = Arc::new(llm::LlmManager::from_config(&cfg));

    // 4. Crear estado compartido de la aplicación
    let app_state = AppState {
        config: cfg.clone(),
        store: Arc::new(store::DocumentStore::new()),
        vector_index: Arc::new(Mutex::new(vector_store::VectorIndex::empty())),
        llm: llm_manager.clone(),
        embedder: llm_manager,
    };
    info!(
        "Estrategia de recuperación: {}",
        app_state.config.retrieval_strategy.as_str()
    );

    // 5. Configurar el router de la API
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .unwrap();
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .unwrap();

    info!("✅ Servidor cerrado correctamente.");
}
