use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use mri_tumor_detector::{
    adapters::{
        http::{router, state::HttpState},
        onnx::{detector::OnnxDetector, model_catalog::OnnxModelCatalog},
        render::annotator::ImageprocAnnotator,
    },
    application::{ports::ModelCatalogPort, services::AnalysisService},
    config::{AppConfig, Cli},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Configuración: valores por defecto, fichero TOML y flags de CLI
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;

    tracing::info!("🔧 Cargando modelo {}...", config.model.path.display());

    // 3. Instanciar Adaptadores (Capa de Infraestructura)
    // Un modelo ausente o roto es fatal antes de abrir el socket.
    let model = config.model_id();
    OnnxModelCatalog::new()
        .validate_model(&model)
        .await
        .context("model validation failed")?;
    let detector = OnnxDetector::load(model, config.model.class_names.clone(), config.model.intra_threads)
        .context("model load failed")?;
    let annotator = ImageprocAnnotator::new(&config.render);

    // 4. Instanciar Servicios (Capa de Aplicación - Casos de Uso)
    let analysis = Arc::new(AnalysisService::new(
        Arc::new(detector),
        Arc::new(annotator),
        config.yolo_params(),
    ));

    // 5. Configurar el Estado de la API
    let state = HttpState {
        analysis,
        ui: Arc::new(config.ui.clone()),
    };

    // 6. Configurar el Router de Axum y Archivos Estáticos
    let app = router(state, config.max_upload_bytes)
        .fallback_service(ServeDir::new(&config.static_dir));

    // 7. Lanzar el Servidor
    tracing::info!("🚀 Detector de tumores iniciado en http://{}", config.bind);
    tracing::info!("📂 Archivos estáticos servidos desde '{}'", config.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Apagando servidor");
}
