//! Inference service entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use catsdogs::backend::{default_device, DefaultBackend};
use catsdogs::inference::predictor::Predictor;
use catsdogs_server::state::{AppState, ServerConfig};

/// Cats vs Dogs inference service
#[derive(Parser, Debug)]
#[command(name = "catsdogs-server")]
#[command(version)]
#[command(about = "HTTP inference service for the cats-vs-dogs classifier")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory containing the trained checkpoint
    #[arg(long, env = "CATSDOGS_MODEL_DIR", default_value = "output/models")]
    model_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    info!("catsdogs-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Model directory: {:?}", cli.model_dir);

    // Load the checkpoint exactly once, before accepting traffic. A missing
    // checkpoint is served as a not-ready state, not a crash, so health
    // checks keep answering.
    let predictor = match Predictor::<DefaultBackend>::from_checkpoint(&cli.model_dir, &default_device())
    {
        Ok(predictor) => {
            info!(
                "Model loaded (epoch {}, val accuracy {:.2}%)",
                predictor.meta().epoch + 1,
                predictor.meta().val_accuracy * 100.0
            );
            Some(predictor)
        }
        Err(e) => {
            warn!("No usable checkpoint: {}. Predict will answer 503 until restart.", e);
            None
        }
    };

    let config = ServerConfig {
        model_dir: cli.model_dir,
    };
    let state = Arc::new(AppState::new(config, predictor));
    let app = catsdogs_server::router(state);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
