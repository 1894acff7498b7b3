use anyhow::{Context, Result};
use clap::Parser;
use larder_client::generation::{ChatCompletionsGateway, RecipeGenerator};
use larder_client::history::SqliteStore;
use larder_server::{
    api::{self, AppState},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the YAML configuration
    #[clap(long, default_value = "config.yml")]
    config: String,

    /// Override the configured address and optionally port to bind to
    #[clap(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // initialize tracing
    let file_appender = tracing_appender::rolling::daily(
        if std::fs::exists("/app")? {
            "/app/data/logs".into()
        } else {
            std::env::current_dir()?
        },
        "access.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args = Args::parse();
    let config = Config::load(&args.config).context("Loading configuration")?;

    // open the history database
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::open(&config.database.path).context("Opening history database")?;
    // connect to the model
    let api_key = dotenvy::var("LLM_API_KEY").context("LLM_API_KEY is not set")?;
    let gateway = ChatCompletionsGateway::new(config.llm.gateway_config(api_key));
    let generator = RecipeGenerator::new(gateway);

    let app = api::router(AppState::new(generator, store.clone()))
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let address = args.address.unwrap_or(config.server.address);
    // In development, use HTTP. In production, use HTTPS.
    if let Some(tls) = &config.server.tls {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .context("Loading TLS certificate")?;

        let addr = address.parse()?;
        tracing::info!("Listening on {}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(&address).await?;
        tracing::info!("Listening on {}", address);
        axum::serve(listener, app).await?;
    }
    store.close();
    Ok(())
}
