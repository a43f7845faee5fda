use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use colloquy_api::{build_router, config::Config, state::AppState};
use colloquy_chat::{ChatDispatcher, FsImageStore, ModelProfile, Retriever};
use colloquy_llm::AzureOpenAIClient;
use colloquy_persist::{MongoPersistenceClient, PersistenceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Colloquy API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // LLM clients: one per API version, sharing the resource and key
    let azure = &config.azure_openai;
    let standard_client = Arc::new(
        AzureOpenAIClient::builder()
            .api_key(&config.azure_openai_api_key)
            .endpoint(&azure.endpoint)
            .api_version(&azure.api_version)
            .build()?,
    );
    let reasoning_client = Arc::new(
        AzureOpenAIClient::builder()
            .api_key(&config.azure_openai_api_key)
            .endpoint(&azure.endpoint)
            .api_version(&azure.reasoning_api_version)
            .build()?,
    );
    tracing::info!(
        api_version = %azure.api_version,
        reasoning_api_version = %azure.reasoning_api_version,
        "LLM clients initialized"
    );

    tracing::info!("Connecting to MongoDB");
    let persistence: Arc<dyn PersistenceClient> = Arc::new(
        MongoPersistenceClient::connect(&config.mongodb_uri, &config.mongodb.database).await?,
    );
    tracing::info!("MongoDB connected");

    let images = Arc::new(FsImageStore::new(&config.storage.image_dir));
    let retriever = Arc::new(Retriever::new(
        standard_client.clone(),
        &azure.embedding_deployment,
        persistence.clone(),
        config.chunking(),
    ));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let dispatcher_config = config.dispatcher_config();
    let mut dispatcher = ChatDispatcher::new(
        ModelProfile::new(standard_client.clone(), &azure.chat_deployment),
        ModelProfile::new(reasoning_client, &azure.reasoning_deployment),
        persistence.clone(),
        retriever.clone(),
        images.clone(),
        dispatcher_config.clone(),
    )
    .with_http_client(http);
    if let Some(deployment) = &dispatcher_config.image_deployment {
        tracing::info!(deployment = %deployment, "Image generation enabled");
        dispatcher = dispatcher.with_image_client(standard_client.clone());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, persistence, dispatcher, retriever, images));

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
