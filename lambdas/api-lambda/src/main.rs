use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{run, service_fn, Error, Request};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use users_shared::{config::Config, store::DynamoStore, AppState};

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    // Initialize AWS clients once at startup
    let config = Config::from_env();
    let sdk_config = aws_config::load_from_env().await;
    let state = AppState::new(DynamoStore::new(DynamoClient::new(&sdk_config)), &config);

    tracing::info!("Serving users from table {}", state.table_name);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
