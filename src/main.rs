use task_manager::api::routes::create_routes;
use task_manager::config::{run_migrations, AppConfig, DatabaseConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let app_config = AppConfig::from_env()?;
    let db_config = DatabaseConfig::from_env()?;

    // Connect to the database and apply migrations
    let pool = db_config.create_pool().await?;
    run_migrations(&pool).await?;

    // Create the application routes
    let app = create_routes(pool, &app_config.jwt_secret);

    // Start the server
    let listener = TcpListener::bind(app_config.server_address()).await?;
    info!(
        "Task manager server starting on http://{}",
        app_config.server_address()
    );
    info!(
        "Health check available at http://{}/health",
        app_config.server_address()
    );

    axum::serve(listener, app).await?;

    Ok(())
}
