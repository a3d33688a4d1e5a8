use credo_core::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_logging_json(),
        _ => logging::init_logging(),
    }

    let app = credo_core::App::new().await?;
    tracing::debug!(environment = %app.config.environment, "configuration loaded");
    app.run().await?;

    Ok(())
}
