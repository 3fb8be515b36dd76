use imagine_core::ProxyConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = ProxyConfig::from_env()?;

    // Initialize the application (telemetry, upstream client, routes)
    let (_state, router) = imagine_api::setup::initialize_app(config.clone())?;

    // Start the server
    imagine_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
