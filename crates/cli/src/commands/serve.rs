//! `parsec serve`: Start the HTTP gateway.

use parsec_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("Parsec gateway");
    println!("   Listening:  {}:{}", config.server.host, config.server.port);
    println!("   Repo cache: {}", config.codebase.cache_dir.display());
    println!("   Max iterations: {}", config.agent.max_iterations);

    parsec_gateway::start(config).await?;

    Ok(())
}
