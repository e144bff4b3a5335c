//! `parsec test-provider`: Send one message through a provider adapter.
//!
//! Useful for checking an API key and model name before wiring them into
//! the client.

use parsec_config::{AppConfig, ProviderConfig};
use parsec_core::{Message, ProviderAdapter};
use parsec_providers::{Provider, ProviderKind, create_provider, implemented_providers};

const PROMPT: &str = "Say \"Hello from Parsec!\" and nothing else.";

pub async fn run(
    provider: &str,
    api_key: &str,
    model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: ProviderKind = provider.parse().map_err(|e| {
        format!(
            "{e}\nAvailable providers: {}",
            implemented_providers().join(", ")
        )
    })?;

    let model = model.unwrap_or(kind.default_model());
    let app = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let config = ProviderConfig::new(kind.as_str(), api_key, model);

    println!("\nTesting {kind} with model {model}...");
    println!("{}", "─".repeat(50));

    let adapter = create_provider(&config, &app)?;
    println!("Sending request...");

    let result = match &adapter {
        Provider::Anthropic(a) => smoke(a).await,
        Provider::OpenAi(a) => smoke(a).await,
        Provider::Mistral(a) => smoke(a).await,
        Provider::Google(a) => smoke(a).await,
    };

    match result {
        Ok(()) => {
            println!("\n✓ Provider test passed!");
            Ok(())
        }
        Err(e) => {
            eprintln!("\n✗ Provider test failed!");
            Err(e.into())
        }
    }
}

async fn smoke<A: ProviderAdapter>(adapter: &A) -> Result<(), parsec_core::ProviderError> {
    let messages = [Message::user(PROMPT)];
    let response = adapter.chat(&messages, &[], None).await?;

    println!("\nResponse: {}", adapter.extract_text(&response));

    let calls = adapter.extract_tool_calls(&response);
    if !calls.is_empty() {
        println!("Tool calls: {calls:?}");
    }

    Ok(())
}
