//! Provider registry: maps a provider identifier to its adapter.
//!
//! The set of providers is closed: [`Provider`] has one variant per
//! adapter, and [`ProviderKind`] is the identifier table. Adding a vendor
//! means adding a variant to both, and the compiler points at every match
//! that needs a new arm.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use parsec_config::{AppConfig, ProviderConfig};
use parsec_core::error::{ConfigError, Error};

use crate::anthropic::AnthropicAdapter;
use crate::google::GoogleAdapter;
use crate::http::build_client;
use crate::mistral::MistralAdapter;
use crate::openai::OpenAiAdapter;

/// Provider identifiers with an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Mistral,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Mistral,
        ProviderKind::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Google => "google",
        }
    }

    /// Model used when the caller does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::OpenAi => "gpt-4.1",
            ProviderKind::Mistral => "mistral-large-latest",
            ProviderKind::Google => "gemini-2.5-flash",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedProvider {
                provider: s.to_string(),
                supported: implemented_providers().join(", "),
            })
    }
}

/// Identifiers of every provider with an adapter.
pub fn implemented_providers() -> Vec<&'static str> {
    ProviderKind::ALL.iter().map(ProviderKind::as_str).collect()
}

/// One constructed adapter.
pub enum Provider {
    Anthropic(AnthropicAdapter),
    OpenAi(OpenAiAdapter),
    Mistral(MistralAdapter),
    Google(GoogleAdapter),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Anthropic(_) => ProviderKind::Anthropic,
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Mistral(_) => ProviderKind::Mistral,
            Provider::Google(_) => ProviderKind::Google,
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.kind()).finish()
    }
}

/// Build the adapter for a request's provider settings.
///
/// Fails with a configuration error when the provider is unknown or the
/// API key or model is missing.
pub fn create_provider(config: &ProviderConfig, app: &AppConfig) -> Result<Provider, Error> {
    let kind: ProviderKind = config.provider.parse()?;

    if config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingField("apiKey".into()).into());
    }
    if config.model.trim().is_empty() {
        return Err(ConfigError::MissingField("model".into()).into());
    }

    let client = build_client(Duration::from_secs(app.agent.request_timeout_secs))?;
    let base_url = app.provider_base_url(kind.as_str());
    let api_key = config.api_key.as_str();
    let model = config.model.as_str();

    let provider = match kind {
        ProviderKind::Anthropic => {
            let mut adapter = AnthropicAdapter::new(api_key, model, client)
                .with_max_tokens(app.agent.max_tokens);
            if let Some(url) = base_url {
                adapter = adapter.with_base_url(url);
            }
            Provider::Anthropic(adapter)
        }
        ProviderKind::OpenAi => {
            let mut adapter = OpenAiAdapter::new(api_key, model, client);
            if let Some(url) = base_url {
                adapter = adapter.with_base_url(url);
            }
            Provider::OpenAi(adapter)
        }
        ProviderKind::Mistral => {
            let mut adapter = MistralAdapter::new(api_key, model, client);
            if let Some(url) = base_url {
                adapter = adapter.with_base_url(url);
            }
            Provider::Mistral(adapter)
        }
        ProviderKind::Google => {
            let mut adapter = GoogleAdapter::new(api_key, model, client);
            if let Some(url) = base_url {
                adapter = adapter.with_base_url(url);
            }
            Provider::Google(adapter)
        }
    };

    tracing::debug!(provider = %kind, model, "Created provider adapter");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsec_core::ErrorKind;

    #[test]
    fn every_kind_round_trips_through_its_identifier() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert_eq!(
            implemented_providers(),
            vec!["anthropic", "openai", "mistral", "google"]
        );
    }

    #[test]
    fn unknown_provider_lists_supported() {
        let err = "cohere".parse::<ProviderKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider \"cohere\" is not yet implemented. Currently supported: anthropic, openai, mistral, google"
        );
    }

    #[test]
    fn create_each_provider() {
        let app = AppConfig::default();
        for kind in ProviderKind::ALL {
            let config = ProviderConfig::new(kind.as_str(), "key", kind.default_model());
            let provider = create_provider(&config, &app).unwrap();
            assert_eq!(provider.kind(), kind);
        }
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let config = ProviderConfig::new("cohere", "key", "command-r");
        let err = create_provider(&config, &AppConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.is_client_error());
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = ProviderConfig::new("openai", "", "gpt-4.1");
        let err = create_provider(&config, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingField(ref f)) if f == "apiKey"));
    }

    #[test]
    fn missing_model_is_rejected() {
        let config = ProviderConfig::new("anthropic", "key", " ");
        let err = create_provider(&config, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingField(ref f)) if f == "model"));
    }
}
