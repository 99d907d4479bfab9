//! Generative-model access: `prompt → completion text`.
//!
//! The rest of the pipeline only sees the [`TextGenerator`] trait, so the
//! model is an injected dependency: production code wraps an
//! `edgequake_llm` provider in [`LlmGenerator`], tests plug in scripted
//! fakes. All prompt wording lives in [`crate::prompts`].
//!
//! [`complete`] is the single call path used by the relevance and analysis
//! steps. It adds what the raw provider call lacks: a per-call timeout and
//! retry with exponential backoff for transient failures.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::retry::with_retry;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::debug;

/// A capability that turns a prompt into completion text.
///
/// Implementations may fail, throttle, or return empty text; callers treat
/// empty text as "nothing to say".
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnalyzerError>;
}

/// [`TextGenerator`] backed by an `edgequake_llm` provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` / environment and wrap it.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let messages = vec![ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| AnalyzerError::LlmApiError {
                message: format!("{}", e),
            })?;
        debug!(
            "LLM call: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Run one prompt through the generator with timeout and retries.
///
/// `label` identifies the call in retry warnings (e.g. `"relevance"`,
/// `"page 4"`).
pub async fn complete(
    generator: &dyn TextGenerator,
    label: &str,
    prompt: &str,
    config: &AnalyzerConfig,
) -> Result<String, AnalyzerError> {
    let limit = config.api_timeout();
    with_retry(label, &config.retry_policy(), move || async move {
        let start = Instant::now();
        match timeout(limit, generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(AnalyzerError::ApiTimeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            }),
        }
    })
    .await
}

/// Build `CompletionOptions` from the analyzer config.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnalyzerError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key (`OPENAI_API_KEY`, `GEMINI_API_KEY`, …).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &AnalyzerConfig) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AnalyzerError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, GEMINI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
