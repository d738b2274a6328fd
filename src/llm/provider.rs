//! Provider detection and per-provider request details.
//!
//! Every supported provider speaks the `OpenAI` chat completions dialect; they
//! differ only in URL layout and in how the API key is sent.

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name. Empty means "use the model id".
        deployment_name: String,
        /// API version (e.g., "2024-08-01-preview")
        api_version: String,
    },
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Together AI (together.ai, together.xyz)
    TogetherAI,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

/// How the API key travels with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>`
    ApiKeyHeader,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// ```rust,ignore
    /// assert_eq!(Provider::detect_from_url("https://openrouter.ai/api"), Provider::OpenRouter);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("openai.azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: "2024-08-01-preview".to_string(),
            }
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("together.ai") || lower.contains("together.xyz") {
            Self::TogetherAI
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    #[must_use]
    pub fn auth_scheme(&self) -> AuthScheme {
        match self {
            Self::AzureOpenAI { .. } => AuthScheme::ApiKeyHeader,
            _ => AuthScheme::Bearer,
        }
    }

    /// Whether the `parallel_tool_calls` request field may be sent.
    #[must_use]
    pub fn accepts_parallel_tool_calls(&self) -> bool {
        matches!(self, Self::OpenAI | Self::AzureOpenAI { .. } | Self::Groq)
    }

    /// Build the chat completions URL for this provider.
    ///
    /// `base_url` may end with `/v1` or a trailing slash; both are normalized.
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str, model: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => {
                let deployment = if deployment_name.is_empty() {
                    model
                } else {
                    deployment_name
                };
                format!(
                    "{base}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
                )
            }
            _ => {
                let base = base.trim_end_matches("/v1");
                format!("{base}/v1/chat/completions")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_openai() {
        let provider = Provider::detect_from_url("https://api.openai.com");
        assert_eq!(provider, Provider::OpenAI);
    }

    #[test]
    fn test_detect_azure() {
        let provider = Provider::detect_from_url("https://my-resource.openai.azure.com");
        assert!(matches!(provider, Provider::AzureOpenAI { .. }));
        assert_eq!(provider.auth_scheme(), AuthScheme::ApiKeyHeader);
    }

    #[test]
    fn test_detect_openrouter() {
        let provider = Provider::detect_from_url("https://openrouter.ai/api");
        assert_eq!(provider, Provider::OpenRouter);
        assert_eq!(provider.auth_scheme(), AuthScheme::Bearer);
        assert!(!provider.accepts_parallel_tool_calls());
    }

    #[test]
    fn test_detect_generic() {
        let provider = Provider::detect_from_url("http://127.0.0.1:8080");
        assert_eq!(provider, Provider::Generic);
    }

    #[test]
    fn test_build_url_openrouter() {
        let url = Provider::OpenRouter.build_chat_url("https://openrouter.ai/api/", "m");
        assert_eq!(url, "https://openrouter.ai/api/v1/chat/completions");
        let url = Provider::OpenAI.build_chat_url("https://api.openai.com/v1", "gpt-4");
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_build_url_azure_defaults_deployment_to_model() {
        let provider = Provider::detect_from_url("https://my-resource.openai.azure.com");
        let url = provider.build_chat_url("https://my-resource.openai.azure.com", "gpt-4o");
        assert_eq!(
            url,
            "https://my-resource.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
    }
}
