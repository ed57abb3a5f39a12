
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::TextCompletion;
use crate::config::{LlmBackendConfig, LlmConfig, LlmProvider};
use crate::{ReviewError, Result};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const GROQ_ENDPOINT: &str = "https://api.groq.com";
const HUGGING_FACE_ENDPOINT: &str = "https://api-inference.huggingface.co";
const ERROR_BODY_CHARS: usize = 200;

/// Connection settings shared by every hosted backend
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub model: String,
    api_key: Option<String>,
    api_key_env: String,
    base_url: Url,
    agent: ureq::Agent,
    pub temperature: f32,
    pub max_new_tokens: u32,
}

impl BackendSettings {
    /// Settings for one configured backend. The API key is read from the
    /// environment now; a missing key only fails when the backend is called.
    #[inline]
    pub fn from_config(backend: &LlmBackendConfig, llm: &LlmConfig) -> Result<Self> {
        let endpoint = backend
            .endpoint
            .as_deref()
            .unwrap_or_else(|| default_endpoint(backend.provider));
        let base_url = Url::parse(endpoint).map_err(|e| {
            ReviewError::Config(format!("Invalid endpoint {} for {}: {}", endpoint, backend.model, e))
        })?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(llm.timeout_seconds)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            model: backend.model.clone(),
            api_key: std::env::var(&backend.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            api_key_env: backend.api_key_env.clone(),
            base_url,
            agent,
            temperature: llm.temperature,
            max_new_tokens: llm.max_new_tokens,
        })
    }

    fn api_key(&self, service: &str) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ReviewError::Config(format!("{} is not set, {} is unavailable", self.api_key_env, service))
        })
    }

    fn post_json<T: Serialize>(
        &self,
        service: &str,
        path: &str,
        auth_header: (&str, String),
        body: &T,
    ) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ReviewError::Config(format!("Invalid {} path {}: {}", service, path, e)))?;
        let body = serde_json::to_string(body)?;

        debug!("Requesting completion from {} at {}", service, url);

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header(auth_header.0, auth_header.1)
            .send(&body)
            .map_err(|e| ReviewError::Network(format!("{} request failed: {}", service, e)))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ReviewError::Network(format!("Failed to read {} response: {}", service, e)))?;

        if !(200..300).contains(&status) {
            let preview: String = text.chars().take(ERROR_BODY_CHARS).collect();
            return Err(external(service, format!("HTTP {}: {}", status, preview)));
        }

        Ok(text)
    }
}

fn default_endpoint(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Gemini => GEMINI_ENDPOINT,
        LlmProvider::Groq => GROQ_ENDPOINT,
        LlmProvider::HuggingFace => HUGGING_FACE_ENDPOINT,
    }
}

fn external(service: &str, message: String) -> ReviewError {
    ReviewError::ExternalService {
        service: service.to_string(),
        message,
    }
}

fn non_empty(service: &str, text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(external(service, "empty completion".to_string()))
    } else {
        Ok(text)
    }
}

/// Google Gemini `generateContent`
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    settings: BackendSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiBackend {
    #[inline]
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

impl TextCompletion for GeminiBackend {
    #[inline]
    fn name(&self) -> &str {
        "Gemini"
    }

    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        let key = self.settings.api_key(self.name())?;
        let request = GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_new_tokens,
            },
        };

        let path = format!("/v1beta/models/{}:generateContent", self.settings.model);
        let text = self.settings.post_json(
            self.name(),
            &path,
            ("x-goog-api-key", key.to_string()),
            &request,
        )?;

        let response: GeminiResponse = serde_json::from_str(&text)?;
        let completion = response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        non_empty(self.name(), completion)
    }
}

/// Groq OpenAI-compatible chat completions
#[derive(Debug, Clone)]
pub struct GroqBackend {
    settings: BackendSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqBackend {
    #[inline]
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

impl TextCompletion for GroqBackend {
    #[inline]
    fn name(&self) -> &str {
        "Groq"
    }

    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        let key = self.settings.api_key(self.name())?;
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_new_tokens,
        };

        let text = self.settings.post_json(
            self.name(),
            "/openai/v1/chat/completions",
            ("Authorization", format!("Bearer {}", key)),
            &request,
        )?;

        let response: ChatResponse = serde_json::from_str(&text)?;
        let completion = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        non_empty(self.name(), completion)
    }
}

/// Hugging Face hosted text generation
#[derive(Debug, Clone)]
pub struct HuggingFaceBackend {
    settings: BackendSettings,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl HuggingFaceBackend {
    #[inline]
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

impl TextCompletion for HuggingFaceBackend {
    #[inline]
    fn name(&self) -> &str {
        "HuggingFace"
    }

    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        let key = self.settings.api_key(self.name())?;
        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: self.settings.max_new_tokens,
                temperature: self.settings.temperature,
                return_full_text: false,
            },
        };

        let path = format!("/models/{}", self.settings.model);
        let text = self.settings.post_json(
            self.name(),
            &path,
            ("Authorization", format!("Bearer {}", key)),
            &request,
        )?;

        let generated: Vec<GeneratedText> = serde_json::from_str(&text)?;
        let completion = generated
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .unwrap_or_default();
        non_empty(self.name(), completion)
    }
}

/// Backend for one configured provider
#[inline]
pub fn backend_from_config(
    backend: &LlmBackendConfig,
    llm: &LlmConfig,
) -> Result<Box<dyn TextCompletion>> {
    let settings = BackendSettings::from_config(backend, llm)?;
    Ok(match backend.provider {
        LlmProvider::Gemini => Box::new(GeminiBackend::new(settings)),
        LlmProvider::Groq => Box::new(GroqBackend::new(settings)),
        LlmProvider::HuggingFace => Box::new(HuggingFaceBackend::new(settings)),
    })
}
