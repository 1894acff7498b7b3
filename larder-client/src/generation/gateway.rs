use std::time::{Duration, Instant};

use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
};
use async_trait::async_trait;
use serde::Deserialize;

use super::prompt::{image_instruction, Prompts};

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("Model API returned {status}: {payload}")]
    Api {
        status: u16,
        payload: serde_json::Value,
    },
    #[error("No content in model response")]
    EmptyResponse,
    #[error("Model response body was not understood: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Could not build model request: {0}")]
    Request(#[from] OpenAIError),
}

/// The boundary to the external language model.
///
/// Each call makes exactly one request and never retries; a timeout or an error
/// status is final for that call.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the recipe prompts and return the raw text of the reply.
    async fn generate_recipe(&self, prompts: &Prompts) -> Result<String, GatewayError>;

    /// Ask the model to list the items in a photo. `None` means the reply had no content.
    async fn analyze_image(
        &self,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<Option<String>, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Sent as `HTTP-Referer`, for providers that attribute traffic to an app
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
    pub temperature: f32,
    pub max_tokens: u16,
    pub generation_timeout: Duration,
    pub image_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            referer: "http://localhost:3000".into(),
            title: "Larder".into(),
            temperature: 0.7,
            max_tokens: 4000,
            generation_timeout: Duration::from_secs(60),
            image_timeout: Duration::from_secs(30),
        }
    }

    /// Read the API key (and optional overrides) from the environment or a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new(dotenvy::var("LLM_API_KEY")?);
        if let Ok(api_base) = dotenvy::var("LLM_API_BASE") {
            config.api_base = api_base;
        }
        if let Ok(model) = dotenvy::var("LLM_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
}

/// A gateway speaking the OpenAI-style `chat/completions` protocol over HTTP.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatCompletionsGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// POST one request and return the first choice's content, if any.
    async fn send(
        &self,
        request: &CreateChatCompletionRequest,
        deadline: Duration,
    ) -> Result<Option<String>, GatewayError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .timeout(deadline)
            .json(request)
            .send()
            .await
            .map_err(|err| transport_error(err, deadline))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport_error(err, deadline))?;
        tracing::info!(
            "Model responded {} in {}ms ({} bytes)",
            status,
            started.elapsed().as_millis(),
            body.len()
        );

        if !status.is_success() {
            let payload = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
            return Err(GatewayError::Api {
                status: status.as_u16(),
                payload,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty());
        if let Some(content) = &content {
            tracing::debug!("Model content: {}", content);
        }
        Ok(content)
    }
}

fn transport_error(err: reqwest::Error, deadline: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(deadline)
    } else {
        GatewayError::Transport(err)
    }
}

#[async_trait]
impl ModelGateway for ChatCompletionsGateway {
    async fn generate_recipe(&self, prompts: &Prompts) -> Result<String, GatewayError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompts.system.clone())
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompts.user.clone())
                .build()?
                .into(),
        ];
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()?;
        tracing::info!("Requesting recipes from {}", self.config.model);
        self.send(&request, self.config.generation_timeout)
            .await?
            .ok_or(GatewayError::EmptyResponse)
    }

    async fn analyze_image(
        &self,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<Option<String>, GatewayError> {
        // For the purpose of data urls, the STANDARD (not URL_SAFE) alphabet is expected
        let data_url = format!("data:{mime_type};base64,{base64_image}");
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(vec![
                    ChatCompletionRequestMessageContentPartTextArgs::default()
                        .text(image_instruction())
                        .build()?
                        .into(),
                    ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(
                            ImageUrlArgs::default()
                                .url(data_url)
                                .detail(ImageDetail::High)
                                .build()?,
                        )
                        .build()?
                        .into(),
                ])
                .build()?
                .into()];
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .build()?;
        tracing::info!(
            "Analyzing {} image ({} base64 bytes)",
            mime_type,
            base64_image.len()
        );
        self.send(&request, self.config.image_timeout).await
    }
}
