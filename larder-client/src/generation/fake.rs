//! A scripted gateway, for running the pipeline without network access.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::gateway::{GatewayError, ModelGateway};
use super::prompt::Prompts;

/// Replies with canned text and remembers the last prompts it was given.
///
/// Clones share the record of prompts, so a test can keep one handle and pass
/// another into a generator.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    reply: Option<String>,
    image_reply: Option<String>,
    failure_status: Option<u16>,
    seen: Arc<Mutex<Option<Prompts>>>,
}

impl FakeGateway {
    /// Answer every recipe request with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Default::default()
        }
    }

    /// Fail every request as if the provider answered with `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            failure_status: Some(status),
            ..Default::default()
        }
    }

    /// Answer image requests with `items`.
    pub fn with_image_reply(mut self, items: impl Into<String>) -> Self {
        self.image_reply = Some(items.into());
        self
    }

    pub fn last_prompts(&self) -> Option<Prompts> {
        self.seen.lock().ok().and_then(|seen| seen.clone())
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        match self.failure_status {
            Some(status) => Err(GatewayError::Api {
                status,
                payload: serde_json::json!({"error": {"message": "scripted failure"}}),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn generate_recipe(&self, prompts: &Prompts) -> Result<String, GatewayError> {
        if let Ok(mut seen) = self.seen.lock() {
            *seen = Some(prompts.clone());
        }
        self.check_failure()?;
        self.reply.clone().ok_or(GatewayError::EmptyResponse)
    }

    async fn analyze_image(
        &self,
        _base64_image: &str,
        _mime_type: &str,
    ) -> Result<Option<String>, GatewayError> {
        self.check_failure()?;
        Ok(self.image_reply.clone())
    }
}
