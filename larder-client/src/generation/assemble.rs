use std::sync::Arc;

use larder::basic_models::RecipeSet;
use larder::preferences::{Language, TimeLimit};

use super::extract::{extract_recipe_set, ValidationError};
use super::gateway::{GatewayError, ModelGateway};
use super::prompt::build_prompts;

/// What the user sees when generation fails, whatever the cause.
pub const GENERATION_FAILURE_MESSAGE: &str =
    "Even the best kitchen has off days. Try adjusting your ingredients!";
/// What the user sees when a photo could not be read.
pub const IMAGE_FAILURE_MESSAGE: &str = "Image analysis failed. Please type ingredients.";

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Recipe request failed: {0}")]
    Generation(#[from] GatewayError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Image analysis failed: {0}")]
    ImageAnalysis(#[source] GatewayError),
}

impl PipelineError {
    /// The generic message to show a user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::ImageAnalysis(_) => IMAGE_FAILURE_MESSAGE,
            _ => GENERATION_FAILURE_MESSAGE,
        }
    }
}

/// Prompt, call, extract and validate, as one operation.
///
/// Nothing is kept between calls; two identical requests may well produce two
/// different, equally valid recipe sets.
#[derive(Clone)]
pub struct RecipeGenerator {
    gateway: Arc<dyn ModelGateway>,
}

impl RecipeGenerator {
    pub fn new(gateway: impl ModelGateway + 'static) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }

    /// Generate a validated set of recipes. The first failing stage wins; there
    /// are no partial results.
    pub async fn generate_recipe(
        &self,
        ingredients: &str,
        language: Language,
        time_limit: TimeLimit,
    ) -> Result<RecipeSet, PipelineError> {
        tracing::info!(
            "Generating recipes in {} ({}) for: {}",
            language,
            time_limit,
            ingredients
        );
        let prompts = build_prompts(ingredients, language, time_limit);
        let content = self.gateway.generate_recipe(&prompts).await?;
        let recipe_set = extract_recipe_set(&content)?;
        tracing::info!("Generated {} recipes", recipe_set.recipes.len());
        Ok(recipe_set)
    }

    /// List the items visible in a photo, as the model's comma-separated text.
    pub async fn analyze_image(
        &self,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<String, PipelineError> {
        let detected = self
            .gateway
            .analyze_image(base64_image, mime_type)
            .await
            .map_err(PipelineError::ImageAnalysis)?
            .unwrap_or_default();
        tracing::info!("Detected in image: {}", detected);
        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::FakeGateway;

    const REPLY: &str = r#"Sure! {"analysis":{"categorization":{"edible":["rice","lentils"]}},
        "recipes":[{"dishName":"Khichdi","cookingTime":"25 mins","dishType":"Vegetarian",
        "ingredients":[{"item":"rice","amount":"1 cup"},{"item":"lentils","amount":"1/2 cup"}],
        "steps":["Rinse.","Pressure cook with turmeric."],
        "nutrition":{"calories":"320","protein":"11g","carbs":"60g","fats":"4g"}}]}"#;

    #[tokio::test]
    async fn generates_a_validated_set() {
        let generator = RecipeGenerator::new(FakeGateway::with_reply(REPLY));
        let set = generator
            .generate_recipe("rice, lentils", Language::Hindi, TimeLimit::Under30)
            .await
            .unwrap();
        assert!(!set.recipes.is_empty());
        assert!(set.recipes.iter().all(|r| !r.steps.is_empty() && !r.ingredients.is_empty()));
    }

    #[tokio::test]
    async fn prompts_reach_the_gateway() {
        let gateway = FakeGateway::with_reply(REPLY);
        let generator = RecipeGenerator::new(gateway.clone());
        generator
            .generate_recipe("rice", Language::Spanish, TimeLimit::Under15)
            .await
            .unwrap();
        let prompts = gateway.last_prompts().unwrap();
        assert!(prompts.system.contains("Spanish"));
        assert!(prompts.user.contains("USER INPUT: rice."));
    }

    #[tokio::test]
    async fn gateway_failures_propagate() {
        let generator = RecipeGenerator::new(FakeGateway::failing(503));
        let err = generator
            .generate_recipe("rice", Language::English, TimeLimit::Any)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Generation(GatewayError::Api { status: 503, .. })
        ));
        assert_eq!(err.user_message(), GENERATION_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn validation_failures_propagate() {
        let generator = RecipeGenerator::new(FakeGateway::with_reply("no recipes today"));
        let err = generator
            .generate_recipe("rice", Language::English, TimeLimit::Any)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::MalformedJson(_))
        ));
    }

    #[tokio::test]
    async fn missing_image_content_is_an_empty_list() {
        let generator = RecipeGenerator::new(FakeGateway::with_reply(REPLY));
        let detected = generator.analyze_image("aGVsbG8=", "image/png").await.unwrap();
        assert_eq!(detected, "");
    }

    #[tokio::test]
    async fn image_failures_are_scoped() {
        let generator = RecipeGenerator::new(FakeGateway::failing(500));
        let err = generator.analyze_image("aGVsbG8=", "image/png").await.unwrap_err();
        assert!(matches!(err, PipelineError::ImageAnalysis(_)));
        assert_eq!(err.user_message(), IMAGE_FAILURE_MESSAGE);
    }
}
