mod assemble;
pub mod extract;
pub mod fake;
pub mod gateway;
pub mod prompt;

pub use assemble::{PipelineError, RecipeGenerator, GENERATION_FAILURE_MESSAGE, IMAGE_FAILURE_MESSAGE};
pub use extract::{extract_recipe_set, ValidationError};
pub use fake::FakeGateway;
pub use gateway::{
    ChatCompletionsGateway, GatewayConfig, GatewayError, ModelGateway, DEFAULT_API_BASE,
    DEFAULT_MODEL,
};
pub use prompt::{build_prompts, Prompts};
