use larder::basic_models::{Recipe, RecipeSet};
use regex::Regex;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Malformed JSON in model response: {0}")]
    MalformedJson(String),
    #[error("Model response does not match the recipe schema: {0}")]
    SchemaMismatch(String),
    #[error("Recipe {dish_name:?} uses excluded item {item:?}")]
    UnsafeRecipe { dish_name: String, item: String },
}

/// Find the candidate JSON document in free-form model output.
///
/// This takes everything from the first `{` to the last `}`. It is a heuristic,
/// not a balanced-brace parser: text holding two separate objects, or a stray
/// brace after the object, yields a span that will not parse.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Turn raw model output into a validated [`RecipeSet`].
///
/// Fields are kept exactly as the model wrote them; only presence and the
/// safety rules are checked.
pub fn extract_recipe_set(text: &str) -> Result<RecipeSet, ValidationError> {
    let candidate = extract_json_span(text)
        .ok_or_else(|| ValidationError::MalformedJson("no JSON object found".into()))?;
    let document: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|err| ValidationError::MalformedJson(err.to_string()))?;
    let recipe_set: RecipeSet = serde_json::from_value(document)
        .map_err(|err| ValidationError::SchemaMismatch(err.to_string()))?;
    validate(&recipe_set)?;
    Ok(recipe_set)
}

/// Check the invariants serde alone can't express.
pub fn validate(recipe_set: &RecipeSet) -> Result<(), ValidationError> {
    let mismatch = |msg: String| Err(ValidationError::SchemaMismatch(msg));
    if recipe_set.recipes.is_empty() {
        return mismatch("no recipes".into());
    }
    for (index, recipe) in recipe_set.recipes.iter().enumerate() {
        if recipe.dish_name.trim().is_empty() {
            return mismatch(format!("recipe {index} has no dishName"));
        }
        if recipe.ingredients.is_empty() {
            return mismatch(format!("{:?} has no ingredients", recipe.dish_name));
        }
        if recipe.steps.is_empty() || recipe.steps.iter().any(|s| s.trim().is_empty()) {
            return mismatch(format!("{:?} has missing or empty steps", recipe.dish_name));
        }
    }
    check_excluded_items(recipe_set)
}

/// No recipe may mention anything the model itself labelled toxic, wild or non-food.
///
/// Matching is case-insensitive on whole words, so "plastic spoon" does not trip
/// over "tablespoon".
fn check_excluded_items(recipe_set: &RecipeSet) -> Result<(), ValidationError> {
    for item in recipe_set.analysis.categorization.excluded() {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let pattern = Regex::new(&format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(item)))
            .map_err(|err| ValidationError::SchemaMismatch(err.to_string()))?;
        if let Some(recipe) = recipe_set
            .recipes
            .iter()
            .find(|recipe| mentions(recipe, &pattern))
        {
            return Err(ValidationError::UnsafeRecipe {
                dish_name: recipe.dish_name.clone(),
                item: item.to_string(),
            });
        }
    }
    Ok(())
}

fn mentions(recipe: &Recipe, pattern: &Regex) -> bool {
    recipe
        .ingredients
        .iter()
        .map(|ingredient| ingredient.item.as_str())
        .chain(recipe.steps.iter().map(String::as_str))
        .any(|text| pattern.is_match(text))
}
