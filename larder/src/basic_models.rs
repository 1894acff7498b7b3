use serde::{Deserialize, Deserializer, Serialize};

/// How the model sorted the user's raw items.
///
/// The buckets are advisory: the model decides which item lands where, and
/// nothing here proves an item appears in exactly one of them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngredientCategorization {
    pub edible: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wild_or_unsafe: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_food: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toxic: Option<Vec<String>>,
}

impl IngredientCategorization {
    /// Every item that must never be cooked: toxic, wild or unsafe, and non-food.
    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.toxic
            .iter()
            .chain(self.wild_or_unsafe.iter())
            .chain(self.non_food.iter())
            .flatten()
            .map(String::as_str)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub categorization: IngredientCategorization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_alerts: Option<Vec<String>>,
}

/// Nutrition estimates, kept as the model wrote them ("250 kcal", "12g", ...)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NutritionFacts {
    #[serde(deserialize_with = "free_text")]
    pub calories: String,
    #[serde(deserialize_with = "free_text")]
    pub protein: String,
    #[serde(deserialize_with = "free_text")]
    pub carbs: String,
    #[serde(deserialize_with = "free_text")]
    pub fats: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub item: String,
    #[serde(deserialize_with = "free_text")]
    pub amount: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub dish_name: String,
    #[serde(
        default,
        deserialize_with = "optional_free_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub cooking_time: Option<String>,
    /// Usually "Vegetarian" or "Non-Vegetarian", but kept verbatim: the model may
    /// answer in the requested language or pick another label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_type: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub nutrition: NutritionFacts,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RecipeSource {
    pub uri: String,
    pub title: String,
}

/// The full result of one generation request: the safety analysis plus the recipes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RecipeSet {
    pub analysis: Analysis,
    pub recipes: Vec<Recipe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<RecipeSource>>,
}

/// A [`RecipeSet`] as kept in the history, with its identity and creation time.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StoredRecipeSet {
    pub id: String,
    /// Milliseconds since the unix epoch
    pub timestamp: i64,
    #[serde(flatten)]
    pub recipe_set: RecipeSet,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FreeText {
    Text(String),
    Number(serde_json::Number),
}

impl From<FreeText> for String {
    fn from(value: FreeText) -> Self {
        match value {
            FreeText::Text(text) => text,
            FreeText::Number(number) => number.to_string(),
        }
    }
}

/// Accept either a JSON string or a bare number, keeping numbers as their decimal text.
fn free_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(FreeText::deserialize(deserializer)?.into())
}

fn optional_free_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<FreeText>::deserialize(deserializer)?.map(Into::into))
}
