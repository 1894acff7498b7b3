use larder::preferences::{Language, TimeLimit};

/// The pair of messages sent to the model for one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

/// Build the system and user instructions for a recipe request.
///
/// This is plain template interpolation: the same inputs always give the same
/// prompts, and the ingredients are passed through untouched. Refusing empty
/// input is up to the caller.
pub fn build_prompts(ingredients: &str, language: Language, time_limit: TimeLimit) -> Prompts {
    let language = language.to_string();
    let time_limit = time_limit.to_string();
    let system = include_str!("../prompts/system.md")
        .replace("{time_limit}", &time_limit)
        .replace("{language}", &language);
    // Ingredients go in last so user text is never mistaken for a placeholder
    let user = include_str!("../prompts/user.md")
        .replace("{time_limit}", &time_limit)
        .replace("{language}", &language)
        .replace("{ingredients}", ingredients);
    tracing::debug!("System prompt: {}", system);
    tracing::debug!("User prompt: {}", user);
    Prompts { system, user }
}

/// The instruction that accompanies a photo of ingredients.
pub fn image_instruction() -> &'static str {
    include_str!("../prompts/analyze-image.md").trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_are_deterministic() {
        let a = build_prompts("egg, rice", Language::Tamil, TimeLimit::Under30);
        let b = build_prompts("egg, rice", Language::Tamil, TimeLimit::Under30);
        assert_eq!(a, b);
    }

    #[test]
    fn preferences_appear_verbatim() {
        let prompts = build_prompts("paneer, spinach", Language::Marathi, TimeLimit::Under15);
        assert!(prompts.system.contains("Language: Marathi."));
        assert!(prompts.system.contains("Under 15 mins"));
        assert!(prompts.user.contains("USER INPUT: paneer, spinach."));
        assert!(prompts.user.contains("Preferred Average Time: Under 15 mins"));
        assert!(prompts.user.contains("safe recipes in Marathi."));
    }

    #[test]
    fn user_prompt_demands_the_schema() {
        let prompts = build_prompts("tomato", Language::English, TimeLimit::Any);
        assert!(prompts.user.contains("Return ONLY valid JSON"));
        for field in ["\"categorization\"", "\"wildOrUnsafe\"", "\"dishName\"", "\"nutrition\""] {
            assert!(prompts.user.contains(field), "missing {field}");
        }
        assert!(!prompts.user.contains("{ingredients}"));
        assert!(!prompts.system.contains("{language}"));
    }

    #[test]
    fn braces_in_ingredients_are_left_alone() {
        let prompts = build_prompts("{language} soup", Language::French, TimeLimit::Any);
        assert!(prompts.user.contains("USER INPUT: {language} soup."));
    }

    #[test]
    fn image_instruction_names_every_category() {
        let instruction = image_instruction();
        assert!(instruction.contains("toxic"));
        assert!(instruction.contains("non-food"));
        assert!(instruction.ends_with("comma-separated list."));
    }
}
