use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Languages the recipes can be written in.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Marathi,
    Tamil,
    Telugu,
    Spanish,
    French,
}

/// How long the user is willing to spend cooking.
///
/// The display form is what the model sees in the prompt, so it is kept verbatim.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum TimeLimit {
    #[default]
    #[serde(rename = "Any Time")]
    #[strum(to_string = "Any Time", serialize = "any")]
    Any,
    #[serde(rename = "Under 15 mins")]
    #[strum(to_string = "Under 15 mins", serialize = "15m")]
    Under15,
    #[serde(rename = "Under 30 mins")]
    #[strum(to_string = "Under 30 mins", serialize = "30m")]
    Under30,
    #[serde(rename = "Under 60 mins")]
    #[strum(to_string = "Under 60 mins", serialize = "60m")]
    Under60,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn time_limits_display_their_labels() {
        let labels: Vec<String> = TimeLimit::iter().map(|t| t.to_string()).collect();
        assert_eq!(
            labels,
            ["Any Time", "Under 15 mins", "Under 30 mins", "Under 60 mins"]
        );
    }

    #[test]
    fn time_limits_parse_labels_and_shorthands() {
        assert_eq!("Under 30 mins".parse::<TimeLimit>().unwrap(), TimeLimit::Under30);
        assert_eq!("15m".parse::<TimeLimit>().unwrap(), TimeLimit::Under15);
        assert_eq!("any".parse::<TimeLimit>().unwrap(), TimeLimit::Any);
        assert!("Under 45 mins".parse::<TimeLimit>().is_err());
    }

    #[test]
    fn serde_uses_the_same_labels() {
        assert_eq!(
            serde_json::to_string(&TimeLimit::Under60).unwrap(),
            "\"Under 60 mins\""
        );
        let language: Language = serde_json::from_str("\"Tamil\"").unwrap();
        assert_eq!(language, Language::Tamil);
    }

    #[test]
    fn languages_parse_case_insensitively() {
        assert_eq!("hindi".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!(Language::default().to_string(), "English");
    }
}
