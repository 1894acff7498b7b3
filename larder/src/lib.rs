pub mod basic_models;
pub mod preferences;
