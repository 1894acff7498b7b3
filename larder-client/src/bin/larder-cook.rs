use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use larder::basic_models::{RecipeSet, StoredRecipeSet};
use larder::preferences::{Language, TimeLimit};
use larder_client::generation::{ChatCompletionsGateway, GatewayConfig, RecipeGenerator};
use larder_client::history::{export_file_name, HistoryStore, KeyValueStore, SqliteStore};

/// Turn whatever is in the kitchen into recipes
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
    /// Where the recipe history is kept
    #[arg(long, default_value = "data/history.db", global = true)]
    db: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate recipes from a list of ingredients
    Cook {
        /// The ingredients, e.g. `egg, spinach, paneer`
        ingredients: Vec<String>,
        /// Language the recipes are written in
        #[arg(short, long, default_value_t)]
        language: Language,
        /// Time limit: "Any Time", "Under 15 mins" (or 15m), 30m, 60m
        #[arg(short, long, default_value_t)]
        time_limit: TimeLimit,
        /// Read more ingredients from a photo
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Base URL of the chat-completions API
        #[arg(long)]
        api_base: Option<String>,
        /// Model to ask
        #[arg(long)]
        model: Option<String>,
        /// Dry run mode: don't save the result to the history
        #[arg(long)]
        dry: bool,
    },
    /// Look after past results
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// Show every saved recipe set, newest first
    List,
    /// Forget one saved recipe set
    Delete { id: String },
    /// Forget everything
    Clear,
    /// Write the history to a dated JSON file
    Export {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if let Some(parent) = args.db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::open(&args.db).context("Opening history")?;
    let history = HistoryStore::new(store);
    // The store is closed whether or not the command succeeded
    let outcome = run(args.command, &history).await;
    history.into_inner().close();
    outcome
}

async fn run<S: KeyValueStore>(command: Command, history: &HistoryStore<S>) -> Result<()> {
    match command {
        Command::Cook {
            ingredients,
            language,
            time_limit,
            image,
            api_base,
            model,
            dry,
        } => {
            let mut config = GatewayConfig::from_env().context("LLM_API_KEY is not set")?;
            if let Some(api_base) = api_base {
                config.api_base = api_base;
            }
            if let Some(model) = model {
                config.model = model;
            }
            let generator = RecipeGenerator::new(ChatCompletionsGateway::new(config));

            let mut ingredients = ingredients.join(" ");
            if let Some(path) = image {
                println!("Looking at {}", path.display());
                let detected = analyze_photo(&generator, &path).await?;
                println!("Spotted: {}", detected);
                ingredients = if ingredients.trim().is_empty() {
                    detected
                } else {
                    format!("{}, {}", ingredients, detected)
                };
            }
            cook(&generator, history, &ingredients, language, time_limit, dry).await?;
        }
        Command::History(HistoryCommand::List) => {
            let entries = history.list_all()?;
            println!("{} saved recipe sets", entries.len());
            for entry in &entries {
                print_summary(entry);
            }
        }
        Command::History(HistoryCommand::Delete { id }) => {
            if history.delete_by_id(&id)? {
                println!("Deleted {}", id);
            } else {
                println!("Nothing saved under {}", id);
            }
        }
        Command::History(HistoryCommand::Clear) => {
            history.clear_all()?;
            println!("History cleared");
        }
        Command::History(HistoryCommand::Export { dir }) => {
            let path = dir.join(export_file_name(chrono::Local::now().date_naive()));
            std::fs::write(&path, history.export()?)
                .with_context(|| format!("Writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
    }
    Ok(())
}

/// Generate, show and (unless `dry`) keep one recipe set.
///
/// A failed generation is logged in full; the error handed back carries only
/// the message meant for the user.
async fn cook<S: KeyValueStore>(
    generator: &RecipeGenerator,
    history: &HistoryStore<S>,
    ingredients: &str,
    language: Language,
    time_limit: TimeLimit,
    dry: bool,
) -> Result<Option<StoredRecipeSet>> {
    if ingredients.trim().is_empty() {
        bail!("Tell me at least one ingredient (or pass --image)");
    }
    let recipe_set = match generator
        .generate_recipe(ingredients, language, time_limit)
        .await
    {
        Ok(recipe_set) => recipe_set,
        Err(err) => {
            tracing::error!("Recipe generation failed: {}", err);
            bail!(err.user_message());
        }
    };
    print_recipe_set(&recipe_set);

    if dry {
        println!("Dry run mode enabled, not saving");
        return Ok(None);
    }
    let stored = history.save(recipe_set)?;
    println!("Saved as {}", stored.id);
    Ok(Some(stored))
}

/// Read a photo, work out its type from its contents, and ask the model what is in it.
async fn analyze_photo(generator: &RecipeGenerator, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    let mime_type = image::guess_format(&bytes)
        .context("Unrecognized image format")?
        .to_mime_type();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    match generator.analyze_image(&encoded, mime_type).await {
        Ok(detected) => Ok(detected),
        Err(err) => {
            tracing::error!("{}", err);
            bail!(err.user_message())
        }
    }
}

fn print_recipe_set(recipe_set: &RecipeSet) {
    let categorization = &recipe_set.analysis.categorization;
    println!("Edible: {}", categorization.edible.join(", "));
    for (label, items) in [
        ("Toxic", &categorization.toxic),
        ("Wild or unsafe", &categorization.wild_or_unsafe),
        ("Not food", &categorization.non_food),
    ] {
        if let Some(items) = items.as_ref().filter(|items| !items.is_empty()) {
            println!("{}: {}", label, items.join(", "));
        }
    }
    for alert in recipe_set.analysis.safety_alerts.iter().flatten() {
        println!("! {}", alert);
    }

    for recipe in &recipe_set.recipes {
        println!();
        println!("## {}", recipe.dish_name);
        if let Some(cooking_time) = &recipe.cooking_time {
            println!("Avg. time: {}", cooking_time);
        }
        if let Some(dish_type) = &recipe.dish_type {
            println!("Type: {}", dish_type);
        }
        for ingredient in &recipe.ingredients {
            println!("- {} {}", ingredient.amount, ingredient.item);
        }
        for (n, step) in recipe.steps.iter().enumerate() {
            println!("{}. {}", n + 1, step);
        }
        let nutrition = &recipe.nutrition;
        println!(
            "Calories {} | Protein {} | Carbs {} | Fats {}",
            nutrition.calories, nutrition.protein, nutrition.carbs, nutrition.fats
        );
    }
}

fn print_summary(entry: &StoredRecipeSet) {
    let when = chrono::DateTime::from_timestamp_millis(entry.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let dishes: Vec<&str> = entry
        .recipe_set
        .recipes
        .iter()
        .map(|recipe| recipe.dish_name.as_str())
        .collect();
    println!("{}  {}  {}", entry.id, when, dishes.join(" / "));
}
