use std::{path::Path, sync::Arc};

use clap::Parser;
use log::{info, warn};
use validator::Validate;

use foodgram::{
    api::{self, AppState},
    config::{Command, Config, Settings},
    jwt::TokenKey,
    memory::MemoryStore,
    schema::{NewIngredient, NewTag},
    store::{PgStore, Store},
};

type BoxError = Box<dyn std::error::Error>;

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            store.migrate().await?;
            info!("Connected to PostgreSQL");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL is not set, data is kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn token_key(config: &Config) -> Result<TokenKey, BoxError> {
    match &config.secret_key {
        Some(secret) => Ok(TokenKey::from_secret(secret.as_bytes())?),
        None => {
            warn!("FOODGRAM_SECRET_KEY is not set, tokens will not survive a restart");
            Ok(TokenKey::random()?)
        }
    }
}

async fn serve(config: &Config) -> Result<(), BoxError> {
    let store = open_store(config).await?;
    let settings = Settings::load(config).await;
    let state = AppState::new(store, token_key(config)?, settings);

    info!("Listening on {}", config.bind);
    warp::serve(api::routes(state)).run(config.bind).await;

    Ok(())
}

async fn load_ingredients(store: &dyn Store, path: &Path) -> Result<(), BoxError> {
    let data = tokio::fs::read(path).await?;
    let parsed: Vec<NewIngredient> = serde_json::from_slice(&data)?;

    let items: Vec<NewIngredient> = parsed
        .into_iter()
        .filter(|item| match item.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping ingredient {:?}: {}", item.name, e);
                false
            }
        })
        .collect();

    let inserted = store.insert_ingredients(&items).await?;
    info!(
        "Loaded {} of {} ingredients from {}",
        inserted,
        items.len(),
        path.display()
    );

    Ok(())
}

async fn create_tag(store: &dyn Store, name: &str, slug: Option<&str>) -> Result<(), BoxError> {
    let slug = slug.map(str::to_string).unwrap_or_else(|| slug::slugify(name));
    let tag = NewTag { name: name.to_string(), slug };
    tag.validate()?;

    match store.create_tag(&tag.name, &tag.slug).await? {
        Some(tag) => info!("Created tag {} ({}) with id {}", tag.name, tag.slug, tag.id),
        None => warn!("Tag {} or slug {} already exists", tag.name, tag.slug),
    }

    Ok(())
}

fn require_database(config: &Config) -> Result<&str, BoxError> {
    config
        .database_url
        .as_deref()
        .ok_or_else(|| "DATABASE_URL is required for this command".into())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Migrate => {
            let store = PgStore::connect(require_database(&config)?, config.max_connections).await?;
            store.migrate().await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::LoadIngredients { path } => {
            let store = PgStore::connect(require_database(&config)?, config.max_connections).await?;
            store.migrate().await?;
            load_ingredients(&store, &path).await
        }
        Command::CreateTag { name, slug } => {
            let store = PgStore::connect(require_database(&config)?, config.max_connections).await?;
            store.migrate().await?;
            create_tag(&store, &name, slug.as_deref()).await
        }
    }
}
