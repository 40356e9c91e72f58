use std::{net::SocketAddr, path::PathBuf};

use chrono::Duration;
use clap::{Parser, Subcommand};
use log::warn;

#[derive(Parser, Debug, Clone)]
#[command(name = "foodgram")]
#[command(about = "Foodgram recipe sharing backend")]
pub struct Config {
    /// PostgreSQL connection string. Without it data lives in memory.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, global = true, env = "FOODGRAM_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Token signing secret. A random one is generated when unset.
    #[arg(long, global = true, env = "FOODGRAM_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[arg(long, global = true, env = "FOODGRAM_TOKEN_LIFETIME_HOURS", default_value_t = 720)]
    pub token_lifetime_hours: i64,

    #[arg(long, global = true, env = "FOODGRAM_MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    /// TrueType font for shopping list PDFs, replacing the bundled DejaVu Sans.
    #[arg(long, global = true, env = "FOODGRAM_PDF_FONT")]
    pub pdf_font: Option<PathBuf>,

    /// Origin used in absolute links. Taken from the `Host` header when unset.
    #[arg(long, global = true, env = "FOODGRAM_PUBLIC_URL")]
    pub public_url: Option<String>,

    #[arg(long, global = true, env = "FOODGRAM_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
    /// Load an ingredient catalog from a JSON array of `{name, measurement_unit}`.
    LoadIngredients { path: PathBuf },
    /// Create a tag; the slug is derived from the name when omitted.
    CreateTag {
        name: String,
        #[arg(long)]
        slug: Option<String>,
    },
}

/// Values the request handlers need, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token_lifetime: Duration,
    pub media_root: PathBuf,
    pub pdf_font: Option<Vec<u8>>,
    pub public_url: Option<String>,
}

impl Settings {
    pub async fn load(config: &Config) -> Self {
        let pdf_font = match &config.pdf_font {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(
                        "PDF font {} unavailable, using the bundled font: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            None => None,
        };

        Self {
            token_lifetime: Duration::hours(config.token_lifetime_hours),
            media_root: config.media_root.to_owned(),
            pdf_font,
            public_url: config
                .public_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::hours(720),
            media_root: PathBuf::from("media"),
            pdf_font: None,
            public_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults_and_subcommands() {
        let config = Config::try_parse_from(["foodgram", "create-tag", "Breakfast"]).unwrap();
        assert_eq!(config.token_lifetime_hours, 720);
        assert_eq!(config.bind.port(), 8000);
        assert_eq!(
            config.command,
            Some(Command::CreateTag { name: "Breakfast".into(), slug: None })
        );

        let config = Config::try_parse_from(["foodgram", "--bind", "127.0.0.1:9000"]).unwrap();
        assert_eq!(config.command, None);
        assert_eq!(config.bind.port(), 9000);
    }

    #[tokio::test]
    async fn missing_font_override_keeps_the_bundled_font() {
        let config = Config::try_parse_from(["foodgram", "serve"]).unwrap();
        assert!(config.pdf_font.is_none());
        assert!(Settings::load(&config).await.pdf_font.is_none());

        let config =
            Config::try_parse_from(["foodgram", "--pdf-font", "/nonexistent/font.ttf"]).unwrap();
        assert!(Settings::load(&config).await.pdf_font.is_none());
    }
}
