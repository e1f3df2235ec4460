use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

pub const TOKEN_ENV: &str = "CSP_API_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => Err(format!(
                "invalid output format \"{}\", must be one of text, json, yaml",
                s
            )),
        }
    }
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub token: String,
    pub output: OutputFormat,
}

impl Config {
    pub async fn resolve(
        host: String,
        token_file: Option<String>,
        output: OutputFormat,
    ) -> Result<Self> {
        let token = match token_file {
            Some(path) => tokio::fs::read_to_string(&path)
                .await
                .context(format!("Failed to read the API token from {}", path))?
                .trim()
                .to_string(),
            None => env::var(TOKEN_ENV).context(format!(
                "No API token provided via --csp-api-token or {}",
                TOKEN_ENV
            ))?,
        };

        Ok(Self {
            host,
            token,
            output,
        })
    }
}
