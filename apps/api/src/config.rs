use anyhow::{bail, Context, Result};

use crate::iris::measurement::{RenderFrame, DEFAULT_IRIS_FRACTION, DEFAULT_SIDE_PX};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 180;

/// Which call shape the image generator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStrategy {
    /// Image-conditioned edit: the uploaded eye photo is sent along with the prompt.
    EditCapable,
    /// Prompt-only generation; the upload is accepted but not forwarded.
    GenerateOnly,
}

impl GeneratorStrategy {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::EditCapable),
            "generate" => Ok(Self::GenerateOnly),
            other => bail!("IMAGE_GENERATOR must be 'edit' or 'generate', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Built once at startup; handlers and the generator client only ever see it by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub image_model: String,
    pub generator: GeneratorStrategy,
    pub frame: RenderFrame,
    pub max_upload_bytes: usize,
    pub upstream_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let side_px = parse_or(&lookup, "RENDER_SIDE_PX", DEFAULT_SIDE_PX)?;
        let iris_fraction = parse_or(&lookup, "IRIS_FRACTION", DEFAULT_IRIS_FRACTION)?;
        let frame = RenderFrame::new(side_px, iris_fraction)
            .context("RENDER_SIDE_PX / IRIS_FRACTION describe an invalid render frame")?;

        let generator = match lookup("IMAGE_GENERATOR") {
            Some(raw) => GeneratorStrategy::parse(&raw)?,
            None => GeneratorStrategy::EditCapable,
        };

        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        if max_upload_bytes == 0 {
            bail!("MAX_UPLOAD_BYTES must be greater than zero");
        }

        Ok(Config {
            openai_api_key: require("OPENAI_API_KEY")?,
            openai_api_base: lookup("OPENAI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            image_model: lookup("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            generator,
            frame,
            max_upload_bytes,
            upstream_timeout_secs: parse_or(
                &lookup,
                "UPSTREAM_TIMEOUT_SECS",
                DEFAULT_UPSTREAM_TIMEOUT_SECS,
            )?,
            port: parse_or(&lookup, "PORT", 8080u16)
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
