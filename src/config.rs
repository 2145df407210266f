//! Environment-driven configuration.

use anyhow::{bail, Context};

/// Instruction sent with every upload. The transformation is product copy,
/// not code, so it can be overridden through the environment.
const DEFAULT_INSTRUCTION: &str = "Haz que la persona de esta imagen sea completamente calva. \
    Elimina todo el pelo de su cabeza, manteniendo el resto de la imagen lo más realista posible.";

const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub instruction: String,
    pub port: u16,
}

impl Config {
    /// Reads configuration from the environment. A missing `GEMINI_API_KEY`
    /// is fatal; everything else has a default.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("GEMINI_API_KEY must be set"),
        };

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let instruction = std::env::var("GENERATION_INSTRUCTION")
            .unwrap_or_else(|_| DEFAULT_INSTRUCTION.to_string());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid PORT value {raw:?}"))?,
            Err(_) => 3000,
        };

        Ok(Self {
            api_key,
            model,
            instruction,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instruction_asks_for_full_hair_removal() {
        assert!(DEFAULT_INSTRUCTION.contains("completamente calva"));
    }

    #[test]
    fn default_model_is_an_image_model() {
        assert!(DEFAULT_MODEL.ends_with("image"));
    }
}
