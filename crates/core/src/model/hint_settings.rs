use thiserror::Error;
use url::Url;

pub const DEFAULT_HINT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_HINT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the hint text-generation service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HintSettings {
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Clone, Debug, Default)]
pub struct HintSettingsDraft {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl HintSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft.
    ///
    /// Returns `Ok(None)` when no API key is configured, meaning the hint
    /// service runs on fallbacks only.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidBaseUrl` if a base URL is present but invalid.
    pub fn validate(self) -> Result<Option<HintSettings>, SettingsError> {
        let Some(api_key) = normalize_optional(self.api_key) else {
            return Ok(None);
        };
        let model = normalize_optional(self.model).unwrap_or_else(|| DEFAULT_HINT_MODEL.into());
        let base_url =
            normalize_optional(self.base_url).unwrap_or_else(|| DEFAULT_HINT_BASE_URL.into());

        if Url::parse(&base_url).is_err() {
            return Err(SettingsError::InvalidBaseUrl(base_url));
        }

        Ok(Some(HintSettings {
            api_key,
            model,
            base_url,
        }))
    }
}

impl HintSettings {
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
