//! Process configuration for gpt5-server

use std::fmt;
use log::{debug, error};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const DEFAULT_MODEL_VAR: &str = "GPT5_DEFAULT_MODEL";
pub const ENV_FILE_VAR: &str = "GPT5_ENV_FILE";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Upstream API credential
///
/// Debug output is redacted so the key never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey
{   pub fn new(key: impl Into<String>) -> Self
    {   ApiKey(key.into())
    }

    pub fn expose(&self) -> &str
    {   &self.0
    }
}

impl fmt::Debug for ApiKey
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   f.write_str("ApiKey(***)")
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig
{   /// Credential forwarded on every upstream call
    pub api_key: ApiKey
  , /// API base URL, without trailing slash
    pub base_url: String
  , /// Model used when a call names none
    pub default_model: String
}

impl ServerConfig
{   pub fn new(api_key: ApiKey) -> Self
    {   ServerConfig
        {   api_key
          , base_url: DEFAULT_BASE_URL.to_string()
          , default_model: DEFAULT_MODEL.to_string()
        }
    }

    /// Build from the process environment
    pub fn from_env() -> crate::error::Result<Self>
    {   Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> crate::error::Result<Self>
    where F: Fn(&str) -> Option<String>
    {   let non_empty = |name: &str| {
          lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        };

        let api_key = non_empty(API_KEY_VAR).ok_or_else(|| {
          error!("{} environment variable is not set", API_KEY_VAR);
          crate::error::Error::InvalidConfiguration(format!(
            "{} environment variable is not set",
            API_KEY_VAR
          ))
        })?;

        let base_url = non_empty(BASE_URL_VAR)
          .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://")
          && !base_url.starts_with("https://")
        {   return Err(crate::error::Error::InvalidConfiguration(
              format!("{} must be an http(s) URL: {}", BASE_URL_VAR, base_url)
            ));
        }

        let default_model = non_empty(DEFAULT_MODEL_VAR)
          .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        debug!(
          "Config loaded: base_url={} default_model={}",
          base_url, default_model
        );

        Ok(ServerConfig
        {   api_key: ApiKey::new(api_key)
          , base_url: base_url.trim_end_matches('/').to_string()
          , default_model
        })
    }
}

/// Load a `.env` file into the process environment
///
/// `GPT5_ENV_FILE` names an explicit file; otherwise the current
/// directory and its parents are searched. Runs before the logger
/// exists, so the caller reports the outcome.
pub fn load_env_file() -> Option<std::path::PathBuf>
{   match std::env::var(ENV_FILE_VAR)
    {   Ok(path) => dotenvy::from_path(&path)
          .ok()
          .map(|_| std::path::PathBuf::from(path))
      , Err(_) => dotenvy::dotenv().ok()
    }
}
