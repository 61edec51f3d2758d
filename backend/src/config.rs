use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const MODEL_FILE_NAME: &str = "dr_retinopathy_model.pt";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub deployment_root: PathBuf,
}

impl ServerConfig {
    /// Reads `HOST` and `PORT` from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("PORT") {
            Ok(value) => parse_port(&value)?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            deployment_root: deployment_root()?,
        })
    }

    pub fn model_path(&self) -> PathBuf {
        model_path_in(&self.deployment_root)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn model_path_in(root: &Path) -> PathBuf {
    root.join(MODEL_FILE_NAME)
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|source| ConfigError::InvalidPort {
            value: value.to_string(),
            source,
        })
}

// The model sits next to the backend crate in a checkout, or in the working
// directory of a deployed binary.
fn deployment_root() -> Result<PathBuf, ConfigError> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(Path::new(&manifest_dir).join(".."));
    }
    Ok(env::current_dir()?)
}
