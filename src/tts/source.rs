use std::path::PathBuf;

use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Cache, Repo, RepoType};

use crate::config::ModelConfig;
use crate::error::StartupError;

/// Where model files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Hub { repo_id: String, revision: String },
    Local(PathBuf),
}

impl ModelSource {
    pub fn from_config(config: &ModelConfig) -> Self {
        match &config.local_dir {
            Some(dir) => ModelSource::Local(dir.clone()),
            None => ModelSource::Hub {
                repo_id: config.model_id.clone(),
                revision: config.revision.clone(),
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ModelSource::Hub { repo_id, revision } => format!("{}@{}", repo_id, revision),
            ModelSource::Local(dir) => dir.display().to_string(),
        }
    }

    /// Resolve `filename` to a local path, downloading it into the hub cache if needed.
    pub fn fetch(&self, filename: &str) -> Result<PathBuf, StartupError> {
        match self {
            ModelSource::Local(dir) => {
                let path = dir.join(filename);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(StartupError::MissingLocalFile(path))
                }
            }
            ModelSource::Hub { repo_id, revision } => {
                let download_err = |reason: String| StartupError::Download {
                    repo: repo_id.clone(),
                    file: filename.to_string(),
                    reason,
                };

                let mut builder = ApiBuilder::from_cache(Cache::from_env());
                if let Ok(endpoint) = std::env::var("HF_ENDPOINT") {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Ok(token) = std::env::var("HF_TOKEN") {
                    builder = builder.with_token(Some(token));
                }
                let api = builder.build().map_err(|e| download_err(e.to_string()))?;

                let repo = Repo::with_revision(repo_id.clone(), RepoType::Model, revision.clone());
                tracing::debug!("Fetching {} from {}@{}", filename, repo_id, revision);
                api.repo(repo)
                    .get(filename)
                    .map_err(|e| download_err(e.to_string()))
            }
        }
    }
}
