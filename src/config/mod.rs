use crate::models::JobConfig;
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;

/// Prefix of environment variables that override job file keys
pub const ENV_PREFIX: &str = "WORDMAKE";

const TEMPLATE_HEADER: &str = "\
# wordmake job file
#
# mode: generate builds candidates from source word lists;
# mode: fix filters and repairs an existing list.
# Any key can be overridden from the environment, e.g.
#   WORDMAKE__OUTPUT=out.json WORDMAKE__OUTPUT_FORMAT=json wordmake job.yaml
";

/// Loads and saves YAML job files.
///
/// Loading goes through the `config` crate so that `WORDMAKE__<KEY>` environment
/// variables override the file (for example `WORDMAKE__SEED=7`). Saving writes plain
/// YAML with `serde_yaml_ng`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    env_prefix: String,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Load a job file, applying environment overrides.
    pub fn load_job(&self, path: &Utf8Path) -> Result<JobConfig> {
        self.load_job_with_env(path, None)
    }

    /// Load a job file with an explicit set of environment variables instead of the
    /// process environment.
    pub fn load_job_with_env(&self, path: &Utf8Path, env: Option<config::Map<String, String>>) -> Result<JobConfig> {
        if !path.exists() {
            anyhow::bail!("Job file not found: {}", path);
        }

        let environment = config::Environment::with_prefix(&self.env_prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("sources")
            .with_list_parse_key("blacklist")
            .with_list_parse_key("whitelist")
            .source(env);

        let settings = config::Config::builder()
            .add_source(config::File::new(path.as_str(), config::FileFormat::Yaml))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read job file: {}", path))?;

        let job: JobConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse job file: {}", path))?;

        tracing::info!("Loaded {} job from {}", job.mode_name(), path);
        Ok(job)
    }

    /// Parse a job from YAML text, without environment overrides.
    pub fn parse_job(yaml: &str) -> Result<JobConfig> {
        serde_yaml_ng::from_str(yaml).context("Failed to parse job YAML")
    }

    pub fn save_job(&self, path: &Utf8Path, job: &JobConfig) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(job).context("Failed to serialize job to YAML")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent))?;
        }
        fs::write(path, yaml_string).with_context(|| format!("Failed to write job file: {}", path))?;

        tracing::info!("Saved {} job to {}", job.mode_name(), path);
        Ok(())
    }

    /// Write `job` as a commented starting point. Refuses to overwrite an existing file.
    pub fn write_template(&self, path: &Utf8Path, job: &JobConfig) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Refusing to overwrite existing file: {}", path);
        }

        let yaml_string = serde_yaml_ng::to_string(job).context("Failed to serialize job to YAML")?;
        fs::write(path, format!("{}\n{}", TEMPLATE_HEADER, yaml_string))
            .with_context(|| format!("Failed to write job template: {}", path))?;

        tracing::info!("Wrote {} job template to {}", job.mode_name(), path);
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
