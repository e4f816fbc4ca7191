//! Clap-free settings for one pipeline invocation.

use crate::config::TailpatchConfig;
use camino::Utf8PathBuf;
use tailpatch_types::{DEFAULT_PROJECT, PluginSpec};

/// Settings for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Destination directory; the archive is extracted here. Two concurrent
    /// runs never share one.
    pub work_dir: Utf8PathBuf,

    pub project: String,
    pub version: String,
    pub plugins: Vec<PluginSpec>,

    /// `{os}-{cpu}` of the build host.
    pub host_arch: String,

    // Deploy
    pub bucket: String,
    pub prefix: String,
}

impl PipelineSettings {
    pub fn new(work_dir: impl Into<Utf8PathBuf>, version: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_plugins(mut self, plugins: Vec<PluginSpec>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Take deploy coordinates from the config file where not already set.
    pub fn apply_config(mut self, config: &TailpatchConfig) -> Self {
        if self.bucket.is_empty() {
            self.bucket = config.deploy.bucket.clone();
        }
        if self.prefix.is_empty() {
            self.prefix = config.deploy.prefix.clone();
        }
        self
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: Utf8PathBuf::from("work"),
            project: DEFAULT_PROJECT.to_string(),
            version: String::new(),
            plugins: Vec::new(),
            host_arch: tailpatch_domain::host_architecture(),
            bucket: String::new(),
            prefix: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn config_fills_only_missing_deploy_fields() {
        let cfg = parse_config("[deploy]\nbucket = \"from-file\"\nprefix = \"p\"\n").unwrap();
        let mut settings = PipelineSettings::new("/tmp/w", "4.1.11");
        settings.bucket = "from-caller".to_string();

        let settings = settings.apply_config(&cfg);

        assert_eq!(settings.bucket, "from-caller");
        assert_eq!(settings.prefix, "p");
        assert_eq!(settings.project, "tailwindcss");
    }
}
