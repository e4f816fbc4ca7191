//! Configuration file loading for tailpatch.
//!
//! Discovers and loads `tailpatch.toml` from the work directory and turns it
//! into a [`ConfigProvider`].

use crate::ports::{ConfigProvider, PolicyDecision, PolicyQuery};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::time::Duration;
use tailpatch_types::pipeline::Stage;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "tailpatch.toml";

/// Top-level configuration from tailpatch.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TailpatchConfig {
    pub policy: PolicyConfig,
    pub timeouts: TimeoutsConfig,
    pub deploy: DeployConfig,
}

/// Policy section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Version glob patterns. If non-empty, only matching versions run.
    pub allow_versions: Vec<String>,

    /// Version glob patterns that never run. Wins over `allow_versions`.
    pub deny_versions: Vec<String>,

    /// Plugin name patterns. If non-empty, every plugin must match one.
    pub allow_plugins: Vec<String>,

    pub deny_plugins: Vec<String>,

    /// Stages that are always refused, e.g. `["deploy"]` for dry runs.
    pub blocked_stages: Vec<Stage>,
}

/// Per-stage timeouts in seconds. `0` disables the timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub fetch_secs: u64,
    pub build_secs: u64,
    pub deploy_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            fetch_secs: 300,
            build_secs: 1800,
            deploy_secs: 600,
        }
    }
}

/// Deploy section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub bucket: String,
    pub prefix: String,
}

/// Discover the tailpatch.toml config file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a tailpatch.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<TailpatchConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<TailpatchConfig> {
    let config: TailpatchConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `dir`, or return the default if not found.
pub fn load_or_default(dir: &Utf8Path) -> anyhow::Result<TailpatchConfig> {
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(TailpatchConfig::default()),
    }
}

/// [`ConfigProvider`] backed by a parsed `tailpatch.toml`.
#[derive(Debug, Clone, Default)]
pub struct FileConfigProvider {
    config: TailpatchConfig,
}

impl FileConfigProvider {
    pub fn new(config: TailpatchConfig) -> Self {
        Self { config }
    }

    pub fn load_or_default(dir: &Utf8Path) -> anyhow::Result<Self> {
        load_or_default(dir).map(Self::new)
    }

    pub fn config(&self) -> &TailpatchConfig {
        &self.config
    }
}

impl ConfigProvider for FileConfigProvider {
    fn decide(&self, query: &PolicyQuery<'_>) -> PolicyDecision {
        let policy = &self.config.policy;

        if policy.blocked_stages.contains(&query.stage) {
            return blocked(format!("stage {} is disabled", query.stage));
        }

        let version = query.version.trim();
        if let Some(pat) = policy.deny_versions.iter().find(|p| glob_match(p, version)) {
            return blocked(format!("version {version} is denied by {pat:?}"));
        }
        if !policy.allow_versions.is_empty()
            && !policy.allow_versions.iter().any(|p| glob_match(p, version))
        {
            return blocked(format!("version {version} is not in the allow list"));
        }

        for plugin in query.plugins {
            let name = plugin.name();
            if let Some(pat) = policy.deny_plugins.iter().find(|p| glob_match(p, name)) {
                return blocked(format!("plugin {name} is denied by {pat:?}"));
            }
            if !policy.allow_plugins.is_empty()
                && !policy.allow_plugins.iter().any(|p| glob_match(p, name))
            {
                return blocked(format!("plugin {name} is not in the allow list"));
            }
        }

        PolicyDecision::Allow
    }

    fn timeout(&self, stage: Stage) -> Option<Duration> {
        let t = &self.config.timeouts;
        let secs = match stage {
            Stage::Fetch => t.fetch_secs,
            Stage::Patch => 0,
            Stage::Build => t.build_secs,
            Stage::Deploy => t.deploy_secs,
        };
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

fn blocked(reason: String) -> PolicyDecision {
    PolicyDecision::Blocked { reason }
}

/// `*` matches any run of characters, `?` exactly one.
pub(crate) fn glob_match(pat: &str, text: &str) -> bool {
    let p = pat.as_bytes();
    let t = text.as_bytes();
    let mut dp = vec![vec![false; t.len() + 1]; p.len() + 1];
    dp[0][0] = true;

    for i in 1..=p.len() {
        if p[i - 1] == b'*' {
            dp[i][0] = dp[i - 1][0];
        }
    }

    for i in 1..=p.len() {
        for j in 1..=t.len() {
            dp[i][j] = match p[i - 1] {
                b'*' => dp[i - 1][j] || dp[i][j - 1],
                b'?' => dp[i - 1][j - 1],
                c => dp[i - 1][j - 1] && c == t[j - 1],
            };
        }
    }

    dp[p.len()][t.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailpatch_types::PluginSpec;
    use tempfile::TempDir;

    fn query<'a>(stage: Stage, version: &'a str, plugins: &'a [PluginSpec]) -> PolicyQuery<'a> {
        PolicyQuery {
            stage,
            version,
            plugins,
        }
    }

    #[test]
    fn parse_full_config() {
        let cfg = parse_config(
            r#"
[policy]
allow_versions = ["3.*", "4.*"]
deny_versions = ["4.0.0-*"]
allow_plugins = ["daisyui"]
blocked_stages = ["deploy"]

[timeouts]
build_secs = 30

[deploy]
bucket = "tailwind-builds"
prefix = "standalone"
"#,
        )
        .unwrap();
        assert_eq!(cfg.policy.allow_versions, vec!["3.*", "4.*"]);
        assert_eq!(cfg.policy.blocked_stages, vec![Stage::Deploy]);
        assert_eq!(cfg.timeouts.build_secs, 30);
        assert_eq!(cfg.timeouts.fetch_secs, 300);
        assert_eq!(cfg.deploy.bucket, "tailwind-builds");
    }

    #[test]
    fn empty_config_allows_everything() {
        let provider = FileConfigProvider::new(parse_config("").unwrap());
        assert_eq!(
            provider.decide(&query(Stage::Fetch, "4.1.11", &[])),
            PolicyDecision::Allow
        );
        assert_eq!(
            provider.timeout(Stage::Build),
            Some(Duration::from_secs(1800))
        );
        assert_eq!(provider.timeout(Stage::Patch), None);
    }

    #[test]
    fn deny_wins_over_allow() {
        let provider = FileConfigProvider::new(
            parse_config("[policy]\nallow_versions = [\"4.*\"]\ndeny_versions = [\"4.0.0-*\"]\n")
                .unwrap(),
        );
        assert_eq!(
            provider.decide(&query(Stage::Fetch, "4.1.11", &[])),
            PolicyDecision::Allow
        );
        assert!(matches!(
            provider.decide(&query(Stage::Fetch, "4.0.0-beta.1", &[])),
            PolicyDecision::Blocked { .. }
        ));
        assert!(matches!(
            provider.decide(&query(Stage::Fetch, "3.4.17", &[])),
            PolicyDecision::Blocked { .. }
        ));
    }

    #[test]
    fn plugin_lists_and_blocked_stages() {
        let provider = FileConfigProvider::new(
            parse_config("[policy]\ndeny_plugins = [\"tailwind-*\"]\nblocked_stages = [\"deploy\"]\n")
                .unwrap(),
        );
        let plugins = [PluginSpec::new(r#""tailwind-scrollbar": "^4""#).unwrap()];
        let PolicyDecision::Blocked { reason } =
            provider.decide(&query(Stage::Fetch, "4.1.11", &plugins))
        else {
            panic!("expected block");
        };
        assert!(reason.contains("tailwind-scrollbar"));

        let PolicyDecision::Blocked { reason } =
            provider.decide(&query(Stage::Deploy, "4.1.11", &[]))
        else {
            panic!("expected block");
        };
        assert_eq!(reason, "stage deploy is disabled");
    }

    #[test]
    fn zero_timeout_disables() {
        let provider =
            FileConfigProvider::new(parse_config("[timeouts]\nfetch_secs = 0\n").unwrap());
        assert_eq!(provider.timeout(Stage::Fetch), None);
    }

    #[test]
    fn discover_and_load() {
        let td = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        assert!(discover_config(&dir).is_none());
        assert_eq!(load_or_default(&dir).unwrap().timeouts.deploy_secs, 600);

        fs::write(dir.join(CONFIG_FILE_NAME), "[deploy]\nbucket = \"b\"\n").unwrap();
        let provider = FileConfigProvider::load_or_default(&dir).unwrap();
        assert_eq!(provider.config().deploy.bucket, "b");

        fs::write(dir.join(CONFIG_FILE_NAME), "[policy\n").unwrap();
        let err = load_or_default(&dir).unwrap_err();
        assert!(format!("{err:#}").contains("invalid TOML"));
    }

    #[test]
    fn glob_match_handles_star_and_question() {
        assert!(glob_match("3.*", "3.4.17"));
        assert!(glob_match("4.?.11", "4.1.11"));
        assert!(!glob_match("4.?.11", "4.10.11"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("daisyui", "daisyui-extra"));
    }
}
