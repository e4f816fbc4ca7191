use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginSpecError {
    #[error("dependency line {line:?} is not of the form \"name\": \"range\"")]
    MalformedDependencyLine { line: String },

    #[error("dependency line {line:?} has an empty plugin name")]
    EmptyName { line: String },

    #[error("dependency line {line:?} has an empty version range")]
    EmptyRange { line: String },

    #[error("subpath {subpath:?} for plugin {name} is not a relative module path")]
    InvalidSubpath { name: String, subpath: String },

    #[error("plugin {name} has no require statement for the legacy bundler stub")]
    MissingLegacyRequire { name: String },
}

/// A plugin to inject into the upstream tree.
///
/// Validated once in [`PluginSpec::new`]; every accessor is infallible after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPluginSpec", into = "RawPluginSpec")]
pub struct PluginSpec {
    name: String,
    range: String,
    dependency_line: String,
    legacy_require: Option<String>,
    subpaths: Vec<String>,
}

impl PluginSpec {
    /// Parse a colon-delimited `"name": "range"` manifest line.
    pub fn new(dependency_line: impl Into<String>) -> Result<Self, PluginSpecError> {
        let dependency_line = dependency_line.into();
        let (name, range) = parse_dependency_line(&dependency_line)?;
        Ok(Self {
            name,
            range,
            dependency_line,
            legacy_require: None,
            subpaths: Vec::new(),
        })
    }

    /// Attach the require-table entry used by the legacy bundler stub,
    /// e.g. `'daisyui': require('daisyui')`.
    pub fn with_legacy_require(mut self, statement: impl Into<String>) -> Self {
        let statement = statement.into();
        let trimmed = statement.trim().trim_end_matches(',').trim_end();
        self.legacy_require = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Declare subpath re-exports (e.g. `theme` for `daisyui/theme`).
    pub fn with_subpaths<I, S>(mut self, subpaths: I) -> Result<Self, PluginSpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for sub in subpaths {
            let sub = sub.into();
            let sub = sub.trim().trim_matches('/').to_string();
            if sub.is_empty() || sub.contains(['\'', '"', '\\']) || sub.split('/').any(|s| s == "..") {
                return Err(PluginSpecError::InvalidSubpath {
                    name: self.name.clone(),
                    subpath: sub,
                });
            }
            if !out.contains(&sub) {
                out.push(sub);
            }
        }
        self.subpaths = out;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &str {
        &self.range
    }

    pub fn dependency_line(&self) -> &str {
        &self.dependency_line
    }

    pub fn legacy_require(&self) -> Option<&str> {
        self.legacy_require.as_deref()
    }

    pub fn subpaths(&self) -> &[String] {
        &self.subpaths
    }
}

fn parse_dependency_line(line: &str) -> Result<(String, String), PluginSpecError> {
    let malformed = || PluginSpecError::MalformedDependencyLine {
        line: line.to_string(),
    };

    let trimmed = line.trim().trim_end_matches(',').trim_end();
    let (raw_name, raw_range) = trimmed.split_once(':').ok_or_else(malformed)?;

    let name = unquote(raw_name).ok_or_else(malformed)?;
    let range = unquote(raw_range).ok_or_else(malformed)?;

    if name.is_empty() {
        return Err(PluginSpecError::EmptyName {
            line: line.to_string(),
        });
    }
    if name.chars().any(|c| c.is_whitespace() || c == '\'' || c == '\\') {
        return Err(malformed());
    }
    if range.is_empty() {
        return Err(PluginSpecError::EmptyRange {
            line: line.to_string(),
        });
    }

    Ok((name.to_string(), range.to_string()))
}

fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    s.strip_prefix('"')?.strip_suffix('"')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPluginSpec {
    dependency_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legacy_require: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subpaths: Vec<String>,
}

impl TryFrom<RawPluginSpec> for PluginSpec {
    type Error = PluginSpecError;

    fn try_from(raw: RawPluginSpec) -> Result<Self, Self::Error> {
        let mut spec = PluginSpec::new(raw.dependency_line)?.with_subpaths(raw.subpaths)?;
        if let Some(req) = raw.legacy_require {
            spec = spec.with_legacy_require(req);
        }
        Ok(spec)
    }
}

impl From<PluginSpec> for RawPluginSpec {
    fn from(spec: PluginSpec) -> Self {
        Self {
            dependency_line: spec.dependency_line,
            legacy_require: spec.legacy_require,
            subpaths: spec.subpaths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_range() {
        let spec = PluginSpec::new(r#""daisyui": "^4.12.23""#).unwrap();
        assert_eq!(spec.name(), "daisyui");
        assert_eq!(spec.range(), "^4.12.23");
    }

    #[test]
    fn tolerates_trailing_comma_and_whitespace() {
        let spec = PluginSpec::new("  \"@tailwindcss/forms\" :  \"0.5.9\" ,").unwrap();
        assert_eq!(spec.name(), "@tailwindcss/forms");
        assert_eq!(spec.range(), "0.5.9");
    }

    #[test]
    fn missing_colon_is_rejected() {
        let err = PluginSpec::new(r#""daisyui" "^4""#).unwrap_err();
        assert!(matches!(err, PluginSpecError::MalformedDependencyLine { .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = PluginSpec::new(r#""": "^4""#).unwrap_err();
        assert!(matches!(err, PluginSpecError::EmptyName { .. }));
    }

    #[test]
    fn empty_range_is_rejected() {
        let err = PluginSpec::new(r#""daisyui": """#).unwrap_err();
        assert!(matches!(err, PluginSpecError::EmptyRange { .. }));
    }

    #[test]
    fn range_may_contain_colons() {
        let spec = PluginSpec::new(r#""daisyui": "npm:daisyui@5""#).unwrap();
        assert_eq!(spec.range(), "npm:daisyui@5");
    }

    #[test]
    fn legacy_require_is_normalized() {
        let spec = PluginSpec::new(r#""daisyui": "^4""#)
            .unwrap()
            .with_legacy_require("  'daisyui': require('daisyui'), ");
        assert_eq!(spec.legacy_require(), Some("'daisyui': require('daisyui')"));
    }

    #[test]
    fn subpaths_are_deduplicated_and_validated() {
        let spec = PluginSpec::new(r#""daisyui": "^5""#)
            .unwrap()
            .with_subpaths(["theme", "/theme/", "components"])
            .unwrap();
        assert_eq!(spec.subpaths(), ["theme", "components"]);

        let err = PluginSpec::new(r#""daisyui": "^5""#)
            .unwrap()
            .with_subpaths(["../escape"])
            .unwrap_err();
        assert!(matches!(err, PluginSpecError::InvalidSubpath { .. }));
    }

    #[test]
    fn deserialization_validates() {
        let ok: PluginSpec = serde_json::from_str(
            r#"{"dependency_line": "\"daisyui\": \"^5\"", "subpaths": ["theme"]}"#,
        )
        .unwrap();
        assert_eq!(ok.name(), "daisyui");
        assert_eq!(ok.subpaths(), ["theme"]);

        let bad = serde_json::from_str::<PluginSpec>(r#"{"dependency_line": "daisyui"}"#);
        assert!(bad.is_err());
    }
}
