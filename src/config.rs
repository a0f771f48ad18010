//! # Dispatch Configuration Module
//!
//! Tunables for the dispatch engine, loadable from a YAML file and
//! overridable through environment variables.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `BRRTR_CONTINUED_SEARCH` | `search_policy_continued_search` | `false` |
//! | `BRRTR_ROOT_CACHE_CAPACITY` | `root_cache_capacity` | `1024` |
//! | `BRRTR_DEFAULT_PRIORITY` | `default_priority` | `-1.0` |
//! | `BRRTR_VARY_HEADER` | `add_vary_header` | `true` |
//!
//! Unparsable values are ignored with a warning.
//!
//! ## Continued search
//!
//! In strict mode only the first (best ranked) root resource and the first
//! matching sub-resource at each level are tried. Continued search keeps
//! trying lower-ranked candidates after a failure, at every locator depth.
//!
//! ## Example
//!
//! ```yaml
//! search_policy_continued_search: true
//! root_cache_capacity: 256
//! media_type_mapper:
//!   - user_agent_prefix: "Mozilla/4.0"
//!     result_type: "application/json"
//!     replacement: "text/plain"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::media::MediaType;

/// Dispatch engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Keep trying candidates after the first one fails.
    pub search_policy_continued_search: bool,
    /// Entries in the path to root candidates cache; 0 disables it.
    pub root_cache_capacity: usize,
    /// Priority of resources registered without one.
    pub default_priority: f64,
    /// Add `Vary: Accept` when negotiation depended on the Accept header.
    pub add_vary_header: bool,
    /// Rewrites of the negotiated response type for specific clients.
    pub media_type_mapper: Vec<MediaTypeMapping>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            search_policy_continued_search: false,
            root_cache_capacity: 1024,
            default_priority: -1.0,
            add_vary_header: true,
            media_type_mapper: Vec::new(),
        }
    }
}

impl DispatchConfig {
    /// Read a YAML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dispatch config: {}", path.display()))?;
        let config: DispatchConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse dispatch config: {}", path.display()))?;
        for mapping in &config.media_type_mapper {
            mapping
                .validate()
                .with_context(|| format!("Invalid media_type_mapper in {}", path.display()))?;
        }
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BRRTR_*` environment variables on top of `self`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_value::<bool>("BRRTR_CONTINUED_SEARCH") {
            self.search_policy_continued_search = v;
        }
        if let Some(v) = env_value::<usize>("BRRTR_ROOT_CACHE_CAPACITY") {
            self.root_cache_capacity = v;
        }
        if let Some(v) = env_value::<f64>("BRRTR_DEFAULT_PRIORITY") {
            self.default_priority = v;
        }
        if let Some(v) = env_value::<bool>("BRRTR_VARY_HEADER") {
            self.add_vary_header = v;
        }
        self
    }

    /// Replacement for `negotiated` when a mapping matches `user_agent`.
    #[must_use]
    pub fn map_media_type(
        &self,
        user_agent: Option<&str>,
        negotiated: &MediaType,
    ) -> Option<MediaType> {
        let user_agent = user_agent?;
        self.media_type_mapper
            .iter()
            .find(|m| m.applies_to(user_agent, negotiated))
            .and_then(|m| MediaType::parse(&m.replacement).ok())
    }
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

/// Send `replacement` instead of `result_type` to clients whose
/// `User-Agent` starts with `user_agent_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTypeMapping {
    pub user_agent_prefix: String,
    pub result_type: String,
    pub replacement: String,
}

impl MediaTypeMapping {
    fn validate(&self) -> anyhow::Result<()> {
        MediaType::parse(&self.result_type)
            .with_context(|| format!("result_type {:?}", self.result_type))?;
        MediaType::parse(&self.replacement)
            .with_context(|| format!("replacement {:?}", self.replacement))?;
        Ok(())
    }

    fn applies_to(&self, user_agent: &str, negotiated: &MediaType) -> bool {
        user_agent.starts_with(&self.user_agent_prefix)
            && MediaType::parse(&self.result_type)
                .map(|m| m.same_essence(negotiated))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert!(!config.search_policy_continued_search);
        assert_eq!(config.root_cache_capacity, 1024);
        assert_eq!(config.default_priority, -1.0);
        assert!(config.add_vary_header);
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "search_policy_continued_search: true\nroot_cache_capacity: 8\nmedia_type_mapper:\n  - user_agent_prefix: \"Legacy/\"\n    result_type: application/json\n    replacement: text/plain"
        )
        .unwrap();
        let config = DispatchConfig::load(file.path()).unwrap();
        assert!(config.search_policy_continued_search);
        assert_eq!(config.root_cache_capacity, 8);
        assert_eq!(config.default_priority, -1.0);
        assert_eq!(config.media_type_mapper.len(), 1);
    }

    #[test]
    fn test_load_rejects_bad_mapping() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "media_type_mapper:\n  - user_agent_prefix: x\n    result_type: \"/\"\n    replacement: text/plain"
        )
        .unwrap();
        let err = DispatchConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("media_type_mapper"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DispatchConfig::load(Path::new("/nonexistent/dispatch.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read dispatch config"));
    }

    #[test]
    fn test_media_type_mapping() {
        let config = DispatchConfig {
            media_type_mapper: vec![MediaTypeMapping {
                user_agent_prefix: "Legacy/".into(),
                result_type: "application/json".into(),
                replacement: "text/plain".into(),
            }],
            ..DispatchConfig::default()
        };
        let json = MediaType::application_json();
        assert_eq!(
            config.map_media_type(Some("Legacy/1.0"), &json),
            Some(MediaType::text_plain())
        );
        assert_eq!(config.map_media_type(Some("Modern/2.0"), &json), None);
        assert_eq!(config.map_media_type(None, &json), None);
        assert_eq!(
            config.map_media_type(Some("Legacy/1.0"), &MediaType::text_plain()),
            None
        );
    }
}
