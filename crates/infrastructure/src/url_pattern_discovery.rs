use async_trait::async_trait;
use url::Url;

use tabwarden_application::DiscoveryService;
use tabwarden_core::{AppError, AppResult, PluginId};

const PLUGIN_ID_PLACEHOLDER: &str = "{pluginId}";

/// Resolves plugin base URLs from a URL pattern containing a `{pluginId}`
/// placeholder, e.g. `https://portal.example/api/{pluginId}`.
pub struct UrlPatternDiscovery {
    pattern: String,
}

impl UrlPatternDiscovery {
    /// Creates a discovery adapter from a URL pattern.
    pub fn new(pattern: impl Into<String>) -> AppResult<Self> {
        let pattern = pattern.into();

        if pattern.trim().is_empty() {
            return Err(AppError::Validation(
                "discovery url pattern must not be empty".to_owned(),
            ));
        }

        if !pattern.contains(PLUGIN_ID_PLACEHOLDER) {
            return Err(AppError::Validation(format!(
                "discovery url pattern '{pattern}' must contain '{PLUGIN_ID_PLACEHOLDER}'"
            )));
        }

        Ok(Self { pattern })
    }
}

#[async_trait]
impl DiscoveryService for UrlPatternDiscovery {
    async fn base_url(&self, plugin_id: &PluginId) -> AppResult<Url> {
        let resolved = self
            .pattern
            .replace(PLUGIN_ID_PLACEHOLDER, plugin_id.as_str());

        Url::parse(&resolved).map_err(|error| {
            AppError::Discovery(format!(
                "resolved base url '{resolved}' for plugin '{plugin_id}' is invalid: {error}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use tabwarden_application::DiscoveryService;
    use tabwarden_core::PluginId;

    use super::UrlPatternDiscovery;

    fn plugin(value: &str) -> PluginId {
        let Ok(plugin_id) = PluginId::new(value) else {
            panic!("test plugin id must be valid");
        };
        plugin_id
    }

    #[tokio::test]
    async fn substitutes_plugin_id_into_pattern() {
        let Ok(discovery) = UrlPatternDiscovery::new("https://portal.example/api/{pluginId}")
        else {
            panic!("pattern must be accepted");
        };

        let Ok(base_url) = discovery.base_url(&plugin("techdocs")).await else {
            panic!("base url must resolve");
        };
        assert_eq!(base_url.as_str(), "https://portal.example/api/techdocs");
    }

    #[test]
    fn rejects_pattern_without_placeholder() {
        assert!(UrlPatternDiscovery::new("https://portal.example/api").is_err());
    }

    #[tokio::test]
    async fn surfaces_unparseable_resolved_url_as_discovery_error() {
        let Ok(discovery) = UrlPatternDiscovery::new("not a url {pluginId}") else {
            panic!("pattern shape is not validated beyond the placeholder");
        };
        assert!(discovery.base_url(&plugin("techdocs")).await.is_err());
    }
}
