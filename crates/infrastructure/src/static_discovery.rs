use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use tabwarden_application::DiscoveryService;
use tabwarden_core::{AppError, AppResult, PluginId};

/// Resolves plugin base URLs from a fixed map, for deployments where every
/// plugin origin is known up front.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    base_urls: HashMap<String, Url>,
}

impl StaticDiscovery {
    /// Creates an empty static discovery adapter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_urls: HashMap::new(),
        }
    }

    /// Registers the base URL serving the given plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin_id: &PluginId, base_url: Url) -> Self {
        self.base_urls.insert(plugin_id.as_str().to_owned(), base_url);
        self
    }
}

#[async_trait]
impl DiscoveryService for StaticDiscovery {
    async fn base_url(&self, plugin_id: &PluginId) -> AppResult<Url> {
        self.base_urls
            .get(plugin_id.as_str())
            .cloned()
            .ok_or_else(|| {
                AppError::Discovery(format!("no base url registered for plugin '{plugin_id}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use tabwarden_application::DiscoveryService;
    use tabwarden_core::PluginId;
    use url::Url;

    use super::StaticDiscovery;

    #[tokio::test]
    async fn resolves_registered_plugin_and_rejects_unknown() {
        let Ok(plugin_id) = PluginId::new("catalog") else {
            panic!("test plugin id must be valid");
        };
        let Ok(base_url) = Url::parse("https://api.example/catalog") else {
            panic!("test url must parse");
        };

        let discovery = StaticDiscovery::new().with_plugin(&plugin_id, base_url.clone());

        let Ok(resolved) = discovery.base_url(&plugin_id).await else {
            panic!("registered plugin must resolve");
        };
        assert_eq!(resolved, base_url);

        let Ok(unknown) = PluginId::new("scaffolder") else {
            panic!("test plugin id must be valid");
        };
        assert!(discovery.base_url(&unknown).await.is_err());
    }
}
