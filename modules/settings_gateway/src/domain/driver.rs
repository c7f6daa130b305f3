//! Gateway driver - registry of gateways keyed by name

use crate::config::Config;
use crate::contract::GatewayResult;
use crate::domain::events::{EventPublisher, NoOpEventPublisher};
use crate::domain::gateway::Gateway;
use crate::domain::registry::{ProviderRegistry, SerializerRegistry};
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Registry of gateways sharing provider and serializer registries
pub struct GatewayDriver {
    gateways: IndexMap<String, Arc<Gateway>>,
    providers: Arc<ProviderRegistry>,
    serializers: Arc<SerializerRegistry>,
    publisher: Arc<dyn EventPublisher>,
    concurrent_init: bool,
}

impl GatewayDriver {
    pub fn new(providers: Arc<ProviderRegistry>, serializers: Arc<SerializerRegistry>) -> Self {
        Self {
            gateways: IndexMap::new(),
            providers,
            serializers,
            publisher: Arc::new(NoOpEventPublisher),
            concurrent_init: true,
        }
    }

    /// Build a driver with one empty-schema gateway per configured entry
    pub fn from_config(
        config: &Config,
        providers: Arc<ProviderRegistry>,
        serializers: Arc<SerializerRegistry>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        if config.default_provider.is_some() {
            providers.set_default(config.default_provider.clone());
        }

        let mut driver = Self::new(providers, serializers)
            .with_publisher(publisher)
            .with_concurrent_init(config.concurrent_init);
        for gateway in &config.gateways {
            let mut builder = driver.builder(&gateway.name);
            if let Some(provider) = &gateway.provider {
                builder = builder.provider(provider.clone());
            }
            if let Some(context) = &gateway.ambient_context {
                builder = builder.ambient_context(context.clone());
            }
            driver.register(builder.build());
        }
        driver
    }

    /// Publisher handed to gateways built through [`builder`](Self::builder)
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_concurrent_init(mut self, concurrent: bool) -> Self {
        self.concurrent_init = concurrent;
        self
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn serializers(&self) -> &Arc<SerializerRegistry> {
        &self.serializers
    }

    /// Gateway builder wired to this driver's registries and publisher
    pub fn builder(&self, name: &str) -> crate::domain::gateway::GatewayBuilder {
        Gateway::builder(name, self.providers.clone(), self.serializers.clone())
            .publisher(self.publisher.clone())
    }

    /// Add a gateway, replacing any gateway with the same name
    pub fn register(&mut self, gateway: Gateway) -> &mut Self {
        self.gateways
            .insert(gateway.name().to_string(), Arc::new(gateway));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<Gateway>> {
        self.gateways.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gateways.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Initialize every registered gateway
    pub async fn init(&self) -> GatewayResult<()> {
        if self.concurrent_init {
            try_join_all(self.gateways.values().map(|gateway| gateway.init())).await?;
        } else {
            for gateway in self.gateways.values() {
                gateway.init().await?;
            }
        }
        info!(gateways = self.gateways.len(), "Gateway driver initialized");
        Ok(())
    }

    /// `{name: gateway json}` for every gateway
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.gateways
                .iter()
                .map(|(name, gateway)| (name.clone(), gateway.to_json()))
                .collect::<Map<String, Value>>(),
        )
    }
}
