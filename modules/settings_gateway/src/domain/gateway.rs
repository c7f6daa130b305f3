//! Gateway - binds one schema to one provider table and caches settings

use crate::contract::{GatewayError, GatewayResult, Provider, Row, Serializer};
use crate::domain::events::{EventPublisher, NoOpEventPublisher};
use crate::domain::registry::{ProviderRegistry, SerializerRegistry};
use crate::domain::schema::Schema;
use crate::domain::settings::{Settings, SettingsTarget};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// State shared by a gateway and every settings instance it creates
pub(crate) struct GatewayContext {
    name: String,
    schema: RwLock<Arc<Schema>>,
    provider_name: Option<String>,
    providers: Arc<ProviderRegistry>,
    serializers: Arc<SerializerRegistry>,
    publisher: Arc<dyn EventPublisher>,
    ambient_context: Option<Value>,
}

impl GatewayContext {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn schema(&self) -> Arc<Schema> {
        self.schema.read().clone()
    }

    /// Configured provider name, falling back to the registry default
    pub(crate) fn provider_name(&self) -> Option<String> {
        self.provider_name
            .clone()
            .or_else(|| self.providers.default_name())
    }

    pub(crate) fn provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.provider_name()?)
    }

    pub(crate) fn serializer(&self, type_name: &str) -> GatewayResult<Arc<dyn Serializer>> {
        self.serializers
            .get(type_name)
            .ok_or_else(|| GatewayError::UnknownSerializer {
                type_name: type_name.to_string(),
            })
    }

    pub(crate) fn publisher(&self) -> &dyn EventPublisher {
        self.publisher.as_ref()
    }

    pub(crate) fn ambient_context(&self) -> Option<&Value> {
        self.ambient_context.as_ref()
    }
}

/// Builder for [`Gateway`]
pub struct GatewayBuilder {
    name: String,
    schema: Schema,
    provider_name: Option<String>,
    providers: Arc<ProviderRegistry>,
    serializers: Arc<SerializerRegistry>,
    publisher: Arc<dyn EventPublisher>,
    ambient_context: Option<Value>,
}

impl GatewayBuilder {
    /// Schema to bind, an empty one otherwise
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Provider name, the registry default otherwise
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Host context forwarded with every create and update event
    pub fn ambient_context(mut self, context: Value) -> Self {
        self.ambient_context = Some(context);
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            ctx: Arc::new(GatewayContext {
                name: self.name,
                schema: RwLock::new(Arc::new(self.schema)),
                provider_name: self.provider_name,
                providers: self.providers,
                serializers: self.serializers,
                publisher: self.publisher,
                ambient_context: self.ambient_context,
            }),
            cache: RwLock::new(IndexMap::new()),
            init_lock: tokio::sync::Mutex::new(()),
            ready: AtomicBool::new(false),
        }
    }
}

/// Binds one schema to one provider table
///
/// The gateway name doubles as the table name. Settings instances are cached
/// by id, at most one per id.
pub struct Gateway {
    ctx: Arc<GatewayContext>,
    cache: RwLock<IndexMap<String, Arc<Settings>>>,
    init_lock: tokio::sync::Mutex<()>,
    ready: AtomicBool,
}

impl Gateway {
    /// Start building a gateway named `name`
    pub fn builder(
        name: impl Into<String>,
        providers: Arc<ProviderRegistry>,
        serializers: Arc<SerializerRegistry>,
    ) -> GatewayBuilder {
        GatewayBuilder {
            name: name.into(),
            schema: Schema::new(),
            provider_name: None,
            providers,
            serializers,
            publisher: Arc::new(NoOpEventPublisher),
            ambient_context: None,
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Current schema
    pub fn schema(&self) -> Arc<Schema> {
        self.ctx.schema()
    }

    /// Edit the schema; fails with `AlreadyReady` once initialized
    pub fn edit_schema<R, F>(&self, edit: F) -> GatewayResult<R>
    where
        F: FnOnce(&mut Schema) -> GatewayResult<R>,
    {
        let mut schema = self.ctx.schema.write();
        if schema.is_ready() {
            return Err(GatewayError::AlreadyReady);
        }
        edit(Arc::make_mut(&mut schema))
    }

    /// Name of the provider this gateway resolves
    pub fn provider_name(&self) -> Option<String> {
        self.ctx.provider_name()
    }

    /// Bound provider, looked up on every call
    pub fn provider(&self) -> Option<Arc<dyn Provider>> {
        self.ctx.provider()
    }

    /// Validate and freeze the schema, then make sure the table exists
    pub async fn init(&self) -> GatewayResult<()> {
        let _guard = self.init_lock.lock().await;
        if self.is_ready() {
            return Err(GatewayError::AlreadyInitialized {
                gateway: self.name().to_string(),
            });
        }

        {
            let mut schema = self.ctx.schema.write();
            schema.validate(&self.ctx.serializers)?;
            Arc::make_mut(&mut schema).freeze();
        }

        let provider = self.provider().ok_or_else(|| GatewayError::ProviderNotFound {
            gateway: self.name().to_string(),
            provider: self.provider_name().unwrap_or_default(),
        })?;

        let exists = provider
            .has_table(self.name())
            .await
            .map_err(GatewayError::Provider)?;
        if !exists {
            provider
                .create_table(self.name())
                .await
                .map_err(GatewayError::Provider)?;
            info!(gateway = %self.name(), "Created settings table");
        }

        self.ready.store(true, Ordering::Release);
        info!(
            gateway = %self.name(),
            provider = %self.provider_name().unwrap_or_default(),
            "Gateway initialized"
        );
        Ok(())
    }

    /// Synchronize every cached instance with one provider request
    ///
    /// Instances without a stored row become `NotExists`.
    pub async fn sync_all(&self) -> GatewayResult<()> {
        let provider = self.provider().ok_or(GatewayError::ProviderMissing)?;
        let cached: Vec<Arc<Settings>> = self.cache.read().values().cloned().collect();
        if cached.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = cached.iter().map(|s| s.id().to_string()).collect();
        let rows = provider
            .get_all(self.name(), Some(&ids))
            .await
            .map_err(GatewayError::Provider)?;

        let mut rows: HashMap<String, Row> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id")?.as_str()?.to_string();
                Some((id, row))
            })
            .collect();

        debug!(gateway = %self.name(), cached = cached.len(), found = rows.len(), "Bulk synchronization");
        for settings in cached {
            let row = rows.remove(settings.id());
            settings.load(row).await;
        }
        Ok(())
    }

    /// Acquire the instance for `id` and force a synchronization
    pub async fn sync(&self, id: &str) -> GatewayResult<Arc<Settings>> {
        let settings = self.acquire(id, None);
        settings.sync(true).await?;
        Ok(settings)
    }

    /// Cached instance for `id`, never created implicitly
    pub fn get(&self, id: &str) -> Option<Arc<Settings>> {
        self.cache.read().get(id).cloned()
    }

    /// New unsynchronized instance, not cached
    pub fn create(&self, id: &str, target: Option<SettingsTarget>) -> Arc<Settings> {
        Settings::new(self.ctx.clone(), id, target)
    }

    /// Cached instance for `id`, created and cached on a miss
    pub fn acquire(&self, id: &str, target: Option<SettingsTarget>) -> Arc<Settings> {
        if let Some(settings) = self.get(id) {
            return settings;
        }
        let mut cache = self.cache.write();
        cache
            .entry(id.to_string())
            .or_insert_with(|| Settings::new(self.ctx.clone(), id, target))
            .clone()
    }

    /// Evict a cached instance
    pub fn remove(&self, id: &str) -> Option<Arc<Settings>> {
        self.cache.write().shift_remove(id)
    }

    /// Ids of the cached instances, in insertion order
    pub fn cached_ids(&self) -> Vec<String> {
        self.cache.read().keys().cloned().collect()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name(),
            "provider": self.provider_name(),
            "schema": self.schema().to_json(),
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("name", &self.name())
            .field("provider", &self.provider_name())
            .field("ready", &self.is_ready())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}
