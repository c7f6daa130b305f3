//! Common test utilities and the shared settings scenario
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use settings_gateway::{
    EntryOptions, EventPublisher, Gateway, GatewayResult, InMemoryProvider, Provider,
    ProviderRegistry, Row, Schema, SerializerRegistry, SettingsEvent,
};
use std::sync::Arc;

pub const GATEWAY: &str = "settings-test";
pub const PROVIDER: &str = "memory";

/// Publisher keeping every event in memory
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<SettingsEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SettingsEvent> {
        self.events.lock().clone()
    }

    /// Event names in emission order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SettingsEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: SettingsEvent) -> anyhow::Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Scenario schema used across the integration tests
///
/// ```text
/// uses: number[]
/// count: number (not configurable)
/// messages:
///   ignoring:
///     amount: number
///   hello: object
/// ```
pub fn scenario_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add("uses", "number", EntryOptions::new().array())
        .unwrap()
        .add("count", "number", EntryOptions::new().configurable(false))
        .unwrap()
        .add_folder("messages", |messages| {
            messages.add_folder("ignoring", |ignoring| {
                ignoring.add("amount", "number", EntryOptions::new())?;
                Ok(())
            })?;
            messages.add("hello", "object", EntryOptions::new())?;
            Ok(())
        })
        .unwrap();
    schema
}

/// Registries, memory provider and recording publisher around one gateway
pub struct TestContext {
    pub providers: Arc<ProviderRegistry>,
    pub serializers: Arc<SerializerRegistry>,
    pub provider: Arc<InMemoryProvider>,
    pub publisher: Arc<RecordingEventPublisher>,
    pub gateway: Gateway,
}

impl TestContext {
    /// Uninitialized gateway over `schema`
    pub fn with_schema(schema: Schema) -> Self {
        let providers = Arc::new(ProviderRegistry::new());
        let serializers = Arc::new(SerializerRegistry::with_builtins());
        let provider = Arc::new(InMemoryProvider::new());
        providers.register(PROVIDER, provider.clone());
        let publisher = Arc::new(RecordingEventPublisher::new());

        let gateway = Gateway::builder(GATEWAY, providers.clone(), serializers.clone())
            .schema(schema)
            .provider(PROVIDER)
            .publisher(publisher.clone())
            .build();

        Self {
            providers,
            serializers,
            provider,
            publisher,
            gateway,
        }
    }

    /// Initialized gateway over the scenario schema
    pub async fn scenario() -> Self {
        let ctx = Self::with_schema(scenario_schema());
        ctx.gateway.init().await.unwrap();
        ctx
    }

    /// Insert a row directly in the gateway table
    pub async fn seed(&self, id: &str, data: Value) {
        self.provider
            .create(GATEWAY, id, &row(data))
            .await
            .unwrap();
    }

    /// Stored row as a JSON value
    pub async fn stored(&self, id: &str) -> Option<Value> {
        self.provider
            .get(GATEWAY, id)
            .await
            .unwrap()
            .map(Value::Object)
    }
}

/// Row from a JSON object literal
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// `{path: next}` view of a change list
pub fn changed_paths(changes: &[settings_gateway::Change]) -> Vec<(String, Value)> {
    changes
        .iter()
        .map(|change| (change.path().to_string(), change.next.clone()))
        .collect()
}

pub fn assert_err<T: std::fmt::Debug>(result: GatewayResult<T>) -> settings_gateway::GatewayError {
    match result {
        Ok(value) => panic!("expected an error, got {value:?}"),
        Err(error) => error,
    }
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}
