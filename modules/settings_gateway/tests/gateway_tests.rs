//! Integration tests for gateway lifecycle and caching

use serde_json::json;
use settings_gateway::{
    EntryOptions, ExistenceStatus, Gateway, GatewayError, InMemoryProvider, Provider,
    ProviderRegistry, Schema, SerializerRegistry,
};
use std::sync::Arc;

mod common;
use common::{print_test_header, scenario_schema, TestContext, GATEWAY};

#[tokio::test]
async fn test_gateway_properties() {
    let ctx = TestContext::with_schema(scenario_schema());

    assert_eq!(ctx.gateway.name(), GATEWAY);
    assert!(!ctx.gateway.is_ready());
    assert_eq!(ctx.gateway.provider_name().as_deref(), Some("memory"));
    assert!(ctx.gateway.provider().is_some());
    assert!(ctx.gateway.cached_ids().is_empty());
    assert!(ctx.gateway.get("1").is_none());
}

#[tokio::test]
async fn test_gateway_create_is_not_cached() {
    let ctx = TestContext::scenario().await;

    let created = ctx.gateway.create("1", None);
    assert_eq!(created.id(), "1");
    assert!(ctx.gateway.get("1").is_none());
}

#[tokio::test]
async fn test_gateway_acquire_caches() {
    let ctx = TestContext::scenario().await;

    let first = ctx.gateway.acquire("1", None);
    let second = ctx.gateway.acquire("1", None);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&ctx.gateway.get("1").unwrap(), &first));
    assert_eq!(ctx.gateway.cached_ids(), vec!["1"]);

    let removed = ctx.gateway.remove("1").unwrap();
    assert!(Arc::ptr_eq(&removed, &first));
    assert!(ctx.gateway.get("1").is_none());
}

#[tokio::test]
async fn test_gateway_init_creates_table() {
    print_test_header(
        "test_gateway_init_creates_table",
        &["Init freezes the schema and creates the backing table"],
    );
    let ctx = TestContext::with_schema(scenario_schema());
    assert!(!ctx.provider.has_table(GATEWAY).await.unwrap());

    ctx.gateway.init().await.unwrap();
    assert!(ctx.gateway.is_ready());
    assert!(ctx.gateway.schema().is_ready());
    assert!(ctx.provider.has_table(GATEWAY).await.unwrap());

    let err = ctx.gateway.init().await.unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyInitialized { .. }));

    let err = ctx
        .gateway
        .edit_schema(|schema| {
            schema.add("late", "string", EntryOptions::new())?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyReady));
}

#[tokio::test]
async fn test_gateway_init_keeps_existing_table() {
    let ctx = TestContext::with_schema(scenario_schema());
    ctx.provider.create_table(GATEWAY).await.unwrap();
    ctx.seed("1", json!({"count": 1})).await;

    ctx.gateway.init().await.unwrap();
    assert_eq!(ctx.stored("1").await, Some(json!({"id": "1", "count": 1})));
}

#[tokio::test]
async fn test_gateway_edit_schema_before_init() {
    let ctx = TestContext::with_schema(Schema::new());
    ctx.gateway
        .edit_schema(|schema| {
            schema.add("prefix", "string", EntryOptions::new().default_value(json!("!")))?;
            Ok(())
        })
        .unwrap();
    ctx.gateway.init().await.unwrap();

    let settings = ctx.gateway.create("1", None);
    assert_eq!(settings.to_json(), json!({"prefix": "!"}));
}

#[tokio::test]
async fn test_gateway_init_rejects_invalid_schema() {
    let mut schema = Schema::new();
    schema
        .add("colour", "paint", EntryOptions::new())
        .unwrap()
        .add("count", "number", EntryOptions::new().default_value(json!("ten")))
        .unwrap();
    let ctx = TestContext::with_schema(schema);

    let err = ctx.gateway.init().await.unwrap_err();
    let GatewayError::SchemaValidation { errors } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("colour - "));
    assert!(errors[1].starts_with("count - "));
    assert!(err.to_string().starts_with("There is an error with your schema."));
    assert!(!ctx.gateway.is_ready());
}

#[tokio::test]
async fn test_gateway_init_unknown_provider() {
    let providers = Arc::new(ProviderRegistry::new());
    let serializers = Arc::new(SerializerRegistry::with_builtins());
    let gateway = Gateway::builder("users", providers, serializers)
        .provider("postgres")
        .build();

    let err = gateway.init().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "The gateway \"users\" could not find the provider \"postgres\"."
    );
}

#[tokio::test]
async fn test_gateway_falls_back_to_default_provider() {
    let providers = Arc::new(ProviderRegistry::new());
    let serializers = Arc::new(SerializerRegistry::with_builtins());
    providers.register("memory", Arc::new(InMemoryProvider::new()));
    providers.set_default(Some("memory".to_string()));

    let gateway = Gateway::builder("users", providers.clone(), serializers).build();
    assert_eq!(gateway.provider_name().as_deref(), Some("memory"));
    gateway.init().await.unwrap();
    assert!(providers
        .get("memory")
        .unwrap()
        .has_table("users")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_gateway_provider_looked_up_per_call() {
    let ctx = TestContext::scenario().await;
    ctx.providers.clear();
    assert!(ctx.gateway.provider().is_none());

    let settings = ctx.gateway.acquire("1", None);
    let err = settings.sync(false).await.unwrap_err();
    assert!(matches!(err, GatewayError::ProviderMissing));

    let err = ctx.gateway.sync_all().await.unwrap_err();
    assert!(matches!(err, GatewayError::ProviderMissing));
}

#[tokio::test]
async fn test_gateway_sync_all() {
    print_test_header(
        "test_gateway_sync_all",
        &[
            "Bulk synchronization of every cached instance",
            "Instances without a row become NotExists",
        ],
    );
    let ctx = TestContext::scenario().await;
    ctx.seed("foo", json!({"count": 1})).await;
    ctx.seed("hello", json!({"count": 2})).await;

    let foo = ctx.gateway.acquire("foo", None);
    let hello = ctx.gateway.acquire("hello", None);
    let bar = ctx.gateway.acquire("bar", None);
    for settings in [&foo, &hello, &bar] {
        assert_eq!(settings.existence_status(), ExistenceStatus::Unsynchronized);
    }

    ctx.gateway.sync_all().await.unwrap();

    assert_eq!(foo.existence_status(), ExistenceStatus::Exists);
    assert_eq!(hello.existence_status(), ExistenceStatus::Exists);
    assert_eq!(bar.existence_status(), ExistenceStatus::NotExists);
    assert_eq!(hello.get("count").unwrap().to_value(), json!(2));
    assert_eq!(ctx.publisher.names(), vec!["settingsSync", "settingsSync"]);
}

#[tokio::test]
async fn test_gateway_sync_forces_refresh() {
    let ctx = TestContext::scenario().await;
    let settings = ctx.gateway.sync("1").await.unwrap();
    assert_eq!(settings.existence_status(), ExistenceStatus::NotExists);

    ctx.seed("1", json!({"count": 8})).await;
    let again = ctx.gateway.sync("1").await.unwrap();
    assert!(Arc::ptr_eq(&settings, &again));
    assert_eq!(again.existence_status(), ExistenceStatus::Exists);
    assert_eq!(again.get("count").unwrap().to_value(), json!(8));
}

#[tokio::test]
async fn test_gateway_to_json() {
    let ctx = TestContext::scenario().await;
    let value = ctx.gateway.to_json();

    assert_eq!(value["name"], json!(GATEWAY));
    assert_eq!(value["provider"], json!("memory"));
    assert_eq!(value["schema"]["count"]["type"], json!("number"));
    assert_eq!(value["schema"]["count"]["configurable"], json!(false));
    assert_eq!(value["schema"]["uses"]["array"], json!(true));
    assert_eq!(
        value["schema"]["messages"]["hello"]["type"],
        json!("object")
    );
}
