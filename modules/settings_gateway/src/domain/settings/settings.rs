//! Settings instances and the update/reset engine

use super::{array, read_entry, read_folder, Change, SettingsFolder};
use crate::contract::{
    ArrayAction, ExistenceStatus, GatewayError, GatewayResult, Provider, ResetOptions, Row,
    Serializer, SerializerContext, UpdateOptions,
};
use crate::domain::events::{emit, SettingsEvent, UpdateContext};
use crate::domain::gateway::GatewayContext;
use crate::domain::schema::{Schema, SchemaEntry, SchemaFolder, SchemaNode};
use crate::domain::util::{get_nested, join_path, set_nested};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// Opaque host object identified by a settings id
pub type SettingsTarget = Arc<dyn Any + Send + Sync>;

struct SettingsState {
    status: ExistenceStatus,
    values: Map<String, Value>,
}

/// How a batch of changes is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// Creates the row when it does not exist
    Update,
    /// Only writes to an existing row
    Reset,
}

/// Settings of one entity in one gateway
///
/// Dereferences to the root [`SettingsFolder`], which carries the read and
/// mutation operations.
pub struct Settings {
    id: String,
    target: Option<SettingsTarget>,
    gateway: Arc<GatewayContext>,
    root: SettingsFolder,
    state: RwLock<SettingsState>,
}

impl Settings {
    /// Unsynchronized settings holding the schema defaults
    pub(crate) fn new(
        gateway: Arc<GatewayContext>,
        id: impl Into<String>,
        target: Option<SettingsTarget>,
    ) -> Arc<Self> {
        let values = gateway.schema().default_values();
        Self::build(
            gateway,
            id.into(),
            target,
            ExistenceStatus::Unsynchronized,
            values,
        )
    }

    fn build(
        gateway: Arc<GatewayContext>,
        id: String,
        target: Option<SettingsTarget>,
        status: ExistenceStatus,
        values: Map<String, Value>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id,
            target,
            gateway,
            root: SettingsFolder::attached(this.clone(), String::new()),
            state: RwLock::new(SettingsState { status, values }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> Option<&SettingsTarget> {
        self.target.as_ref()
    }

    /// Name of the owning gateway
    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    pub fn existence_status(&self) -> ExistenceStatus {
        self.state.read().status
    }

    /// Schema of the owning gateway
    pub fn schema(&self) -> Arc<Schema> {
        self.gateway.schema()
    }

    pub(crate) fn values_snapshot(&self) -> Map<String, Value> {
        self.state.read().values.clone()
    }

    /// Plain nested snapshot of every value
    pub fn to_json(&self) -> Value {
        let schema = self.schema();
        let state = self.state.read();
        Value::Object(read_folder(&schema, &state.values))
    }

    /// Independent copy sharing id, target and gateway
    pub fn clone_settings(&self) -> Arc<Settings> {
        let (status, values) = {
            let state = self.state.read();
            (state.status, state.values.clone())
        };
        Self::build(
            self.gateway.clone(),
            self.id.clone(),
            self.target.clone(),
            status,
            values,
        )
    }

    /// Pull the stored row
    ///
    /// Without `force`, an instance that was already synchronized is left
    /// untouched.
    pub async fn sync(&self, force: bool) -> GatewayResult<()> {
        if !force && self.existence_status() != ExistenceStatus::Unsynchronized {
            return Ok(());
        }

        let provider = self.provider()?;
        let row = provider
            .get(self.gateway.name(), &self.id)
            .await
            .map_err(GatewayError::Provider)?;
        self.load(row).await;
        Ok(())
    }

    /// Apply a fetched row, `None` meaning no row is stored
    pub(crate) async fn load(&self, row: Option<Row>) {
        let Some(row) = row else {
            self.state.write().status = ExistenceStatus::NotExists;
            debug!(gateway = %self.gateway.name(), id = %self.id, "Settings row not found");
            return;
        };

        let schema = self.schema();
        let mut values = schema.default_values();
        for entry in schema.values_deep() {
            if let Some(value) = get_nested(&row, entry.path()) {
                set_nested(&mut values, entry.path(), value.clone());
            }
        }
        {
            let mut state = self.state.write();
            state.values = values;
            state.status = ExistenceStatus::Exists;
        }
        debug!(gateway = %self.gateway.name(), id = %self.id, "Settings synchronized");

        let event = SettingsEvent::synced(self.gateway.name(), &self.id, self.to_json());
        emit(self.gateway.publisher(), event).await;
    }

    /// Delete the stored row and go back to defaults
    ///
    /// An unsynchronized instance is synchronized first; an instance without
    /// a stored row is left untouched.
    pub async fn destroy(&self) -> GatewayResult<()> {
        if self.existence_status() == ExistenceStatus::Unsynchronized {
            self.sync(false).await?;
        }
        if self.existence_status() != ExistenceStatus::Exists {
            return Ok(());
        }

        let provider = self.provider()?;
        provider
            .delete(self.gateway.name(), &self.id)
            .await
            .map_err(GatewayError::Provider)?;

        let snapshot = self.to_json();
        let defaults = self.schema().default_values();
        {
            let mut state = self.state.write();
            state.values = defaults;
            state.status = ExistenceStatus::NotExists;
        }
        debug!(gateway = %self.gateway.name(), id = %self.id, "Settings destroyed");

        let event = SettingsEvent::deleted(self.gateway.name(), &self.id, snapshot);
        emit(self.gateway.publisher(), event).await;
        Ok(())
    }

    fn provider(&self) -> GatewayResult<Arc<dyn Provider>> {
        self.gateway.provider().ok_or(GatewayError::ProviderMissing)
    }

    fn ensure_synchronized(&self, operation: &str) -> GatewayResult<()> {
        if self.existence_status() == ExistenceStatus::Unsynchronized {
            Err(GatewayError::pending_sync(operation))
        } else {
            Ok(())
        }
    }

    pub(crate) async fn update_at(
        &self,
        prefix: &str,
        pairs: Vec<(String, Value)>,
        options: &UpdateOptions,
    ) -> GatewayResult<Vec<Change>> {
        self.ensure_synchronized("update")?;

        let schema = self.schema();
        let folder = folder_at(&schema, prefix)?;
        let mut targets = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            expand_update(folder, &key, value, &mut targets)?;
        }
        if options.only_configurable {
            check_configurable(targets.iter().map(|(entry, _)| *entry))?;
        }

        let mut working = self.values_snapshot();
        let mut changes: IndexMap<String, Change> = IndexMap::new();
        for (entry, value) in targets {
            let previous = read_entry(entry, &working);
            let next = self.next_value(entry, value, &previous, options).await?;
            set_nested(&mut working, entry.path(), next.clone());
            changes
                .entry(entry.path().to_string())
                .and_modify(|change| change.next = next.clone())
                .or_insert_with(|| Change {
                    entry: entry.clone(),
                    previous,
                    next,
                });
        }

        let changes = changes
            .into_values()
            .filter(|change| change.previous != change.next)
            .collect();
        self.write(changes, options.extra_context.clone(), WriteMode::Update)
            .await
    }

    pub(crate) async fn reset_at(
        &self,
        prefix: &str,
        keys: Vec<String>,
        options: &ResetOptions,
    ) -> GatewayResult<Vec<Change>> {
        self.ensure_synchronized("reset")?;

        let schema = self.schema();
        let folder = folder_at(&schema, prefix)?;
        let mut targets: Vec<&SchemaEntry> = Vec::new();
        for key in &keys {
            match folder.get(key) {
                Some(SchemaNode::Entry(entry)) => targets.push(entry),
                Some(SchemaNode::Folder(child)) => targets.extend(child.values_deep()),
                None => {
                    return Err(GatewayError::KeyNotFound {
                        path: join_path(prefix, key),
                    })
                }
            }
        }
        if options.only_configurable {
            check_configurable(targets.iter().copied())?;
        }

        let values = self.values_snapshot();
        let mut changes: IndexMap<String, Change> = IndexMap::new();
        for entry in targets {
            if changes.contains_key(entry.path()) {
                continue;
            }
            let previous = read_entry(entry, &values);
            let next = entry.default_value();
            if previous != next {
                changes.insert(
                    entry.path().to_string(),
                    Change {
                        entry: entry.clone(),
                        previous,
                        next,
                    },
                );
            }
        }

        self.write(
            changes.into_values().collect(),
            options.extra_context.clone(),
            WriteMode::Reset,
        )
        .await
    }

    pub(crate) async fn reset_object_at(
        &self,
        prefix: &str,
        object: &Map<String, Value>,
        options: &ResetOptions,
    ) -> GatewayResult<Vec<Change>> {
        let schema = self.schema();
        let folder = folder_at(&schema, prefix)?;
        let mut keys = Vec::new();
        object_keys(folder, "", object, &mut keys);
        self.reset_at(prefix, keys, options).await
    }

    pub(crate) async fn resolve_at(
        &self,
        prefix: &str,
        paths: &[&str],
    ) -> GatewayResult<Vec<Option<Value>>> {
        let schema = self.schema();
        let values = self.values_snapshot();
        let mut resolved = Vec::with_capacity(paths.len());

        for path in paths {
            let full = join_path(prefix, path);
            let value = match schema.get(&full) {
                None => None,
                Some(SchemaNode::Entry(entry)) => {
                    Some(self.resolve_entry(entry, read_entry(entry, &values)).await?)
                }
                Some(SchemaNode::Folder(folder)) => {
                    let mut object = read_folder(folder, &values);
                    for entry in folder.values_deep() {
                        let value = self.resolve_entry(entry, read_entry(entry, &values)).await?;
                        let relative = entry
                            .path()
                            .strip_prefix(folder.path())
                            .and_then(|rest| rest.strip_prefix('.'))
                            .unwrap_or(entry.path());
                        set_nested(&mut object, relative, value);
                    }
                    Some(Value::Object(object))
                }
            };
            resolved.push(value);
        }

        Ok(resolved)
    }

    async fn resolve_entry(&self, entry: &SchemaEntry, value: Value) -> GatewayResult<Value> {
        if !entry.should_resolve() || value.is_null() {
            return Ok(value);
        }

        let serializer = self.gateway.serializer(entry.type_name())?;
        let ctx = SerializerContext {
            entry,
            settings_id: Some(&self.id),
            extra_context: None,
        };
        match value {
            Value::Array(elements) if entry.is_array() => {
                let mut resolved = Vec::with_capacity(elements.len());
                for element in elements {
                    resolved.push(resolve_value(serializer.as_ref(), entry, element, &ctx).await?);
                }
                Ok(Value::Array(resolved))
            }
            value => resolve_value(serializer.as_ref(), entry, value, &ctx).await,
        }
    }

    async fn next_value(
        &self,
        entry: &SchemaEntry,
        value: Value,
        previous: &Value,
        options: &UpdateOptions,
    ) -> GatewayResult<Value> {
        if value.is_null() {
            return Ok(entry.default_value());
        }

        let serializer = self.gateway.serializer(entry.type_name())?;
        let ctx = SerializerContext {
            entry,
            settings_id: Some(&self.id),
            extra_context: options.extra_context.as_ref(),
        };

        if !entry.is_array() {
            return validate(serializer.as_ref(), entry, &value, &ctx).await;
        }

        let input = match value {
            Value::Array(elements) => elements,
            other => vec![other],
        };
        // Nulls only pad positions for an index-qualified remove
        let keep_nulls =
            options.array_action == ArrayAction::Remove && options.array_index.is_some();
        let mut validated = Vec::with_capacity(input.len());
        for element in input {
            if element.is_null() {
                if keep_nulls {
                    validated.push(element);
                }
            } else {
                validated.push(validate(serializer.as_ref(), entry, &element, &ctx).await?);
            }
        }

        let stored = previous.as_array().map(Vec::as_slice).unwrap_or_default();
        let next = array::apply(
            entry.path(),
            options.array_action,
            options.array_index,
            stored,
            validated,
        )?;
        Ok(Value::Array(next))
    }

    /// Persist a batch of changes, then apply it in memory and notify
    async fn write(
        &self,
        changes: Vec<Change>,
        extra_context: Option<Value>,
        mode: WriteMode,
    ) -> GatewayResult<Vec<Change>> {
        if changes.is_empty() {
            return Ok(changes);
        }

        let table = self.gateway.name();
        let persisted = match (self.existence_status(), mode) {
            (ExistenceStatus::Exists, _) => {
                // Leaf values replace whatever is stored under their path
                let provider = self.provider()?;
                let mut row = provider
                    .get(table, &self.id)
                    .await
                    .map_err(GatewayError::Provider)?
                    .unwrap_or_default();
                apply_changes(&mut row, &changes);
                provider
                    .replace(table, &self.id, &row)
                    .await
                    .map_err(GatewayError::Provider)?;
                Some(false)
            }
            (_, WriteMode::Update) => {
                let mut row = Row::new();
                apply_changes(&mut row, &changes);
                self.provider()?
                    .create(table, &self.id, &row)
                    .await
                    .map_err(GatewayError::Provider)?;
                Some(true)
            }
            (_, WriteMode::Reset) => None,
        };

        {
            let mut state = self.state.write();
            apply_changes(&mut state.values, &changes);
            if persisted == Some(true) {
                state.status = ExistenceStatus::Exists;
            }
        }
        debug!(
            gateway = %table,
            id = %self.id,
            changes = changes.len(),
            mode = ?mode,
            persisted = persisted.is_some(),
            "Settings changed"
        );

        if let Some(created) = persisted {
            let context = UpdateContext {
                changes: changes.iter().map(Change::record).collect(),
                extra_context,
                ambient_context: self.gateway.ambient_context().cloned(),
            };
            let event =
                SettingsEvent::changed(table, &self.id, self.to_json(), context, created);
            emit(self.gateway.publisher(), event).await;
        }

        Ok(changes)
    }
}

impl Deref for Settings {
    type Target = SettingsFolder;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("gateway", &self.gateway.name())
            .field("id", &self.id)
            .field("status", &self.existence_status())
            .field("values", &self.to_json())
            .finish()
    }
}

fn apply_changes(target: &mut Map<String, Value>, changes: &[Change]) {
    for change in changes {
        set_nested(target, change.path(), change.next.clone());
    }
}

fn folder_at<'a>(schema: &'a Schema, prefix: &str) -> GatewayResult<&'a SchemaFolder> {
    schema
        .folder_at(prefix)
        .ok_or_else(|| GatewayError::KeyNotFound {
            path: prefix.to_string(),
        })
}

/// Resolve an update key to its leaf targets
///
/// A folder key is accepted only with an object value naming its leaves.
fn expand_update<'a>(
    folder: &'a SchemaFolder,
    key: &str,
    value: Value,
    targets: &mut Vec<(&'a SchemaEntry, Value)>,
) -> GatewayResult<()> {
    match folder.get(key) {
        Some(SchemaNode::Entry(entry)) => {
            targets.push((entry, value));
            Ok(())
        }
        Some(SchemaNode::Folder(child)) => match value {
            Value::Object(object) => {
                for (child_key, child_value) in object {
                    expand_update(child, &child_key, child_value, targets)?;
                }
                Ok(())
            }
            _ => Err(GatewayError::AmbiguousFolderTarget {
                path: child.path().to_string(),
                keys: child
                    .values_deep()
                    .into_iter()
                    .map(|entry| entry.path().to_string())
                    .collect(),
            }),
        },
        None => Err(GatewayError::KeyNotFound {
            path: join_path(folder.path(), key),
        }),
    }
}

/// Relative leaf keys named by a nested object
fn object_keys(folder: &SchemaFolder, base: &str, object: &Map<String, Value>, keys: &mut Vec<String>) {
    for (key, value) in object {
        let path = join_path(base, key);
        match (folder.get(key), value) {
            (Some(SchemaNode::Folder(child)), Value::Object(inner)) => {
                object_keys(child, &path, inner, keys);
            }
            _ => keys.push(path),
        }
    }
}

fn check_configurable<'a>(entries: impl Iterator<Item = &'a SchemaEntry>) -> GatewayResult<()> {
    for entry in entries {
        if !entry.configurable() {
            return Err(GatewayError::Unconfigurable {
                path: entry.path().to_string(),
            });
        }
    }
    Ok(())
}

/// Validate, filter and serialize one value
async fn validate(
    serializer: &dyn Serializer,
    entry: &SchemaEntry,
    value: &Value,
    ctx: &SerializerContext<'_>,
) -> GatewayResult<Value> {
    let validated = serializer
        .validate(value, ctx)
        .await
        .map_err(|e| GatewayError::InvalidValue {
            path: entry.path().to_string(),
            message: format!("{e:#}"),
        })?;

    if let Some(filter) = entry.filter() {
        if filter(&validated) {
            return Err(GatewayError::FilteredValue {
                path: entry.path().to_string(),
            });
        }
    }

    Ok(serializer.serialize(&validated))
}

async fn resolve_value(
    serializer: &dyn Serializer,
    entry: &SchemaEntry,
    value: Value,
    ctx: &SerializerContext<'_>,
) -> GatewayResult<Value> {
    if value.is_null() {
        return Ok(value);
    }
    serializer
        .resolve(&value, ctx)
        .await
        .map_err(|error| GatewayError::Serializer {
            path: entry.path().to_string(),
            error,
        })
}
