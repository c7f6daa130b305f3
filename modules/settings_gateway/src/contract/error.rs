//! Contract error types for the settings gateway
//!
//! Every failure raised by schema, settings, gateway and driver operations is
//! reported through [`GatewayError`]. Collaborator failures (providers,
//! serializers) are wrapped as-is and never retried.

/// Result alias used across the crate
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Settings gateway errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// One or more schema entries are invalid
    #[error("There is an error with your schema.\n{}", errors.join("\n"))]
    SchemaValidation {
        /// One line per offending key, `"<path> - <reason>"`
        errors: Vec<String>,
    },

    /// An Entry slot was edited as a Folder, or the other way round
    #[error("The type for \"{key}\" conflicts with the previous value, expected {expected}, got \"{got}\".")]
    TypeConflict {
        /// Key being edited
        key: String,
        /// Shape requested by the caller
        expected: String,
        /// Shape currently stored
        got: String,
    },

    /// The schema is frozen
    #[error("Cannot modify the schema after being initialized.")]
    AlreadyReady,

    /// A request needs a provider but none is bound
    #[error("Cannot run requests without a provider available.")]
    ProviderMissing,

    /// The provider configured for a gateway is not registered
    #[error("The gateway \"{gateway}\" could not find the provider \"{provider}\".")]
    ProviderNotFound {
        /// Gateway name
        gateway: String,
        /// Configured provider name
        provider: String,
    },

    /// `init` was called twice
    #[error("The gateway \"{gateway}\" has already been initialized.")]
    AlreadyInitialized {
        /// Gateway name
        gateway: String,
    },

    /// A path does not resolve to a schema node
    #[error("Key not found: {path}")]
    KeyNotFound {
        /// Offending path
        path: String,
    },

    /// A folder was targeted where leaf keys were required
    #[error("Cannot update the folder \"{path}\" directly, choose one of its keys: {}", keys.join(" "))]
    AmbiguousFolderTarget {
        /// Folder path
        path: String,
        /// Child keys of the folder
        keys: Vec<String>,
    },

    /// The key is not configurable and the configurable gate is enabled
    #[error("The key \"{path}\" is not configurable.")]
    Unconfigurable {
        /// Entry path
        path: String,
    },

    /// Array `add` of a value already stored
    #[error("The value {value} for the key \"{path}\" already exists.")]
    ArrayDuplicate {
        /// Entry path
        path: String,
        /// Duplicated value
        value: serde_json::Value,
    },

    /// Array `remove` of a value not stored
    #[error("The value {value} for the key \"{path}\" does not exist.")]
    ArrayMissing {
        /// Entry path
        path: String,
        /// Missing value
        value: serde_json::Value,
    },

    /// Operation on a settings folder that is not rooted in a settings instance
    #[error("Cannot {operation} from a non-ready settings instance.")]
    NotReady {
        /// Operation name
        operation: String,
    },

    /// Operation on a settings instance that was never synchronized
    #[error("Cannot {operation} from a pending to synchronize settings instance. Perhaps you want to call `sync()` first.")]
    PendingSync {
        /// Operation name
        operation: String,
    },

    /// The serializer rejected a value
    #[error("Invalid value for \"{path}\": {message}")]
    InvalidValue {
        /// Entry path
        path: String,
        /// Serializer message
        message: String,
    },

    /// The entry filter rejected a value
    #[error("The value for \"{path}\" was rejected by its filter.")]
    FilteredValue {
        /// Entry path
        path: String,
    },

    /// No serializer is registered for a type name
    #[error("No serializer registered for the type \"{type_name}\".")]
    UnknownSerializer {
        /// Entry type name
        type_name: String,
    },

    /// Serializer failed outside validation (resolve)
    #[error("Serializer failure for \"{path}\": {error:#}")]
    Serializer {
        /// Entry path
        path: String,
        /// Underlying error
        error: anyhow::Error,
    },

    /// Provider request failed
    #[error("Provider request failed: {0:#}")]
    Provider(anyhow::Error),
}

impl GatewayError {
    pub(crate) fn not_ready(operation: &str) -> Self {
        Self::NotReady {
            operation: operation.to_string(),
        }
    }

    pub(crate) fn pending_sync(operation: &str) -> Self {
        Self::PendingSync {
            operation: operation.to_string(),
        }
    }
}
