pub mod config;
pub mod confirmation;
pub mod lab_interface;
pub mod metrics;
pub mod payload;
pub mod sync;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, DatabaseConfig, SanitizedConfig, ServerConfig, SyncConfig, UpstreamConfig,
};
pub use confirmation::{
    ConfirmationFilter, ConfirmationRecord, ConfirmationStore, ConfirmationUpsert, LabOrder,
    Linkage, SqliteConfirmationStore, StoreError, SyncStatus,
};
pub use lab_interface::{HttpLabInterface, LabInterface, LabInterfaceError, PendingConfirmations};
pub use payload::{parse_confirmation, ParsedConfirmation, PayloadField};
pub use sync::{
    ConfirmationSync, ItemProcessor, ItemResult, ItemStatus, StopReason, SyncError, SyncReport,
    SyncSummary,
};
