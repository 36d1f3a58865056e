pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod payload;
pub mod publisher;
pub mod runtime;
pub mod services;
pub mod stats;
pub mod store;
pub mod tracing_setup;

pub use bridge::{BridgeCommand, CommandDispatcher};
pub use config::CoreConfig;
pub use error::BridgeError;
pub use models::{Character, Notice, NoticeBehavior, NotificationModel, NotificationStyle};
pub use payload::CommandPayload;
pub use publisher::{Toast, ToastRouter, ToastSink, UpdatePublisher, UpdateSubscriber};
pub use runtime::{BridgeHandle, BridgeRuntime};
pub use services::BridgeServices;
pub use store::{ListKind, SharedInterestStore};
