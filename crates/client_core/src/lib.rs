pub mod composer;
pub mod controller;
pub mod error;
pub mod events;
pub mod gateway;
pub mod selection;
pub mod store;

pub use composer::NotificationComposer;
pub use controller::{DashboardController, DashboardSnapshot, OperationKey, OperationKind};
pub use error::{DashboardError, GatewayError};
pub use events::{Alert, AlertSeverity, DashboardEvent};
pub use gateway::{DispatchGateway, HttpDispatchGateway, DEFAULT_BASE_URL};
pub use selection::SelectionSet;
pub use store::SubscriptionStore;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
