use std::future::Future;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Dispatch failed: {0}")]
pub struct DispatchError(pub String);

impl From<String> for DispatchError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Grants customers access to licensed content, typically by adding them to a group in the identity provider.
///
/// Implementations must be idempotent: assigning a customer to a group they are already in is not an error.
pub trait EntitlementDispatcher: Send + Sync + 'static {
    fn assign_license_group(
        &self,
        customer: &str,
        license_group: &str,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Delivers messages to customers. Rendering and transport are the implementation's concern.
pub trait Notifier: Send + Sync + 'static {
    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}
