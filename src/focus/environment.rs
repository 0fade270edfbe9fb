//! Host capabilities a focus session consumes. Every call is best effort: the session keeps
//! running whatever these return.

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user hasn't decided yet.
    Default,
    Granted,
    Denied,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Environment: Send + Sync {
    /// Asks the host for an exclusive, distraction-free presentation. Resolves once the host has
    /// either granted or refused it.
    async fn request_distraction_free_mode(&self) -> Result<()>;

    /// Leaves the distraction-free presentation acquired by
    /// [request_distraction_free_mode](Environment::request_distraction_free_mode).
    async fn release_distraction_free_mode(&self) -> Result<()>;

    fn notification_permission(&self) -> Permission;

    async fn request_notification_permission(&self) -> Result<Permission>;

    fn notify(&self, title: &str, body: &str) -> Result<()>;
}
