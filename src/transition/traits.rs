// Traits for the resources a transition drives

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::errors::TransitionError;
use super::types::ResourceStatus;

/// Curtain hiding resource swaps from view (a loading screen).
///
/// `show` fails with `InvalidStateTransition` when already shown and `hide`
/// when already hidden.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CurtainResource: Send + Sync {
    async fn show(&self) -> Result<(), TransitionError>;

    async fn hide(&self) -> Result<(), TransitionError>;

    fn is_shown(&self) -> bool;
}

/// Resource that is loaded, activated and unloaded asynchronously (a scene).
#[async_trait]
pub trait TransitionableResource: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> Result<(), TransitionError>;

    async fn activate(&self) -> Result<(), TransitionError>;

    async fn unload(&self) -> Result<(), TransitionError>;

    fn is_loaded(&self) -> bool;

    fn is_activated(&self) -> bool;

    fn status(&self) -> ResourceStatus {
        ResourceStatus {
            loaded: self.is_loaded(),
            activated: self.is_activated(),
        }
    }
}
