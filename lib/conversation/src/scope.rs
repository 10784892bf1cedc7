//! Owner scoping for store access.

use crate::error::TurnError;
use healthfirst_core::OwnerId;

/// Whether operations may run without an owner identity.
///
/// Unscoped operations read and list every thread. Deployments that sit
/// behind authentication should turn this off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopePolicy {
    /// Allow operations with no owner identity.
    pub allow_unscoped: bool,
}

impl ScopePolicy {
    /// Applies the policy to the identity a caller arrived with.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::MissingIdentity`] when the owner is absent and
    /// unscoped access is disabled.
    pub fn resolve<'a>(&self, owner: Option<&'a OwnerId>) -> Result<Option<&'a OwnerId>, TurnError> {
        match owner {
            Some(owner) => Ok(Some(owner)),
            None if self.allow_unscoped => Ok(None),
            None => Err(TurnError::MissingIdentity),
        }
    }
}
