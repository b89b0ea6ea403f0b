//! API-side authorization guard.
//!
//! Every directory operation goes through [`authorize`] before touching the
//! store, so the decision and its logging live in one place.

use orgdir_auth::{Caller, Decision, Operation, PolicyError, check};

/// Ask the policy whether `caller` may perform `op`, logging denials.
pub fn authorize(caller: &Caller, op: &Operation<'_>) -> Result<Decision, PolicyError> {
    let kind = op.kind();
    match check(caller, op) {
        Ok(decision) => {
            tracing::trace!(caller = %caller.id, role = %caller.role, operation = kind.as_str(), "allowed");
            Ok(decision)
        }
        Err(denial) => {
            tracing::debug!(
                caller = %caller.id,
                role = %caller.role,
                operation = kind.as_str(),
                reason = %denial,
                "denied"
            );
            Err(denial)
        }
    }
}
