use orgdir_auth::Caller;

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; immutable and present on every
/// protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: Caller,
}

impl CallerContext {
    pub fn new(caller: Caller) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }
}
