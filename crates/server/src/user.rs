//! The authenticated caller, attached to each request by the auth middleware.

use engine::Scope;

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub username: String,
}

impl CurrentUser {
    /// The caller's personal scope.
    pub fn scope(&self) -> Scope {
        Scope::User(self.username.clone())
    }
}
