mod access;
mod callback;
mod registration;

pub use access::{AccessService, AlertQuery};
pub use callback::{CallbackOutcome, CallbackService};
pub use registration::{RegistrationRequest, RegistrationService};

/// Builds the URLs this service hands out to the index service and to users.
#[derive(Debug, Clone)]
pub struct Links {
    base_url: String,
}

impl Links {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}/api/callback", self.base_url)
    }

    /// Capability link granting access to every alert of `email`.
    pub fn manage_url(&self, email: &str, secret: &str) -> String {
        format!(
            "{}/manage?email={}&secret={}",
            self.base_url,
            urlencoding::encode(email),
            urlencoding::encode(secret)
        )
    }
}

/// Treats absent and blank parameters alike.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
