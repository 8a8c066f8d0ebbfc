use std::fmt;

/// Webhook credentials for one chat channel. Immutable once handed to a client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub access_token: String,
    pub secret: Option<String>,
}

impl Credentials {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        secret: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
            secret,
        }
    }

    /// The signing secret, if one is configured and non-empty.
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

// Tokens and secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
