use shared::domain::ClientId;
use tracing::warn;

pub const CLIENT_ID_ENV: &str = "SWIPE_CLIENT_ID";

/// Opaque lookup of the host's client identifier.
pub trait IdentityProvider: Send + Sync {
    fn lookup(&self) -> Option<String>;
}

pub struct EnvIdentity {
    var: String,
}

impl EnvIdentity {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvIdentity {
    fn default() -> Self {
        Self::new(CLIENT_ID_ENV)
    }
}

impl IdentityProvider for EnvIdentity {
    fn lookup(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

pub struct FixedIdentity(pub Option<String>);

impl IdentityProvider for FixedIdentity {
    fn lookup(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Blank or missing identifiers resolve to the shared fallback identity.
pub fn resolve_client_id(provider: &dyn IdentityProvider) -> ClientId {
    match provider.lookup().and_then(ClientId::parse) {
        Some(client_id) => client_id,
        None => {
            warn!("identity: no client id available; using fallback identity");
            ClientId::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_trimmed_identifier() {
        let id = resolve_client_id(&FixedIdentity(Some("  user-42 ".into())));
        assert_eq!(id.as_str(), "user-42");
    }

    #[test]
    fn blank_or_missing_falls_back() {
        assert!(resolve_client_id(&FixedIdentity(None)).is_fallback());
        assert!(resolve_client_id(&FixedIdentity(Some("   ".into()))).is_fallback());
    }

    #[test]
    fn env_identity_reads_named_variable() {
        std::env::set_var("SWIPE_TEST_IDENTITY_VAR", "from-env");
        let id = resolve_client_id(&EnvIdentity::new("SWIPE_TEST_IDENTITY_VAR"));
        assert_eq!(id.as_str(), "from-env");
        assert!(resolve_client_id(&EnvIdentity::new("SWIPE_TEST_IDENTITY_UNSET")).is_fallback());
    }
}
