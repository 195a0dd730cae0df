use std::fmt;

use crate::core::error::{VaultError, VaultResult};

/// Environment variables holding the three GOG session cookies, paired with
/// the cookie name each one is sent as.
pub const SESSION_COOKIES: [(&str, &str); 3] = [
    ("AUTH_GOG_AL", "gog-al"),
    ("AUTH_GOG_LC", "gog_lc"),
    ("AUTH_GOG_US", "gog_us"),
];

/// Session secrets attached to every storefront request.
///
/// Built once at startup and never mutated afterwards. `Debug` redacts the
/// values so the struct can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    al: String,
    lc: String,
    us: String,
}

impl Credentials {
    pub fn new(al: impl Into<String>, lc: impl Into<String>, us: impl Into<String>) -> Self {
        Self {
            al: al.into(),
            lc: lc.into(),
            us: us.into(),
        }
    }

    /// Read the secrets from the process environment.
    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the secrets through an arbitrary lookup. Empty values count as missing.
    pub fn from_lookup<F>(mut lookup: F) -> VaultResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(SESSION_COOKIES.len());
        let mut missing = Vec::new();

        for (var, _) in SESSION_COOKIES {
            match lookup(var).map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => values.push(v),
                _ => missing.push(var),
            }
        }

        if !missing.is_empty() {
            return Err(VaultError::Auth(format!(
                "missing session secrets: {}",
                missing.join(", ")
            )));
        }

        let us = values.pop().unwrap_or_default();
        let lc = values.pop().unwrap_or_default();
        let al = values.pop().unwrap_or_default();
        Ok(Self { al, lc, us })
    }

    /// Render the `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        let values = [&self.al, &self.lc, &self.us];
        SESSION_COOKIES
            .iter()
            .zip(values)
            .map(|((_, cookie), value)| format!("{cookie}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("al", &"<redacted>")
            .field("lc", &"<redacted>")
            .field("us", &"<redacted>")
            .finish()
    }
}
