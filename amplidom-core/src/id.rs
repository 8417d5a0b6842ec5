//! Identifier codec for domain associations.
//!
//! A domain association is addressed by `(app_id, domain_name)`. Persisted
//! state keeps a single string, `enc(app_id)/enc(domain_name)`, where `enc`
//! percent-encodes every byte outside `[A-Za-z0-9-_.~]`. Plain ids such as
//! `d1abc/example.com` are already in canonical form, and an encoded
//! component can never contain the `/` separator. Decoding accepts only the
//! canonical form, so `format_id` and `parse_id` are inverses both ways.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Separator between the encoded components.
pub const SEPARATOR: char = '/';

/// Logical key of one domain association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    app_id: String,
    domain_name: String,
}

impl ResourceKey {
    pub fn new(app_id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            domain_name: domain_name.into(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.domain_name, self.app_id)
    }
}

/// The persisted identifier of a domain association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Wraps an identifier read back from persisted state. Nothing is
    /// validated until it is decoded.
    pub fn from_persisted(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes this identifier into its key.
    pub fn key(&self) -> Result<ResourceKey, DecodeError> {
        parse_id(&self.0)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&ResourceKey> for ExternalId {
    fn from(key: &ResourceKey) -> Self {
        format_id(key)
    }
}

/// Encodes a key into its persisted identifier.
pub fn format_id(key: &ResourceKey) -> ExternalId {
    ExternalId(format!(
        "{}{}{}",
        urlencoding::encode(&key.app_id),
        SEPARATOR,
        urlencoding::encode(&key.domain_name)
    ))
}

/// Decodes a persisted identifier back into its key.
pub fn parse_id(id: &str) -> Result<ResourceKey, DecodeError> {
    let parts: Vec<&str> = id.split(SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(DecodeError::Malformed {
            id: id.to_string(),
            reason: format!(
                "expected APP-ID{}DOMAIN-NAME, found {} component(s)",
                SEPARATOR,
                parts.len()
            ),
        });
    }

    let app_id = decode_component(id, parts[0], "app id")?;
    let domain_name = decode_component(id, parts[1], "domain name")?;

    Ok(ResourceKey {
        app_id,
        domain_name,
    })
}

fn decode_component(id: &str, raw: &str, component: &'static str) -> Result<String, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::EmptyComponent {
            id: id.to_string(),
            component,
        });
    }

    let decoded = urlencoding::decode(raw)
        .map_err(|e| DecodeError::Malformed {
            id: id.to_string(),
            reason: format!("{} is not valid UTF-8 once decoded: {}", component, e),
        })?
        .into_owned();

    // Only the form format_id produces is accepted, so each key has one id.
    if urlencoding::encode(&decoded) != raw {
        return Err(DecodeError::Malformed {
            id: id.to_string(),
            reason: format!("{} {:?} is not canonically escaped", component, raw),
        });
    }
    Ok(decoded)
}
