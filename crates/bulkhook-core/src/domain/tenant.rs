use serde::{Deserialize, Serialize};
use std::fmt;

/// A store (shop domain, e.g. `example.myshopify.com`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Matches a completion notification to the fetch waiting for it.
///
/// One key is one logical notification channel. Fetches for the same tenant
/// are serialized by the fetch gate, so a tenant-scoped key is enough.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    tenant: TenantId,
}

impl CorrelationKey {
    pub fn new(tenant: TenantId) -> Self {
        Self { tenant }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }
}

impl From<TenantId> for CorrelationKey {
    fn from(tenant: TenantId) -> Self {
        Self::new(tenant)
    }
}

impl From<&TenantId> for CorrelationKey {
    fn from(tenant: &TenantId) -> Self {
        Self::new(tenant.clone())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant:{}", self.tenant)
    }
}
