//! In-memory registry of discovered capabilities
//!
//! The registry is filled by [`RpcSession::discover_capabilities`] and is
//! read-only for everyone else. A fresh discovery replaces the previous
//! contents wholesale; entries are never merged.
//!
//! [`RpcSession::discover_capabilities`]: crate::mcp::session::RpcSession::discover_capabilities

use crate::mcp::types::Capability;

/// Ordered list of the capabilities advertised by the server.
///
/// Order is the order of the server's `tools/list` response.
///
/// # Examples
///
/// ```
/// use snowmcp::mcp::registry::CapabilityRegistry;
///
/// let registry = CapabilityRegistry::default();
/// assert!(registry.is_empty());
/// assert!(registry.get("search").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<Capability>,
}

impl CapabilityRegistry {
    /// Returns every capability in server order.
    pub fn list(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Looks up a capability by exact name.
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    /// Iterates over the capabilities in server order.
    pub fn iter(&self) -> std::slice::Iter<'_, Capability> {
        self.capabilities.iter()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Returns `true` when discovery has not run or found nothing.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Replaces the registry contents with a fresh discovery result.
    pub(crate) fn replace(&mut self, capabilities: Vec<Capability>) {
        self.capabilities = capabilities;
    }
}

impl<'a> IntoIterator for &'a CapabilityRegistry {
    type Item = &'a Capability;
    type IntoIter = std::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
