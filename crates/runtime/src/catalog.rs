//! Snapshot of the capabilities a server offers.
//!
//! The catalog is loaded once when the conversation starts and never changes
//! afterwards. Tools and resources share one namespace: dispatch resolves by
//! name alone, so names are unique across both kinds.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::model::InputSchema;
use crate::tools::CapabilityHost;

/// What kind of capability an entry is, with the data needed to invoke it.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityKind {
    /// Invoked with arguments matching `schema`.
    Tool { schema: InputSchema },
    /// Read by URI, takes no arguments.
    Resource { uri: String },
}

/// A named capability discovered from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityEntry {
    pub name: String,
    pub description: String,
    pub kind: CapabilityKind,
}

impl CapabilityEntry {
    pub fn tool(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: InputSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: CapabilityKind::Tool { schema },
        }
    }

    pub fn resource(
        name: impl Into<String>,
        description: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: CapabilityKind::Resource { uri: uri.into() },
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self.kind, CapabilityKind::Tool { .. })
    }

    pub fn is_resource(&self) -> bool {
        matches!(self.kind, CapabilityKind::Resource { .. })
    }
}

/// Immutable list of tools and resources.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CapabilityEntry>,
}

impl Catalog {
    /// Query the host for the kinds it advertised.
    ///
    /// A failed listing is logged and leaves that kind empty; it never fails
    /// the load.
    pub async fn load<H: CapabilityHost>(
        host: &H,
        tools_available: bool,
        resources_available: bool,
    ) -> Self {
        let mut entries = Vec::new();

        if tools_available {
            match host.list_tools().await {
                Ok(tools) => entries.extend(tools),
                Err(e) => warn!("failed to list tools: {e}"),
            }
        }

        if resources_available {
            match host.list_resources().await {
                Ok(resources) => entries.extend(resources),
                Err(e) => warn!("failed to list resources: {e}"),
            }
        }

        let catalog = Self::from_entries(entries);
        info!(
            tools = catalog.tools().count(),
            resources = catalog.resources().count(),
            "capability catalog loaded"
        );
        catalog
    }

    /// Build a catalog, keeping tools ahead of resources.
    ///
    /// An entry whose name is already taken is dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = CapabilityEntry>) -> Self {
        let (tools, resources): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(CapabilityEntry::is_tool);

        let mut seen = HashSet::new();
        let entries = tools
            .into_iter()
            .chain(resources)
            .filter(|entry| {
                let fresh = seen.insert(entry.name.clone());
                if !fresh {
                    warn!(name = %entry.name, "dropping duplicate capability");
                }
                fresh
            })
            .collect();

        Self { entries }
    }

    /// All entries, tools first.
    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    pub fn tools(&self) -> impl Iterator<Item = &CapabilityEntry> {
        self.entries.iter().filter(|e| e.is_tool())
    }

    pub fn resources(&self) -> impl Iterator<Item = &CapabilityEntry> {
        self.entries.iter().filter(|e| e.is_resource())
    }

    pub fn find_tool(&self, name: &str) -> Option<&CapabilityEntry> {
        self.tools().find(|e| e.name == name)
    }

    pub fn find_resource(&self, name: &str) -> Option<&CapabilityEntry> {
        self.resources().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[test]
    fn tools_come_before_resources() {
        let catalog = Catalog::from_entries([
            CapabilityEntry::resource("customer_list", "", "customers://all"),
            CapabilityEntry::tool("register_customer", "", InputSchema::default()),
            CapabilityEntry::tool("update_customer", "", InputSchema::default()),
        ]);
        let names: Vec<_> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["register_customer", "update_customer", "customer_list"]
        );
    }

    #[test]
    fn duplicate_names_keep_the_first() {
        let catalog = Catalog::from_entries([
            CapabilityEntry::resource("customers", "resource", "customers://all"),
            CapabilityEntry::tool("customers", "tool", InputSchema::default()),
            CapabilityEntry::tool("customers", "again", InputSchema::default()),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].description, "tool");
        assert!(catalog.find_resource("customers").is_none());
    }

    #[tokio::test]
    async fn load_skips_unadvertised_kinds() {
        let host = FakeHost::new()
            .with_tool(CapabilityEntry::tool("register_customer", "", InputSchema::default()))
            .with_resource(CapabilityEntry::resource("customer_list", "", "customers://all"));

        let catalog = Catalog::load(&host, true, false).await;
        assert_eq!(catalog.len(), 1);
        assert!(catalog.find_tool("register_customer").is_some());
        assert_eq!(host.list_calls(), (1, 0));
    }

    #[tokio::test]
    async fn failed_listing_degrades_to_empty() {
        let host = FakeHost::new()
            .with_resource(CapabilityEntry::resource("customer_list", "", "customers://all"))
            .failing_tool_listing();

        let catalog = Catalog::load(&host, true, true).await;
        assert_eq!(catalog.tools().count(), 0);
        assert!(catalog.find_resource("customer_list").is_some());
    }
}
