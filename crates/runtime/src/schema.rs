//! Catalog to model tool declarations.

use crate::catalog::{Catalog, CapabilityKind};
use crate::model::{InputSchema, ToolSpec};

/// Declare every catalog entry to the model.
///
/// Tools carry their schema verbatim. The model has no notion of resources,
/// so each resource is declared as a tool taking no arguments. Tools come
/// first, then resources, each in catalog order.
pub fn to_declarations(catalog: &Catalog) -> Vec<ToolSpec> {
    catalog
        .tools()
        .chain(catalog.resources())
        .map(|entry| ToolSpec {
            name: entry.name.clone(),
            description: entry.description.clone(),
            input_schema: match &entry.kind {
                CapabilityKind::Tool { schema } => schema.clone(),
                CapabilityKind::Resource { .. } => InputSchema::default(),
            },
        })
        .collect()
}
