use crate::blueprint::Blueprint;
use crate::placement::PlacementDecision;
use tracing::{debug, info};

pub const EVENT_ID_PREFIX: &str = "event_";
pub const FALLBACK_EVENT_ID: &str = "new_event";
const ID_SOURCE_CHARS: usize = 30;

/// Derives the node id for an event from its first 30 characters.
///
/// Alphanumerics, spaces and hyphens are kept, spaces and hyphens become
/// underscores and surrounding underscores are trimmed. Text with nothing
/// left maps to [`FALLBACK_EVENT_ID`]. The same text always yields the same id.
pub fn derive_event_id(event_text: &str) -> String {
    let slug: String = event_text
        .chars()
        .take(ID_SOURCE_CHARS)
        .filter(|ch| ch.is_alphanumeric() || *ch == ' ' || *ch == '-')
        .map(|ch| if ch == ' ' || ch == '-' { '_' } else { ch })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        FALLBACK_EVENT_ID.to_string()
    } else {
        format!("{EVENT_ID_PREFIX}{slug}")
    }
}

/// What happened when an event was added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInsertion {
    pub id: String,
    /// Connections that became edges, in decision order.
    pub linked: Vec<String>,
    /// Connections naming no node in the graph.
    pub ignored: Vec<String>,
}

/// Inserts the event node and its edges.
///
/// Re-adding the same event text targets the same id, so label and category
/// are overwritten rather than duplicated. Unknown connection ids are dropped.
pub fn add_event(
    blueprint: &mut Blueprint,
    event_text: &str,
    decision: &PlacementDecision,
) -> EventInsertion {
    let id = derive_event_id(event_text);
    blueprint.insert_node(&id, &decision.label, decision.category.clone());

    let mut linked: Vec<String> = Vec::new();
    let mut ignored: Vec<String> = Vec::new();
    for target in &decision.connections {
        if *target == id || !blueprint.graph.add_edge(&id, target) {
            debug!(event = %id, target = %target, "ignoring unresolvable connection");
            if !ignored.contains(target) {
                ignored.push(target.clone());
            }
            continue;
        }
        if !linked.contains(target) {
            linked.push(target.clone());
        }
    }

    info!(
        event = %id,
        category = %decision.category,
        linked = linked.len(),
        ignored = ignored.len(),
        "added event node"
    );

    EventInsertion {
        id,
        linked,
        ignored,
    }
}
