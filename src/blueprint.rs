use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CATEGORY: &str = "concept";

#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("failed to read blueprint {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("blueprint is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("blueprint has an unreadable shape: {0}")]
    Shape(String),
}

impl BlueprintError {
    /// Syntax and shape failures are format errors; I/O failures are not.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Syntax(_) | Self::Shape(_))
    }
}

/// Node category. Unknown values are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Theme,
    #[default]
    Concept,
    Movement,
    Political,
    Digital,
    Other(String),
}

impl Category {
    pub fn parse(value: &str) -> Self {
        match value {
            "theme" => Self::Theme,
            "concept" => Self::Concept,
            "movement" => Self::Movement,
            "political" => Self::Political,
            "digital" => Self::Digital,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Theme => "theme",
            Self::Concept => "concept",
            Self::Movement => "movement",
            Self::Political => "political",
            Self::Digital => "digital",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub category: Category,
}

/// Undirected graph with insertion-ordered nodes. Edges are stored as
/// normalized id pairs so duplicates collapse.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    edges: BTreeSet<(String, String)>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, or overwrites label and category of an existing one
    /// while keeping its position in the node order.
    pub fn upsert_node(&mut self, id: &str, label: &str, category: Category) {
        let entry = self.nodes.entry(id.to_string()).or_insert_with(|| Node {
            id: id.to_string(),
            label: String::new(),
            category: Category::Concept,
        });
        entry.label = label.to_string();
        entry.category = category;
    }

    /// Adds an undirected edge. Returns false when either endpoint is unknown.
    pub fn add_edge(&mut self, a: &str, b: &str) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        self.edges.insert(edge_key(a, b));
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edges.contains(&edge_key(a, b))
    }

    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        self.edges()
            .filter_map(|(a, b)| {
                if a == id {
                    Some(b)
                } else if b == id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

fn edge_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Node id → label, in the order nodes first appeared.
pub type LabelIndex = IndexMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Blueprint {
    pub graph: Graph,
    pub labels: LabelIndex,
}

impl Blueprint {
    pub fn insert_node(&mut self, id: &str, label: &str, category: Category) {
        self.graph.upsert_node(id, label, category);
        self.labels.insert(id.to_string(), label.to_string());
    }
}

pub fn load_blueprint(path: &Path) -> Result<Blueprint, BlueprintError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BlueprintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let blueprint = parse_blueprint(&contents)?;
    info!(
        path = %path.display(),
        nodes = blueprint.graph.node_count(),
        edges = blueprint.graph.edge_count(),
        "loaded blueprint"
    );
    Ok(blueprint)
}

pub fn parse_blueprint(source: &str) -> Result<Blueprint, BlueprintError> {
    let document: Value = serde_json::from_str(source)?;
    let Value::Object(root) = document else {
        return Err(BlueprintError::Shape(
            "top level must be an object".to_string(),
        ));
    };

    let mut blueprint = Blueprint::default();

    for node in array_field(&root, "nodes")? {
        let Some(id) = node.get("id").and_then(Value::as_str) else {
            debug!(?node, "skipping node without a string id");
            continue;
        };
        let label = node.get("label").and_then(Value::as_str).unwrap_or(id);
        let category = node
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CATEGORY);
        blueprint.insert_node(id, label, Category::parse(category));
    }

    for edge in array_field(&root, "edges")? {
        let source = edge.get("source").and_then(Value::as_str).unwrap_or("");
        let target = edge.get("target").and_then(Value::as_str).unwrap_or("");
        if source.is_empty() || target.is_empty() || !blueprint.graph.add_edge(source, target) {
            debug!(source, target, "skipping unresolvable edge");
        }
    }

    Ok(blueprint)
}

fn array_field<'a>(root: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], BlueprintError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(BlueprintError::Shape(format!("`{key}` must be an array"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            {"id": "art", "label": "Art", "category": "theme"},
            {"id": "idleness"},
            {"id": "net", "label": "Net Art", "category": "network"},
            {"label": "no id"}
        ],
        "edges": [
            {"source": "art", "target": "idleness"},
            {"source": "idleness", "target": "art"},
            {"source": "art", "target": "ghost"},
            {"source": "net"},
            {"source": "", "target": "art"}
        ]
    }"#;

    #[test]
    fn loads_nodes_with_defaults() {
        let blueprint = parse_blueprint(SAMPLE).unwrap();
        let idle = blueprint.graph.node("idleness").unwrap();
        assert_eq!(idle.label, "idleness");
        assert_eq!(idle.category, Category::Concept);
        let net = blueprint.graph.node("net").unwrap();
        assert_eq!(net.category, Category::Other("network".to_string()));
        assert_eq!(net.category.as_str(), "network");
        assert_eq!(blueprint.graph.node_count(), 3);
    }

    #[test]
    fn skips_dangling_and_duplicate_edges() {
        let blueprint = parse_blueprint(SAMPLE).unwrap();
        assert_eq!(blueprint.graph.edge_count(), 1);
        assert!(blueprint.graph.has_edge("idleness", "art"));
        for (a, b) in blueprint.graph.edges() {
            assert!(blueprint.graph.contains(a));
            assert!(blueprint.graph.contains(b));
        }
    }

    #[test]
    fn label_index_keeps_source_order() {
        let blueprint = parse_blueprint(SAMPLE).unwrap();
        let ids: Vec<&str> = blueprint.labels.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["art", "idleness", "net"]);
        assert_eq!(blueprint.labels["net"], "Net Art");
    }

    #[test]
    fn missing_arrays_yield_empty_graph() {
        let blueprint = parse_blueprint("{}").unwrap();
        assert_eq!(blueprint.graph.node_count(), 0);
        assert!(blueprint.labels.is_empty());
    }

    #[test]
    fn rejects_invalid_syntax_and_shape() {
        let err = parse_blueprint("{ nodes: ").unwrap_err();
        assert!(matches!(err, BlueprintError::Syntax(_)));
        assert!(err.is_format_error());

        let err = parse_blueprint("[1, 2]").unwrap_err();
        assert!(matches!(err, BlueprintError::Shape(_)));

        let err = parse_blueprint(r#"{"nodes": {"id": "a"}}"#).unwrap_err();
        assert!(matches!(err, BlueprintError::Shape(_)));
    }

    #[test]
    fn upsert_keeps_position_and_overwrites_fields() {
        let mut blueprint = parse_blueprint(SAMPLE).unwrap();
        blueprint.insert_node("art", "Fine Art", Category::Movement);
        let first = blueprint.graph.nodes().next().unwrap();
        assert_eq!(first.id, "art");
        assert_eq!(first.label, "Fine Art");
        assert_eq!(first.category, Category::Movement);
        assert_eq!(blueprint.labels.get_index(0).unwrap().1, "Fine Art");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_blueprint(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, BlueprintError::Io { .. }));
        assert!(!err.is_format_error());
    }

    #[test]
    fn category_serializes_as_plain_string() {
        let json = serde_json::to_string(&Category::Political).unwrap();
        assert_eq!(json, "\"political\"");
        let back: Category = serde_json::from_str("\"biotech\"").unwrap();
        assert_eq!(back, Category::Other("biotech".to_string()));
    }
}
