use std::collections::BTreeMap;

use ld_context::iri::is_blank_node_identifier;
use ld_context::{ErrorCode, JsonLdError};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::blank_node::BlankNodeGenerator;
use crate::shape::{Shape, classify, is_list_object, is_value_object};

pub const DEFAULT_GRAPH: &str = "@default";

// === Node ===

/// One subject of a node map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: String,
    pub types: Vec<String>,
    pub index: Option<String>,
    /// Property IRI to values. Values keep the order they were added in.
    pub properties: BTreeMap<String, Vec<Value>>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn property(&self, iri: &str) -> Option<&[Value]> {
        self.properties.get(iri).map(Vec::as_slice)
    }

    fn add_type(&mut self, type_iri: &str) {
        if !self.types.iter().any(|existing| existing == type_iri) {
            self.types.push(type_iri.to_string());
        }
    }

    /// Appends `value`; with `unique` an equal value already present wins.
    fn add_value(&mut self, property: &str, value: Value, unique: bool) {
        let values = self.properties.entry(property.to_string()).or_default();
        if unique && values.contains(&value) {
            return;
        }
        values.push(value);
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("@id", &self.id)?;
        if !self.types.is_empty() {
            map.serialize_entry("@type", &self.types)?;
        }
        if let Some(index) = &self.index {
            map.serialize_entry("@index", index)?;
        }
        for (property, values) in &self.properties {
            map.serialize_entry(property, values)?;
        }
        map.end()
    }
}

/// Subject id to node.
pub type Graph = BTreeMap<String, Node>;

// === NodeMap ===

/// Graph name to subjects. The default graph is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NodeMap {
    graphs: BTreeMap<String, Graph>,
}

impl Default for NodeMap {
    fn default() -> Self {
        NodeMap {
            graphs: BTreeMap::from([(DEFAULT_GRAPH.to_string(), Graph::new())]),
        }
    }
}

impl NodeMap {
    pub fn graph(&self, name: &str) -> Option<&Graph> {
        self.graphs.get(name)
    }

    pub fn default_graph(&self) -> &Graph {
        self.graphs.get(DEFAULT_GRAPH).unwrap_or(&EMPTY_GRAPH)
    }

    pub fn graph_names(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn graphs(&self) -> impl Iterator<Item = (&str, &Graph)> {
        self.graphs.iter().map(|(name, graph)| (name.as_str(), graph))
    }

    pub fn node(&self, graph: &str, id: &str) -> Option<&Node> {
        self.graphs.get(graph)?.get(id)
    }

    /// Total number of subjects across all graphs.
    pub fn node_count(&self) -> usize {
        self.graphs.values().map(BTreeMap::len).sum()
    }

    pub fn into_graphs(self) -> BTreeMap<String, Graph> {
        self.graphs
    }

    fn ensure_graph(&mut self, graph: &str) -> &mut Graph {
        self.graphs.entry(graph.to_string()).or_default()
    }

    fn node_mut(&mut self, graph: &str, id: &str) -> &mut Node {
        self.ensure_graph(graph)
            .entry(id.to_string())
            .or_insert_with(|| Node::new(id))
    }
}

static EMPTY_GRAPH: Graph = Graph::new();

// === Generation ===

/// Where values found during the walk are attached.
#[derive(Debug, Clone)]
enum Subject {
    None,
    Node(String),
    /// Inside `@reverse`: nodes found here point back at this id.
    Reverse(String),
}

/// Flattens expanded JSON-LD into a [`NodeMap`].
///
/// Blank node identifiers are relabelled through the borrowed
/// [`BlankNodeGenerator`]; reusing a generator across calls keeps labels
/// stable between them. A failed call leaves the generator as it was.
pub struct NodeMapGenerator<'g> {
    blank_nodes: &'g mut BlankNodeGenerator,
}

impl<'g> NodeMapGenerator<'g> {
    pub fn new(blank_nodes: &'g mut BlankNodeGenerator) -> Self {
        NodeMapGenerator { blank_nodes }
    }

    pub fn generate(&mut self, element: &Value) -> Result<NodeMap, JsonLdError> {
        let snapshot = self.blank_nodes.clone();
        let mut node_map = NodeMap::default();

        match self.visit(element, &mut node_map, DEFAULT_GRAPH, &Subject::None, None, None) {
            Ok(()) => {
                debug!(
                    graphs = node_map.graphs.len(),
                    nodes = node_map.node_count(),
                    "generated node map"
                );
                Ok(node_map)
            }
            Err(e) => {
                *self.blank_nodes = snapshot;
                debug!(error = %e, "node map generation failed");
                Err(e)
            }
        }
    }

    fn label(&mut self, id: &str) -> String {
        if is_blank_node_identifier(id) {
            self.blank_nodes.generate(Some(id))
        } else {
            id.to_string()
        }
    }

    fn visit(
        &mut self,
        element: &Value,
        node_map: &mut NodeMap,
        graph: &str,
        subject: &Subject,
        property: Option<&str>,
        mut list: Option<&mut Vec<Value>>,
    ) -> Result<(), JsonLdError> {
        match element {
            Value::Array(items) => {
                for item in items {
                    self.visit(item, node_map, graph, subject, property, list.as_deref_mut())?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
            Value::Object(object) => match classify(object)? {
                Shape::Value(value) => {
                    let value = self.relabel_value_type(value);
                    place(node_map, graph, subject, property, list, value, true)
                }
                Shape::List(items) => {
                    if list.is_some() {
                        return Err(JsonLdError::new(
                            ErrorCode::ListOfLists,
                            format!("list nested directly in a list under '{}'", property.unwrap_or("")),
                        ));
                    }
                    let mut collected = Vec::new();
                    self.visit(items, node_map, graph, subject, property, Some(&mut collected))?;
                    place(node_map, graph, subject, property, None, json!({"@list": collected}), false)
                }
                Shape::Set(items) => self.visit(items, node_map, graph, subject, property, list),
                Shape::Node(object) => {
                    self.visit_node(object, node_map, graph, subject, property, list)
                }
            },
            scalar => place(node_map, graph, subject, property, list, scalar.clone(), true),
        }
    }

    fn relabel_value_type(&mut self, value: &Map<String, Value>) -> Value {
        let mut value = value.clone();
        let blank_datatype = value
            .get("@type")
            .and_then(Value::as_str)
            .filter(|datatype| is_blank_node_identifier(datatype))
            .map(str::to_string);
        if let Some(datatype) = blank_datatype {
            let label = self.blank_nodes.generate(Some(&datatype));
            value.insert("@type".to_string(), Value::String(label));
        }
        Value::Object(value)
    }

    fn visit_node(
        &mut self,
        object: &Map<String, Value>,
        node_map: &mut NodeMap,
        graph: &str,
        subject: &Subject,
        property: Option<&str>,
        list: Option<&mut Vec<Value>>,
    ) -> Result<(), JsonLdError> {
        let id = match object.get("@id") {
            None => self.blank_nodes.generate(None),
            Some(Value::String(id)) => self.label(id),
            Some(other) => {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidIdValue,
                    format!("@id must be a string, found {}", other),
                ));
            }
        };
        node_map.node_mut(graph, &id);

        match subject {
            Subject::Reverse(referenced) => {
                if let Some(property) = property {
                    node_map
                        .node_mut(graph, &id)
                        .add_value(property, json!({"@id": referenced}), true);
                }
            }
            _ => place(node_map, graph, subject, property, list, json!({"@id": id}), true)?,
        }

        if let Some(types) = object.get("@type") {
            let types: Vec<&str> = match types {
                Value::String(single) => vec![single.as_str()],
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().ok_or_else(|| invalid_type(item)))
                    .collect::<Result<_, _>>()?,
                other => return Err(invalid_type(other)),
            };
            for type_iri in types {
                let type_iri = self.label(type_iri);
                node_map.node_mut(graph, &id).add_type(&type_iri);
            }
        }

        if let Some(index) = object.get("@index") {
            let Value::String(index) = index else {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidIndexValue,
                    format!("@index of '{}' must be a string, found {}", id, index),
                ));
            };
            let node = node_map.node_mut(graph, &id);
            match &node.index {
                Some(existing) if existing != index => {
                    return Err(JsonLdError::new(
                        ErrorCode::ConflictingIndexes,
                        format!("node '{}' has indexes '{}' and '{}'", id, existing, index),
                    ));
                }
                _ => node.index = Some(index.clone()),
            }
        }

        if let Some(reverse) = object.get("@reverse") {
            let Value::Object(reverse) = reverse else {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidReversePropertyMap,
                    format!("@reverse of '{}' must be a map, found {}", id, reverse),
                ));
            };
            let referenced = Subject::Reverse(id.clone());
            for (reverse_property, values) in sorted_entries(reverse) {
                self.visit(values, node_map, graph, &referenced, Some(reverse_property), None)?;
            }
        }

        if let Some(named) = object.get("@graph") {
            node_map.ensure_graph(&id);
            self.visit(named, node_map, &id, &Subject::None, None, None)?;
        }

        if let Some(included) = object.get("@included") {
            let items = match included {
                Value::Array(items) => items.as_slice(),
                other => std::slice::from_ref(other),
            };
            if let Some(invalid) = items
                .iter()
                .find(|item| !item.is_object() || is_value_object(item) || is_list_object(item))
            {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidIncludedValue,
                    format!("@included of '{}' must only hold node objects, found {}", id, invalid),
                ));
            }
            self.visit(included, node_map, graph, &Subject::None, None, None)?;
        }

        let current = Subject::Node(id.clone());
        for (property, values) in sorted_entries(object) {
            if property.starts_with('@') {
                continue;
            }
            let property = self.label(property);
            node_map
                .node_mut(graph, &id)
                .properties
                .entry(property.clone())
                .or_default();
            self.visit(values, node_map, graph, &current, Some(property.as_str()), None)?;
        }

        Ok(())
    }
}

fn invalid_type(value: &Value) -> JsonLdError {
    JsonLdError::new(
        ErrorCode::InvalidTypeValue,
        format!("@type must be a string or array of strings, found {}", value),
    )
}

fn sorted_entries(object: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = object.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Attaches `value` to the current list, or to the subject's property.
fn place(
    node_map: &mut NodeMap,
    graph: &str,
    subject: &Subject,
    property: Option<&str>,
    list: Option<&mut Vec<Value>>,
    value: Value,
    unique: bool,
) -> Result<(), JsonLdError> {
    if let Some(list) = list {
        list.push(value);
        return Ok(());
    }
    match (subject, property) {
        (Subject::Node(id), Some(property)) => {
            node_map.node_mut(graph, id).add_value(property, value, unique);
            Ok(())
        }
        (Subject::Reverse(id), Some(property)) => Err(JsonLdError::new(
            ErrorCode::InvalidReverseValue,
            format!("reverse property '{}' of '{}' must only hold node objects", property, id),
        )),
        _ => Ok(()),
    }
}

/// Flattens `element` with a generator scoped to this call.
pub fn generate_node_map(element: &Value) -> Result<(NodeMap, BlankNodeGenerator), JsonLdError> {
    let mut blank_nodes = BlankNodeGenerator::new();
    let node_map = NodeMapGenerator::new(&mut blank_nodes).generate(element)?;
    Ok((node_map, blank_nodes))
}

/// Folds every graph of `node_map` into one subject set. Types and property
/// values are unioned; a later `@index` overwrites an earlier one.
pub fn generate_merged_node_map(node_map: &NodeMap) -> Graph {
    let mut merged = Graph::new();
    for graph in node_map.graphs.values() {
        for (id, node) in graph {
            let target = merged.entry(id.clone()).or_insert_with(|| Node::new(id.as_str()));
            for type_iri in &node.types {
                target.add_type(type_iri);
            }
            if node.index.is_some() {
                target.index = node.index.clone();
            }
            for (property, values) in &node.properties {
                let merged_values = target.properties.entry(property.clone()).or_default();
                for value in values {
                    if !merged_values.contains(value) {
                        merged_values.push(value.clone());
                    }
                }
            }
        }
    }
    merged
}
