//! Node map generation over expanded JSON-LD.
//!
//! ```ignore
//! use ld_flatten::{generate_node_map, generate_merged_node_map, DEFAULT_GRAPH};
//! use serde_json::json;
//!
//! let expanded = json!([{
//!     "@id": "http://example.com/ann",
//!     "http://schema.org/knows": [{"@id": "_:bob", "http://schema.org/name": [{"@value": "Bob"}]}]
//! }]);
//! let (node_map, blank_nodes) = generate_node_map(&expanded)?;
//!
//! // {"@default": {"_:b0": {...}, "http://example.com/ann": {...}}}
//! let json = serde_json::to_value(&node_map)?;
//! assert_eq!(blank_nodes.get("_:bob"), Some("_:b0"));
//!
//! // Every graph folded into one subject set.
//! let merged = generate_merged_node_map(&node_map);
//! ```
//!
//! Input must already be expanded; compact documents are not interpreted
//! against any context. Errors use [`ld_context::JsonLdError`].

mod blank_node;
mod node_map;
mod shape;

pub use blank_node::BlankNodeGenerator;
pub use node_map::{
    DEFAULT_GRAPH, Graph, Node, NodeMap, NodeMapGenerator, generate_merged_node_map,
    generate_node_map,
};
pub use shape::{Shape, classify, is_list_object, is_value_object};

pub use ld_context::{ErrorCode, JsonLdError};
pub use serde_json;
