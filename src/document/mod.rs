//! Document model — the structured graph produced from a patch file.
//!
//! A [`Document`] holds every [`Patch`] (root and nested) and every
//! [`PdArray`] found in the source, keyed by ids allocated in file order.

pub mod layout;
pub mod node;

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

pub use layout::{ArrayLayout, DrawAs, GraphOnParent, NodeLayout, PatchLayout};
pub use node::{Arg, ControlType, Node, NodeKind};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        // Ids are exposed as decimal strings, also when used as map keys.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }
    };
}

numeric_id!(
    /// Globally unique patch id, allocated in pre-order over nesting.
    PatchId
);
numeric_id!(
    /// Globally unique array id, allocated in file-encounter order.
    ArrayId
);
numeric_id!(
    /// Node id, local to its patch.
    NodeId
);

/// The full parsed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub patches: BTreeMap<PatchId, Patch>,
    pub arrays: BTreeMap<ArrayId, PdArray>,
}

impl Document {
    /// The outermost patch, if any was parsed.
    pub fn root(&self) -> Option<&Patch> {
        self.patches.values().find(|p| p.is_root)
    }

    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(&id)
    }

    pub fn array(&self, id: ArrayId) -> Option<&PdArray> {
        self.arrays.get(&id)
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One canvas worth of nodes and connections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub id: PatchId,
    /// True only for the outermost patch.
    pub is_root: bool,
    /// Creation arguments, available to nodes as `$1`, `$2`, ...
    pub args: Vec<Arg>,
    pub nodes: BTreeMap<NodeId, Node>,
    pub connections: Vec<Connection>,
    /// Inlet node ids, ordered left to right.
    pub inlets: Vec<NodeId>,
    /// Outlet node ids, ordered left to right.
    pub outlets: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<PatchLayout>,
}

impl Patch {
    pub fn new(id: PatchId, is_root: bool) -> Self {
        Self {
            id,
            is_root,
            args: Vec::new(),
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            inlets: Vec::new(),
            outlets: Vec::new(),
            layout: None,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }
}

/// A point-to-point connection between two nodes of the same patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connection {
    pub source: Endpoint,
    pub sink: Endpoint,
}

impl Connection {
    pub fn new(source: (u32, u32), sink: (u32, u32)) -> Self {
        Self {
            source: Endpoint {
                node_id: NodeId(source.0),
                portlet_id: source.1,
            },
            sink: Endpoint {
                node_id: NodeId(sink.0),
                portlet_id: sink.1,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub node_id: NodeId,
    pub portlet_id: u32,
}

/// A named numeric buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdArray {
    pub id: ArrayId,
    pub args: ArrayArgs,
    pub layout: ArrayLayout,
    /// Embedded samples; `None` unless the array saves its contents.
    pub data: Option<Vec<f64>>,
}

/// Serialized as `[name, size, saveContents]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayArgs {
    pub name: String,
    /// Numeric size, or a `$n` reference to a patch argument.
    pub size: Arg,
    pub save_contents: bool,
}

impl Serialize for ArrayArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.size)?;
        tuple.serialize_element(&u8::from(self.save_contents))?;
        tuple.end()
    }
}
