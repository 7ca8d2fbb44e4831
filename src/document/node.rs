//! Node types — the elements placed inside a patch.

use serde::Serialize;

use super::layout::NodeLayout;
use super::{ArrayId, NodeId, PatchId};

/// A coerced argument: either a number or an unescaped string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Arg {
    Number(f64),
    Text(String),
}

impl Arg {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Arg::Number(n) => Some(*n),
            Arg::Text(_) => None,
        }
    }
}

impl From<f64> for Arg {
    fn from(n: f64) -> Self {
        Arg::Number(n)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

/// GUI widget types with a fixed argument schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Floatatom,
    Symbolatom,
    Listbox,
    Msg,
    Bng,
    Tgl,
    Nbx,
    Vsl,
    Hsl,
    Vradio,
    Hradio,
    Vu,
    Cnv,
}

impl ControlType {
    /// Canonical type name as written in patch files.
    pub fn name(self) -> &'static str {
        match self {
            ControlType::Floatatom => "floatatom",
            ControlType::Symbolatom => "symbolatom",
            ControlType::Listbox => "listbox",
            ControlType::Msg => "msg",
            ControlType::Bng => "bng",
            ControlType::Tgl => "tgl",
            ControlType::Nbx => "nbx",
            ControlType::Vsl => "vsl",
            ControlType::Hsl => "hsl",
            ControlType::Vradio => "vradio",
            ControlType::Hradio => "hradio",
            ControlType::Vu => "vu",
            ControlType::Cnv => "cnv",
        }
    }
}

/// Node class tag plus the class-specific reference, if any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "nodeClass", rename_all = "lowercase")]
pub enum NodeKind {
    Generic,
    Control {
        #[serde(skip)]
        control: ControlType,
    },
    Subpatch {
        #[serde(rename = "patchId")]
        patch_id: PatchId,
    },
    Array {
        #[serde(rename = "arrayId")]
        array_id: ArrayId,
    },
    Text,
}

/// One element placed inside a patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub args: Vec<Arg>,
    pub layout: NodeLayout,
}

impl Node {
    pub fn generic(id: NodeId, node_type: &str, args: Vec<Arg>, layout: NodeLayout) -> Self {
        Self {
            id,
            node_type: node_type.to_string(),
            kind: NodeKind::Generic,
            args,
            layout,
        }
    }

    pub fn control(id: NodeId, control: ControlType, args: Vec<Arg>, layout: NodeLayout) -> Self {
        Self {
            id,
            node_type: control.name().to_string(),
            kind: NodeKind::Control { control },
            args,
            layout,
        }
    }

    pub fn subpatch(
        id: NodeId,
        node_type: &str,
        patch_id: PatchId,
        args: Vec<Arg>,
        layout: NodeLayout,
    ) -> Self {
        Self {
            id,
            node_type: node_type.to_string(),
            kind: NodeKind::Subpatch { patch_id },
            args,
            layout,
        }
    }

    pub fn array(id: NodeId, array_id: ArrayId) -> Self {
        Self {
            id,
            node_type: "array".to_string(),
            kind: NodeKind::Array { array_id },
            args: Vec::new(),
            layout: NodeLayout::default(),
        }
    }

    pub fn text(id: NodeId, text: String, layout: NodeLayout) -> Self {
        Self {
            id,
            node_type: "text".to_string(),
            kind: NodeKind::Text,
            args: vec![Arg::Text(text)],
            layout,
        }
    }

    pub fn control_type(&self) -> Option<ControlType> {
        match self.kind {
            NodeKind::Control { control } => Some(control),
            _ => None,
        }
    }

    /// `[inlet]` or `[inlet~]`.
    pub fn is_inlet(&self) -> bool {
        self.kind == NodeKind::Generic && matches!(self.node_type.as_str(), "inlet" | "inlet~")
    }

    /// `[outlet]` or `[outlet~]`.
    pub fn is_outlet(&self) -> bool {
        self.kind == NodeKind::Generic && matches!(self.node_type.as_str(), "outlet" | "outlet~")
    }
}
