//! Layout records for nodes, patches and arrays.
//!
//! Layout fields are all optional: each node type fills only the fields its
//! file format carries.

use serde::Serialize;

/// Position and visual attributes of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_in_chars: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steady_on_click: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_pos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
}

impl NodeLayout {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

/// Window geometry of a patch and, for subpatches, how it shows in its parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchLayout {
    pub window_x: f64,
    pub window_y: f64,
    pub window_width: f64,
    pub window_height: f64,
    /// Subpatches only: open the window when the parent loads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_on_load: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_on_parent: Option<GraphOnParent>,
}

/// Viewport through which a parent shows the subpatch contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOnParent {
    pub hide_object_name_and_arguments: bool,
    pub viewport_x: f64,
    pub viewport_y: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayLayout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_as: Option<DrawAs>,
}

/// How an array is plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawAs {
    Points,
    Polygon,
    Bezier,
}

impl DrawAs {
    /// Decode the plot style bits of an array's flags field.
    pub fn from_flags(flags: u32) -> Self {
        match (flags >> 1) & 3 {
            0 => DrawAs::Points,
            2 => DrawAs::Bezier,
            _ => DrawAs::Polygon,
        }
    }
}
