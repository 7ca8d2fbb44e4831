//! Patch extractor — recovers the canvas nesting tree from the flat
//! statement stream.
//!
//! Open canvases are kept on an explicit stack of [`Frame`]s. A patch id is
//! allocated when its canvas opens, so ids follow pre-order: a parent always
//! has a lower id than its descendants. When a canvas closes, its statement
//! group is registered on the build context and a [`SubpatchEntry`] is left
//! in the parent's group.

use tracing::debug;

use super::args::{parse_arg, parse_bool, parse_number};
use super::compile::Compilation;
use super::error::StatementError;
use super::token::{Chunk, Statement};
use crate::document::{Arg, ArrayId, GraphOnParent, Patch, PatchId, PatchLayout};

/// One item of a patch's statement group.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A statement hydrated as-is (object, control, comment, connection).
    Line(Statement),
    /// Placeholder for a nested patch.
    Subpatch(SubpatchEntry),
    /// Placeholder for an array, with its data statements.
    Array(ArrayEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubpatchEntry {
    pub line_index: usize,
    pub patch_id: PatchId,
    /// `pd`, `graph` or `table`.
    pub node_type: String,
    pub x: String,
    pub y: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayEntry {
    pub line_index: usize,
    pub array_id: ArrayId,
    pub source: ArraySource,
    /// `#A` statements that followed the declaration.
    pub data: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArraySource {
    /// `#X array <name> <size> float <flags>`
    Declared(Statement),
    /// `#X obj x y table <name> [size]`
    Table { name: String, size: Option<String> },
}

/// An open canvas.
struct Frame {
    /// Index of the `#N canvas` statement.
    canvas: usize,
    line_index: usize,
    patch_id: PatchId,
    entries: Vec<Entry>,
}

/// Partition `statements` into per-patch groups on the build context.
pub fn extract_patches(c: &mut Compilation, statements: Vec<Statement>) {
    let mut stack: Vec<Frame> = Vec::new();
    let mut root_seen = false;
    let mut aborted = false;

    for (index, statement) in statements.into_iter().enumerate() {
        let line = statement.line_index;
        match statement.chunk {
            Chunk::Declaration => match statement.keyword() {
                Some("canvas") => {
                    if stack.is_empty() && root_seen {
                        c.error(line, StatementError::OutsideCanvas);
                        continue;
                    }
                    if stack.len() >= c.config.max_depth {
                        c.error(line, StatementError::TooDeep(c.config.max_depth));
                        aborted = true;
                        break;
                    }
                    root_seen = true;
                    let patch_id = open_canvas(c, &statement, stack.is_empty());
                    debug!(patch = %patch_id, depth = stack.len(), line, "canvas opened");
                    stack.push(Frame {
                        canvas: index,
                        line_index: line,
                        patch_id,
                        entries: Vec::new(),
                    });
                }
                Some("struct") => c.warn(line, "unsupported element `#N struct`, skipping"),
                other => c.error(
                    line,
                    StatementError::UnknownElement(format!("#N {}", other.unwrap_or_default())),
                ),
            },

            Chunk::Placement { canvas } => {
                if stack.last().map(|f| f.canvas) != Some(canvas) {
                    c.error(line, StatementError::UnmatchedRestore);
                    continue;
                }
                let Some(frame) = stack.pop() else {
                    continue;
                };
                c.groups.insert(frame.patch_id, frame.entries);
                match stack.last_mut() {
                    Some(parent) => parent.entries.push(Entry::Subpatch(SubpatchEntry {
                        line_index: line,
                        patch_id: frame.patch_id,
                        node_type: statement.token(4).unwrap_or("pd").to_string(),
                        x: statement.token(2).unwrap_or("0").to_string(),
                        y: statement.token(3).unwrap_or("0").to_string(),
                        name: statement.token(5).map(String::from),
                    })),
                    None => c.error(line, StatementError::RootRestore),
                }
            }

            Chunk::Element => match statement.keyword() {
                Some("declare") => c.warn(line, "unsupported element `#X declare`, skipping"),
                Some("scalar") => c.warn(line, "unsupported element `#X scalar`, skipping"),
                Some("restore") => c.error(line, StatementError::UnmatchedRestore),
                Some(keyword @ ("coords" | "array" | "obj" | "msg" | "floatatom"
                | "symbolatom" | "listbox" | "text" | "connect")) => {
                    let keyword = keyword.to_string();
                    let depth = stack.len();
                    let Some(frame) = stack.last_mut() else {
                        c.error(line, StatementError::OutsideCanvas);
                        continue;
                    };
                    match keyword.as_str() {
                        "coords" => apply_coords(c, frame.patch_id, &statement),
                        "array" => {
                            let array_id = c.next_array_id();
                            debug!(array = %array_id, line, "array declared");
                            frame.entries.push(Entry::Array(ArrayEntry {
                                line_index: line,
                                array_id,
                                source: ArraySource::Declared(statement),
                                data: Vec::new(),
                            }));
                        }
                        "obj" if statement.token(4) == Some("table") => {
                            expand_table(c, &mut frame.entries, statement, depth)
                        }
                        _ => frame.entries.push(Entry::Line(statement)),
                    }
                }
                other => c.error(
                    line,
                    StatementError::UnknownElement(format!("#X {}", other.unwrap_or_default())),
                ),
            },

            Chunk::ArrayData => {
                let target = stack.last_mut().and_then(|f| match f.entries.last_mut() {
                    Some(Entry::Array(array)) => Some(array),
                    _ => None,
                });
                match target {
                    Some(array) => array.data.push(statement),
                    None => c.error(line, StatementError::DanglingArrayData),
                }
            }

            Chunk::Unknown(keyword) => c.error(line, StatementError::UnknownChunk(keyword)),
        }
    }

    if !root_seen && !aborted {
        c.error(0, StatementError::NoCanvas);
    }

    while let Some(frame) = stack.pop() {
        if !stack.is_empty() && !aborted {
            c.error(frame.line_index, StatementError::UnclosedCanvas);
        }
        c.groups.insert(frame.patch_id, frame.entries);
    }
}

/// Register the patch opened by a `#N canvas` statement.
fn open_canvas(c: &mut Compilation, statement: &Statement, is_root: bool) -> PatchId {
    let patch_id = c.next_patch_id();
    let mut patch = Patch::new(patch_id, is_root);
    match canvas_layout(statement, is_root) {
        Ok((layout, args)) => {
            patch.layout = Some(layout);
            patch.args = args;
        }
        Err(e) => c.error(statement.line_index, e),
    }
    c.document.patches.insert(patch_id, patch);
    patch_id
}

/// `#N canvas x y width height <font|name> [openOnLoad] [args...]`
fn canvas_layout(
    statement: &Statement,
    is_root: bool,
) -> Result<(PatchLayout, Vec<Arg>), StatementError> {
    let field = |index, name| {
        statement.token(index).ok_or(StatementError::MissingField {
            element: "canvas",
            field: name,
        })
    };

    let mut layout = PatchLayout {
        window_x: parse_number(field(2, "window x")?)?,
        window_y: parse_number(field(3, "window y")?)?,
        window_width: parse_number(field(4, "window width")?)?,
        window_height: parse_number(field(5, "window height")?)?,
        ..PatchLayout::default()
    };

    let args_from = if is_root {
        7
    } else {
        layout.open_on_load = Some(match statement.token(7) {
            Some(flag) => parse_bool(flag)?,
            None => false,
        });
        8
    };

    let args = statement
        .tokens
        .iter()
        .skip(args_from)
        .map(parse_arg)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((layout, args))
}

/// `#X coords x1 y1 x2 y2 width height gop [marginX marginY]`. Only
/// subpatches show a viewport in their parent.
fn apply_coords(c: &mut Compilation, patch_id: PatchId, statement: &Statement) {
    let is_root = c
        .document
        .patches
        .get(&patch_id)
        .map_or(true, |p| p.is_root);
    if is_root {
        return;
    }

    match graph_on_parent(statement) {
        Ok(gop) => {
            if let Some(layout) = c
                .document
                .patches
                .get_mut(&patch_id)
                .and_then(|p| p.layout.as_mut())
            {
                layout.graph_on_parent = gop;
            }
        }
        Err(e) => c.error(statement.line_index, e),
    }
}

fn graph_on_parent(statement: &Statement) -> Result<Option<GraphOnParent>, StatementError> {
    let flag = match statement.token(8) {
        Some(flag) => parse_number(flag)? as i64,
        None => 0,
    };
    if flag == 0 {
        return Ok(None);
    }

    let required = |index, name| -> Result<f64, StatementError> {
        let token = statement.token(index).ok_or(StatementError::MissingField {
            element: "coords",
            field: name,
        })?;
        Ok(parse_number(token)?)
    };
    let optional = |index| -> Result<f64, StatementError> {
        Ok(statement.token(index).map(parse_number).transpose()?.unwrap_or(0.0))
    };

    Ok(Some(GraphOnParent {
        hide_object_name_and_arguments: flag & 2 != 0,
        viewport_x: optional(9)?,
        viewport_y: optional(10)?,
        viewport_width: required(6, "viewport width")?,
        viewport_height: required(7, "viewport height")?,
    }))
}

/// Expand `#X obj x y table <name> [size]` into a canvas holding a graph
/// holding one array. `depth` is the nesting depth of the canvas it sits in.
fn expand_table(
    c: &mut Compilation,
    entries: &mut Vec<Entry>,
    statement: Statement,
    depth: usize,
) {
    let line = statement.line_index;
    let Some(name) = statement.token(5).map(String::from) else {
        c.error(
            line,
            StatementError::MissingField {
                element: "table",
                field: "name",
            },
        );
        return;
    };
    if depth + 2 > c.config.max_depth {
        c.error(line, StatementError::TooDeep(c.config.max_depth));
        return;
    }

    let outer = c.next_patch_id();
    let inner = c.next_patch_id();
    let array_id = c.next_array_id();
    debug!(patch = %outer, array = %array_id, line, "table expanded");

    for patch_id in [outer, inner] {
        let mut patch = Patch::new(patch_id, false);
        patch.layout = Some(PatchLayout {
            window_x: 0.0,
            window_y: 0.0,
            window_width: 100.0,
            window_height: 100.0,
            open_on_load: Some(false),
            graph_on_parent: None,
        });
        c.document.patches.insert(patch_id, patch);
    }

    c.groups.insert(
        outer,
        vec![Entry::Subpatch(SubpatchEntry {
            line_index: line,
            patch_id: inner,
            node_type: "graph".to_string(),
            x: "0".to_string(),
            y: "0".to_string(),
            name: None,
        })],
    );
    c.groups.insert(
        inner,
        vec![Entry::Array(ArrayEntry {
            line_index: line,
            array_id,
            source: ArraySource::Table {
                name,
                size: statement.token(6).map(String::from),
            },
            data: Vec::new(),
        })],
    );

    entries.push(Entry::Subpatch(SubpatchEntry {
        line_index: line,
        patch_id: outer,
        node_type: "table".to_string(),
        x: statement.token(2).unwrap_or("0").to_string(),
        y: statement.token(3).unwrap_or("0").to_string(),
        name: None,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;
    use crate::parse::tokenizer::tokenize;

    const SUBPATCHES: &str = "#N canvas 340 223 450 300 10;\n\
        #X obj 78 81 osc~;\n\
        #N canvas 1072 311 450 300 subPatch 1;\n\
        #X obj 46 39 inlet~;\n\
        #X obj 47 83 delwrite~ myDel;\n\
        #X obj 47 126 delread~ myDel;\n\
        #X obj 48 165 outlet~;\n\
        #N canvas 842 260 450 300 subSubPatch 1;\n\
        #X obj 67 67 outlet~;\n\
        #X obj 66 32 phasor~ -440;\n\
        #X connect 1 0 0 0;\n\
        #X coords 0 -1 1 1 85 60 2 60 30;\n\
        #X restore 183 83 pd subSubPatch;\n\
        #X connect 0 0 1 0;\n\
        #X connect 2 0 3 0;\n\
        #X restore 79 117 pd subPatch;\n\
        #X obj 80 175 dac~;\n\
        #X connect 0 0 1 0;\n\
        #X connect 1 0 2 0;\n\
        #X connect 1 0 2 1;\n";

    fn extract(src: &str) -> Compilation {
        let mut c = Compilation::new(ParseConfig::default());
        extract_patches(&mut c, tokenize(src));
        c
    }

    fn group_tokens(c: &Compilation, id: u32) -> Vec<String> {
        c.groups[&PatchId(id)]
            .iter()
            .map(|entry| match entry {
                Entry::Line(st) => st.tokens.join(" "),
                Entry::Subpatch(sub) => format!(
                    "PATCH {} {} {} {} {}",
                    sub.patch_id,
                    sub.x,
                    sub.y,
                    sub.node_type,
                    sub.name.as_deref().unwrap_or("")
                ),
                Entry::Array(array) => format!("ARRAY {}", array.array_id),
            })
            .collect()
    }

    #[test]
    fn extracts_nested_subpatches() {
        let c = extract(SUBPATCHES);
        assert!(c.errors.is_empty(), "{:?}", c.errors);
        assert_eq!(c.groups.len(), 3);

        assert_eq!(
            group_tokens(&c, 0),
            vec![
                "#X obj 78 81 osc~",
                "PATCH 1 79 117 pd subPatch",
                "#X obj 80 175 dac~",
                "#X connect 0 0 1 0",
                "#X connect 1 0 2 0",
                "#X connect 1 0 2 1",
            ]
        );
        assert_eq!(
            group_tokens(&c, 1),
            vec![
                "#X obj 46 39 inlet~",
                "#X obj 47 83 delwrite~ myDel",
                "#X obj 47 126 delread~ myDel",
                "#X obj 48 165 outlet~",
                "PATCH 2 183 83 pd subSubPatch",
                "#X connect 0 0 1 0",
                "#X connect 2 0 3 0",
            ]
        );
        assert_eq!(
            group_tokens(&c, 2),
            vec![
                "#X obj 67 67 outlet~",
                "#X obj 66 32 phasor~ -440",
                "#X connect 1 0 0 0",
            ]
        );
    }

    #[test]
    fn computes_patch_layouts() {
        let c = extract(SUBPATCHES);
        let root = &c.document.patches[&PatchId(0)];
        assert!(root.is_root);
        assert_eq!(
            root.layout,
            Some(PatchLayout {
                window_x: 340.0,
                window_y: 223.0,
                window_width: 450.0,
                window_height: 300.0,
                open_on_load: None,
                graph_on_parent: None,
            })
        );

        let sub = &c.document.patches[&PatchId(1)];
        assert!(!sub.is_root);
        let layout = sub.layout.as_ref().unwrap();
        assert_eq!(layout.window_x, 1072.0);
        assert_eq!(layout.open_on_load, Some(true));
        assert_eq!(layout.graph_on_parent, None);

        let sub_sub = c.document.patches[&PatchId(2)].layout.as_ref().unwrap();
        assert_eq!(
            sub_sub.graph_on_parent,
            Some(GraphOnParent {
                hide_object_name_and_arguments: true,
                viewport_x: 60.0,
                viewport_y: 30.0,
                viewport_width: 85.0,
                viewport_height: 60.0,
            })
        );
    }

    #[test]
    fn patch_ids_follow_pre_order() {
        let src = "#N canvas 0 0 10 10 10;\n\
            #N canvas 0 0 10 10 a 0;\n\
            #N canvas 0 0 10 10 b 0;\n\
            #X restore 0 0 pd b;\n\
            #X restore 0 0 pd a;\n\
            #N canvas 0 0 10 10 c 0;\n\
            #X restore 0 0 pd c;\n";
        let c = extract(src);
        assert!(c.errors.is_empty());
        assert_eq!(group_tokens(&c, 0), vec!["PATCH 1 0 0 pd a", "PATCH 3 0 0 pd c"]);
        assert_eq!(group_tokens(&c, 1), vec!["PATCH 2 0 0 pd b"]);
    }

    #[test]
    fn table_expands_to_three_levels() {
        let c = extract("#N canvas 0 0 450 300 12;\n#X obj 139 82 table BLA 35;\n");
        assert!(c.errors.is_empty());
        assert_eq!(c.document.patches.len(), 3);
        assert_eq!(group_tokens(&c, 0), vec!["PATCH 1 139 82 table "]);
        assert_eq!(group_tokens(&c, 1), vec!["PATCH 2 0 0 graph "]);
        assert_eq!(group_tokens(&c, 2), vec!["ARRAY 0"]);
        match &c.groups[&PatchId(2)][0] {
            Entry::Array(array) => assert_eq!(
                array.source,
                ArraySource::Table {
                    name: "BLA".to_string(),
                    size: Some("35".to_string())
                }
            ),
            other => panic!("expected array entry, got {other:?}"),
        }
    }

    #[test]
    fn array_data_attaches_to_array() {
        let src = "#N canvas 0 0 450 300 12;\n\
            #N canvas 0 0 450 300 (subpatch) 0;\n\
            #X array arr 3 float 3;\n\
            #A 0 0.1 0.2 0.3;\n\
            #X coords 0 1 3 -1 200 140 1 0 0;\n\
            #X restore 10 10 graph;\n";
        let c = extract(src);
        assert!(c.errors.is_empty(), "{:?}", c.errors);
        match &c.groups[&PatchId(1)][0] {
            Entry::Array(array) => {
                assert_eq!(array.array_id, ArrayId(0));
                assert_eq!(array.data.len(), 1);
            }
            other => panic!("expected array entry, got {other:?}"),
        }
        let gop = c.document.patches[&PatchId(1)]
            .layout
            .as_ref()
            .and_then(|l| l.graph_on_parent.clone())
            .unwrap();
        assert!(!gop.hide_object_name_and_arguments);
        assert_eq!(gop.viewport_width, 200.0);
    }

    #[test]
    fn dangling_array_data_is_an_error() {
        let c = extract("#N canvas 0 0 450 300 12;\n#X obj 1 1 f;\n#A 0 1 2;\n");
        assert_eq!(c.errors.len(), 1);
        assert_eq!(c.errors[0].line_index, 2);
    }

    #[test]
    fn unknown_chunks_and_elements_are_errors() {
        let c = extract(
            "#N canvas 0 0 450 300 12;\n#WEIRD a b;\n#X weirdElement 1 2;\n#X obj 1 1 f;\n",
        );
        assert_eq!(c.errors.len(), 2);
        assert_eq!(c.errors[0].line_index, 1);
        assert_eq!(c.errors[1].line_index, 2);
        assert_eq!(c.groups[&PatchId(0)].len(), 1);
    }

    #[test]
    fn unsupported_constructs_are_warnings() {
        let c = extract(
            "#N struct tpl float x;\n#N canvas 0 0 450 300 12;\n#X declare -path snd;\n",
        );
        assert!(c.errors.is_empty());
        assert_eq!(c.warnings.len(), 2);
        assert!(c.warnings[0].message.contains("struct"));
        assert!(c.warnings[1].message.contains("declare"));
    }

    #[test]
    fn structural_errors() {
        let c = extract("#X obj 1 1 f;\n");
        assert_eq!(c.errors.len(), 2, "{:?}", c.errors);

        let c = extract("#N canvas 0 0 10 10 10;\n#N canvas 0 0 10 10 a 0;\n");
        assert_eq!(c.errors.len(), 1);
        assert_eq!(c.errors[0].line_index, 1);

        let c = extract("#N canvas 0 0 10 10 10;\n#X restore 0 0 pd;\n");
        assert_eq!(c.errors.len(), 1);
    }

    #[test]
    fn nesting_depth_is_limited() {
        let mut src = String::from("#N canvas 0 0 10 10 10;\n");
        for _ in 0..5 {
            src.push_str("#N canvas 0 0 10 10 a 0;\n");
        }
        let mut c = Compilation::new(ParseConfig {
            max_depth: 3,
            ..ParseConfig::default()
        });
        extract_patches(&mut c, tokenize(&src));
        assert_eq!(c.errors.len(), 1);
        assert_eq!(c.errors[0].line_index, 3);
        assert_eq!(c.document.patches.len(), 3);
    }
}
