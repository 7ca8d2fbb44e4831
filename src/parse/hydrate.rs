//! Node and array hydration.
//!
//! Turns each patch's statement group into nodes, connections and arrays.
//! Node ids are local to a patch and follow statement order; connections
//! don't take one. A statement that fails to hydrate is reported against
//! its line and still takes its id, so the ids used by later `connect`
//! statements stay aligned with the file.

use std::collections::BTreeMap;

use tracing::trace;

use super::args::{parse_arg, parse_number, parse_string, RawArg};
use super::compile::Compilation;
use super::controls::{atom_schema, object_schema};
use super::error::{StatementError, ValueError};
use super::extract::{ArrayEntry, ArraySource, Entry, SubpatchEntry};
use super::token::Statement;
use crate::document::{
    Arg, ArrayArgs, ArrayLayout, Connection, ControlType, DrawAs, Node, NodeId, NodeLayout,
    PdArray,
};

/// Hydrate every statement group registered during extraction.
pub fn hydrate_patches(c: &mut Compilation) {
    let groups = std::mem::take(&mut c.groups);

    for (patch_id, entries) in groups {
        let mut nodes = BTreeMap::new();
        let mut connections = Vec::new();
        let mut next_node = 0u32;

        for entry in entries {
            if let Entry::Line(statement) = &entry {
                if statement.keyword() == Some("connect") {
                    match hydrate_connection(statement) {
                        Ok(connection) => connections.push(connection),
                        Err(e) => c.error(statement.line_index, e),
                    }
                    continue;
                }
            }

            let id = NodeId(next_node);
            next_node += 1;

            let (line, hydrated) = match entry {
                Entry::Line(statement) => (statement.line_index, hydrate_line(id, &statement)),
                Entry::Subpatch(subpatch) => (subpatch.line_index, hydrate_subpatch(id, &subpatch)),
                Entry::Array(array) => (array.line_index, hydrate_array(c, id, array)),
            };
            match hydrated {
                Ok(node) => {
                    trace!(patch = %patch_id, node = %id, node_type = %node.node_type, "node hydrated");
                    nodes.insert(id, node);
                }
                Err(e) => c.error(line, e),
            }
        }

        let inlets = ports_left_to_right(&nodes, Node::is_inlet);
        let outlets = ports_left_to_right(&nodes, Node::is_outlet);

        if let Some(patch) = c.document.patches.get_mut(&patch_id) {
            patch.nodes = nodes;
            patch.connections = connections;
            patch.inlets = inlets;
            patch.outlets = outlets;
        }
    }
}

/// Ids of the matching nodes, ordered by horizontal position.
fn ports_left_to_right(nodes: &BTreeMap<NodeId, Node>, is_port: fn(&Node) -> bool) -> Vec<NodeId> {
    let mut ports: Vec<&Node> = nodes.values().filter(|n| is_port(n)).collect();
    ports.sort_by(|a, b| {
        let ax = a.layout.x.unwrap_or(0.0);
        let bx = b.layout.x.unwrap_or(0.0);
        ax.total_cmp(&bx)
    });
    ports.into_iter().map(|n| n.id).collect()
}

fn hydrate_line(id: NodeId, statement: &Statement) -> Result<Node, StatementError> {
    let (body, width) = statement.body_and_width();
    let keyword = statement.keyword().unwrap_or_default();

    let mut layout = position(body)?;
    if let Some(width) = width {
        layout.width = Some(parse_number(width)?);
    }
    let fields = body.get(4..).unwrap_or_default();

    match keyword {
        "obj" => {
            let (class, rest) = fields.split_first().ok_or(StatementError::MissingField {
                element: "obj",
                field: "class",
            })?;
            match object_schema(class) {
                Some(schema) => {
                    let args = schema.hydrate(rest, &mut layout)?;
                    Ok(Node::control(id, schema.control, args, layout))
                }
                None => Ok(Node::generic(id, class, coerce_all(rest)?, layout)),
            }
        }
        "msg" => Ok(Node::control(id, ControlType::Msg, coerce_all(fields)?, layout)),
        "text" => Ok(Node::text(id, parse_string(fields.join(" ").as_str())?, layout)),
        other => {
            let schema =
                atom_schema(other).ok_or_else(|| StatementError::UnknownElement(other.to_string()))?;
            let args = schema.hydrate(fields, &mut layout)?;
            Ok(Node::control(id, schema.control, args, layout))
        }
    }
}

fn position(body: &[String]) -> Result<NodeLayout, StatementError> {
    let coordinate = |index, field| -> Result<f64, StatementError> {
        let token = body.get(index).ok_or(StatementError::MissingField {
            element: "node",
            field,
        })?;
        Ok(parse_number(token)?)
    };
    Ok(NodeLayout::at(coordinate(2, "x")?, coordinate(3, "y")?))
}

fn coerce_all(tokens: &[String]) -> Result<Vec<Arg>, StatementError> {
    Ok(tokens.iter().map(parse_arg).collect::<Result<Vec<_>, _>>()?)
}

/// `#X connect <source> <outlet> <sink> <inlet>`
fn hydrate_connection(statement: &Statement) -> Result<Connection, StatementError> {
    if statement.tokens.len() != 6 {
        return Err(StatementError::Arity {
            element: "connect".to_string(),
            expected: "4".to_string(),
            found: statement.tokens.len().saturating_sub(2),
        });
    }
    let index = |i: usize| parse_index(&statement.tokens[i]);
    Ok(Connection::new((index(2)?, index(3)?), (index(4)?, index(5)?)))
}

/// A node index, portlet index, array size or offset: a non-negative
/// whole number.
fn parse_index<'a>(raw: impl Into<RawArg<'a>>) -> Result<u32, StatementError> {
    let raw = raw.into();
    let n = parse_number(raw)?;
    if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return Err(ValueError::Number(raw.to_string()).into());
    }
    Ok(n as u32)
}

fn hydrate_subpatch(id: NodeId, subpatch: &SubpatchEntry) -> Result<Node, StatementError> {
    let layout = NodeLayout::at(parse_number(&subpatch.x)?, parse_number(&subpatch.y)?);
    let args = match &subpatch.name {
        Some(name) => vec![parse_arg(name)?],
        None => Vec::new(),
    };
    Ok(Node::subpatch(
        id,
        &subpatch.node_type,
        subpatch.patch_id,
        args,
        layout,
    ))
}

fn hydrate_array(c: &mut Compilation, id: NodeId, entry: ArrayEntry) -> Result<Node, StatementError> {
    let array = match &entry.source {
        ArraySource::Declared(statement) => {
            declared_array(&entry, statement, c.config.max_array_size)?
        }
        ArraySource::Table { name, size } => PdArray {
            id: entry.array_id,
            args: ArrayArgs {
                name: parse_string(name.as_str())?,
                size: Arg::Number(
                    size.as_deref()
                        .and_then(|s| parse_number(s).ok())
                        .unwrap_or(c.config.default_array_size as f64),
                ),
                save_contents: false,
            },
            layout: ArrayLayout {
                draw_as: Some(DrawAs::Polygon),
            },
            data: None,
        },
    };

    c.document.arrays.insert(entry.array_id, array);
    Ok(Node::array(id, entry.array_id))
}

/// `#X array <name> <size> float <flags>`, followed by `#A <offset> <values>`.
fn declared_array(
    entry: &ArrayEntry,
    statement: &Statement,
    max_size: usize,
) -> Result<PdArray, StatementError> {
    let field = |index, name| {
        statement.token(index).ok_or(StatementError::MissingField {
            element: "array",
            field: name,
        })
    };

    let name = parse_string(field(2, "name")?)?;
    let size = parse_arg(field(3, "size")?)?;
    let flags = match statement.token(5) {
        Some(flags) => parse_index(flags)?,
        None => 0,
    };
    let save_contents = flags & 1 == 1;

    let data = match (&size, save_contents) {
        (Arg::Number(n), true) => {
            let len = parse_index(*n)? as usize;
            if len > max_size {
                return Err(StatementError::ArrayTooLarge {
                    size: len,
                    max: max_size,
                });
            }
            let mut data = vec![0.0; len];
            for chunk in &entry.data {
                fill_array(&mut data, chunk)?;
            }
            Some(data)
        }
        _ => None,
    };

    Ok(PdArray {
        id: entry.array_id,
        args: ArrayArgs {
            name,
            size,
            save_contents,
        },
        layout: ArrayLayout {
            draw_as: Some(DrawAs::from_flags(flags)),
        },
        data,
    })
}

fn fill_array(data: &mut [f64], chunk: &Statement) -> Result<(), StatementError> {
    let offset = chunk
        .token(1)
        .ok_or(StatementError::MissingField {
            element: "array data",
            field: "offset",
        })
        .and_then(parse_index)? as usize;

    let size = data.len();
    for (i, token) in chunk.tokens.iter().skip(2).enumerate() {
        let slot = data
            .get_mut(offset + i)
            .ok_or(StatementError::ArrayDataOutOfBounds {
                offset: offset + i,
                size,
            })?;
        *slot = parse_number(token)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;
    use crate::document::{ArrayId, NodeKind, PatchId};
    use crate::parse::extract::extract_patches;
    use crate::parse::tokenizer::tokenize;

    fn hydrate(src: &str) -> Compilation {
        let mut c = Compilation::new(ParseConfig::default());
        extract_patches(&mut c, tokenize(src));
        hydrate_patches(&mut c);
        c
    }

    fn line(text: &str) -> Statement {
        Statement::new(0, text.split_whitespace().map(String::from).collect())
    }

    #[test]
    fn generic_object() {
        let node = hydrate_line(NodeId(3), &line("#X obj 14 34 print bla 1")).unwrap();
        assert_eq!(
            node,
            Node::generic(
                NodeId(3),
                "print",
                vec![Arg::from("bla"), Arg::Number(1.0)],
                NodeLayout::at(14.0, 34.0)
            )
        );
    }

    #[test]
    fn object_width_suffix() {
        let node = hydrate_line(NodeId(0), &line("#X obj 10 20 osc~ 440 , f 30")).unwrap();
        assert_eq!(node.args, vec![Arg::Number(440.0)]);
        assert_eq!(node.layout.width, Some(30.0));
    }

    #[test]
    fn message_and_comment() {
        let node = hydrate_line(NodeId(0), &line("#X msg 73 43 \\; pd dsp 1")).unwrap();
        assert_eq!(node.control_type(), Some(ControlType::Msg));
        assert_eq!(
            node.args,
            vec![Arg::from(";"), Arg::from("pd"), Arg::from("dsp"), Arg::Number(1.0)]
        );

        let node = hydrate_line(NodeId(1), &line("#X text 205 308 hello \\, world")).unwrap();
        assert_eq!(node.kind, NodeKind::Text);
        assert_eq!(node.args, vec![Arg::from("hello , world")]);
    }

    #[test]
    fn control_object() {
        let node = hydrate_line(
            NodeId(0),
            &line("#X obj 144 85 tgl 15 1 s r empty 17 7 0 4 #fcfcfc #000000 #fcfcfc 10 10"),
        )
        .unwrap();
        assert_eq!(node.node_type, "tgl");
        assert_eq!(node.control_type(), Some(ControlType::Tgl));
        assert_eq!(node.layout.x, Some(144.0));
        assert_eq!(node.layout.size, Some(15.0));
    }

    #[test]
    fn bad_position_is_an_error() {
        assert!(hydrate_line(NodeId(0), &line("#X obj abc 10 f")).is_err());
        assert!(hydrate_line(NodeId(0), &line("#X obj 10")).is_err());
        assert!(hydrate_line(NodeId(0), &line("#X obj 10 10")).is_err());
    }

    #[test]
    fn connections() {
        assert_eq!(
            hydrate_connection(&line("#X connect 0 1 2 3")).unwrap(),
            Connection::new((0, 1), (2, 3))
        );
        assert!(hydrate_connection(&line("#X connect 0 1 2")).is_err());
        assert!(hydrate_connection(&line("#X connect 0 -1 2 0")).is_err());
        assert!(hydrate_connection(&line("#X connect 0 0.5 2 0")).is_err());
    }

    #[test]
    fn subpatch_node() {
        let entry = SubpatchEntry {
            line_index: 0,
            patch_id: PatchId(1),
            node_type: "pd".to_string(),
            x: "269".to_string(),
            y: "614".to_string(),
            name: None,
        };
        assert_eq!(
            hydrate_subpatch(NodeId(0), &entry).unwrap(),
            Node::subpatch(NodeId(0), "pd", PatchId(1), vec![], NodeLayout::at(269.0, 614.0))
        );

        let named = SubpatchEntry {
            name: Some("subPatch".to_string()),
            ..entry
        };
        assert_eq!(
            hydrate_subpatch(NodeId(0), &named).unwrap().args,
            vec![Arg::from("subPatch")]
        );
    }

    #[test]
    fn node_ids_skip_connections_but_not_failures() {
        let c = hydrate(
            "#N canvas 0 0 450 300 10;\n\
             #X obj 10 10 f;\n\
             #X connect 0 0 2 0;\n\
             #X obj x 10 f;\n\
             #X obj 30 10 print;\n",
        );
        assert_eq!(c.errors.len(), 1);
        assert_eq!(c.errors[0].line_index, 3);
        let patch = &c.document.patches[&PatchId(0)];
        assert_eq!(patch.nodes.keys().copied().collect::<Vec<_>>(), vec![NodeId(0), NodeId(2)]);
        assert_eq!(patch.connections, vec![Connection::new((0, 0), (2, 0))]);
    }

    #[test]
    fn ports_sorted_by_x() {
        let c = hydrate(
            "#N canvas 0 0 450 300 10;\n\
             #X obj 50 10 inlet;\n\
             #X obj 10 10 inlet~;\n\
             #X obj 90 200 outlet;\n\
             #X obj 20 200 outlet~;\n\
             #X obj 30 100 +~;\n",
        );
        let patch = &c.document.patches[&PatchId(0)];
        assert_eq!(patch.inlets, vec![NodeId(1), NodeId(0)]);
        assert_eq!(patch.outlets, vec![NodeId(3), NodeId(2)]);
    }

    #[test]
    fn declared_array_with_data() {
        let c = hydrate(
            "#N canvas 0 0 450 300 10;\n\
             #N canvas 0 0 450 300 (subpatch) 0;\n\
             #X array arr 5 float 3;\n\
             #A 0 0.1 0.2;\n\
             #A 2 0.3;\n\
             #X coords 0 1 5 -1 200 140 1;\n\
             #X restore 10 10 graph;\n",
        );
        assert!(c.errors.is_empty(), "{:?}", c.errors);
        let array = &c.document.arrays[&ArrayId(0)];
        assert_eq!(
            array.args,
            ArrayArgs {
                name: "arr".to_string(),
                size: Arg::Number(5.0),
                save_contents: true,
            }
        );
        assert_eq!(array.layout.draw_as, Some(DrawAs::Polygon));
        assert_eq!(array.data, Some(vec![0.1, 0.2, 0.3, 0.0, 0.0]));
        assert_eq!(
            c.document.patches[&PatchId(1)].nodes[&NodeId(0)],
            Node::array(NodeId(0), ArrayId(0))
        );
    }

    #[test]
    fn array_without_saved_contents() {
        let c = hydrate(
            "#N canvas 0 0 450 300 10;\n\
             #N canvas 0 0 450 300 (subpatch) 0;\n\
             #X array arr 10 float 4;\n\
             #X array dyn \\$1 float 1;\n\
             #X restore 10 10 graph;\n",
        );
        assert!(c.errors.is_empty(), "{:?}", c.errors);
        let arr = &c.document.arrays[&ArrayId(0)];
        assert_eq!(arr.data, None);
        assert_eq!(arr.layout.draw_as, Some(DrawAs::Bezier));
        let dyn_array = &c.document.arrays[&ArrayId(1)];
        assert_eq!(dyn_array.args.size, Arg::from("$1"));
        assert_eq!(dyn_array.data, None);
    }

    #[test]
    fn array_data_out_of_bounds() {
        let c = hydrate(
            "#N canvas 0 0 450 300 10;\n\
             #X array arr 2 float 1;\n\
             #A 1 0.5 0.6;\n",
        );
        assert_eq!(c.errors.len(), 1);
        assert!(c.errors[0].message.contains("out of bounds"));
        assert!(c.document.arrays.is_empty());
    }

    #[test]
    fn oversized_array_is_an_error() {
        let c = hydrate("#N canvas 0 0 450 300 10;\n#X array a 2000000000 float 1;\n");
        assert_eq!(c.errors.len(), 1);
        assert_eq!(c.errors[0].line_index, 1);
        assert!(c.errors[0].message.contains("exceeds the maximum"));
        assert!(c.document.arrays.is_empty());
    }

    #[test]
    fn oversized_array_without_saved_contents_is_kept() {
        let c = hydrate("#N canvas 0 0 450 300 10;\n#X array a 2000000000 float 0;\n");
        assert!(c.errors.is_empty());
        assert_eq!(c.document.arrays[&ArrayId(0)].data, None);
    }

    #[test]
    fn table_defaults() {
        let c = hydrate("#N canvas 0 0 450 300 12;\n#X obj 139 82 table BLA;\n");
        assert!(c.errors.is_empty());
        let array = &c.document.arrays[&ArrayId(0)];
        assert_eq!(array.args.size, Arg::Number(100.0));
        assert!(!array.args.save_contents);
        assert_eq!(array.data, None);

        let root = &c.document.patches[&PatchId(0)];
        assert_eq!(
            root.nodes[&NodeId(0)],
            Node::subpatch(NodeId(0), "table", PatchId(1), vec![], NodeLayout::at(139.0, 82.0))
        );
        let outer = &c.document.patches[&PatchId(1)];
        assert_eq!(
            outer.nodes[&NodeId(0)],
            Node::subpatch(NodeId(0), "graph", PatchId(2), vec![], NodeLayout::at(0.0, 0.0))
        );
    }
}
