//! GraphML export for external graph tools

use crate::error::Result;
use crate::graph::{NetworkGraph, NodeKind, UNKNOWN_SALES_RANK};
use std::io::Write;

/// Attribute keys declared in the GraphML header: (id, domain, name, type)
const KEYS: [(&str, &str, &str, &str); 9] = [
    ("d0", "node", "class", "string"),
    ("d1", "node", "label", "string"),
    ("d2", "node", "genres", "string"),
    ("d3", "node", "sales_rank", "long"),
    ("d4", "node", "reader_id", "long"),
    ("d5", "node", "community", "long"),
    ("d6", "edge", "weight", "double"),
    ("d7", "edge", "rating", "int"),
    ("d8", "edge", "read_count", "int"),
];

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write `graph` as undirected GraphML; nodes are identified by their keys
pub fn write_graphml<W: Write>(graph: &NetworkGraph, out: &mut W) -> Result<()> {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(out, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    for (id, domain, name, kind) in KEYS {
        writeln!(
            out,
            "  <key id=\"{}\" for=\"{}\" attr.name=\"{}\" attr.type=\"{}\"/>",
            id, domain, name, kind
        )?;
    }
    writeln!(out, "  <graph id=\"G\" edgedefault=\"undirected\">")?;

    for (_, node) in graph.nodes() {
        writeln!(out, "    <node id=\"{}\">", escape(&node.key))?;
        writeln!(out, "      <data key=\"d0\">{}</data>", node.class().name())?;
        writeln!(out, "      <data key=\"d1\">{}</data>", escape(node.label()))?;
        match &node.kind {
            NodeKind::Book(attrs) => {
                writeln!(out, "      <data key=\"d2\">{}</data>", escape(&attrs.genres.join("|")))?;
                writeln!(
                    out,
                    "      <data key=\"d3\">{}</data>",
                    attrs.sales_rank.unwrap_or(UNKNOWN_SALES_RANK)
                )?;
            }
            NodeKind::Reader { reader_id, .. } => {
                writeln!(out, "      <data key=\"d4\">{}</data>", reader_id)?;
            }
        }
        if let Some(community) = node.community {
            writeln!(out, "      <data key=\"d5\">{}</data>", community)?;
        }
        writeln!(out, "    </node>")?;
    }

    for (edge_id, (a, b, edge)) in graph.edges().enumerate() {
        let (Some(source), Some(target)) = (graph.node(a), graph.node(b)) else {
            continue;
        };
        writeln!(
            out,
            "    <edge id=\"e{}\" source=\"{}\" target=\"{}\">",
            edge_id,
            escape(&source.key),
            escape(&target.key)
        )?;
        writeln!(out, "      <data key=\"d6\">{}</data>", edge.weight)?;
        if let Some(rating) = edge.rating {
            writeln!(out, "      <data key=\"d7\">{}</data>", rating)?;
        }
        if let Some(read_count) = edge.read_count {
            writeln!(out, "      <data key=\"d8\">{}</data>", read_count)?;
        }
        writeln!(out, "    </edge>")?;
    }

    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")?;
    Ok(())
}
