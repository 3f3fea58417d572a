//! Edges between columns and their curve geometry

use super::node::{LayoutNode, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Explicit: from a contention point's related papers
    PaperContention,
    /// Inferred by the topic keyword heuristic or the round-robin fallback
    ContentionGap,
}

/// A directed edge from a node to a node in the next column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// Paper's relevance to the contention topic; paper edges only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    pub curve: CubicCurve,
}

impl LayoutEdge {
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

/// Cubic Bézier from the source's right edge to the target's left edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicCurve {
    pub start: (f64, f64),
    pub control1: (f64, f64),
    pub control2: (f64, f64),
    pub end: (f64, f64),
}

impl CubicCurve {
    /// Horizontal control offset is `min_offset` or `ratio` of the horizontal span, whichever is larger.
    pub fn between(source: &LayoutNode, target: &LayoutNode, min_offset: f64, ratio: f64) -> Self {
        let (x1, y1) = (source.right(), source.center_y());
        let (x2, y2) = (target.x, target.center_y());
        let offset = f64::max(min_offset, (x2 - x1) * ratio);
        Self {
            start: (x1, y1),
            control1: (x1 + offset, y1),
            control2: (x2 - offset, y2),
            end: (x2, y2),
        }
    }

    /// SVG path data
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.start.0,
            self.start.1,
            self.control1.0,
            self.control1.1,
            self.control2.0,
            self.control2.1,
            self.end.0,
            self.end.1
        )
    }
}
