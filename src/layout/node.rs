//! Positioned nodes of the contention graph

use crate::model::Doi;
use serde::{Deserialize, Serialize};

/// Stable identifier: `paper-{doi}`, `contention-{index}` or `gap-{index}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn paper(doi: &Doi) -> Self {
        Self(format!("paper-{}", doi))
    }

    pub fn contention(index: usize) -> Self {
        Self(format!("contention-{}", index))
    }

    pub fn gap(index: usize) -> Self {
        Self(format!("gap-{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column a node belongs to, left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Paper,
    Contention,
    Gap,
}

/// A node with its position and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Index into the input list for this node's family
    pub index: usize,
    /// Paper title, contention topic or gap text
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Mean center of connected nodes in the previous column; `None` when
    /// unconnected or in the paper column
    pub barycenter: Option<f64>,
}

impl LayoutNode {
    /// Vertical center
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}
