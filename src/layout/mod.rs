//! Contention graph layout
//!
//! Lays papers, contention points and research gaps out in three columns
//! with [`GraphLayoutEngine`], and tracks node selection with [`GraphView`].

mod edge;
mod engine;
pub mod heuristic;
mod node;
mod view;


pub use edge::{CubicCurve, EdgeKind, LayoutEdge};
pub use engine::{
    barycenter, displayed_papers, order_by_barycenter, GraphLayout, GraphLayoutEngine,
    LayoutMetrics,
};
pub use heuristic::topic_matches_gap;
pub use node::{LayoutNode, NodeId, NodeKind};
pub use view::GraphView;
