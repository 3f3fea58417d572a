//! Selection state over a layout

use super::edge::LayoutEdge;
use super::engine::{GraphLayout, GraphLayoutEngine};
use super::node::NodeId;
use crate::model::{AnalysisResult, ContentionPoint, Paper};
use std::collections::BTreeSet;

/// A layout plus the only mutable view state: the selected node and the
/// show-all-papers toggle.
///
/// Nothing is removed on selection; inactive nodes and edges are for the
/// renderer to de-emphasize.
#[derive(Debug, Clone)]
pub struct GraphView {
    engine: GraphLayoutEngine,
    papers: Vec<Paper>,
    contentions: Vec<ContentionPoint>,
    gaps: Vec<String>,
    show_all_papers: bool,
    layout: GraphLayout,
    selected: Option<NodeId>,
}

impl GraphView {
    pub fn new(
        engine: GraphLayoutEngine,
        papers: Vec<Paper>,
        contentions: Vec<ContentionPoint>,
        gaps: Vec<String>,
    ) -> Self {
        let layout = engine.layout(&papers, &contentions, &gaps, false);
        Self {
            engine,
            papers,
            contentions,
            gaps,
            show_all_papers: false,
            layout,
            selected: None,
        }
    }

    pub fn from_result(result: &AnalysisResult) -> Self {
        Self::new(
            GraphLayoutEngine::default(),
            result.papers.clone(),
            result.contention_points.clone(),
            result.research_gaps.clone(),
        )
    }

    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn show_all_papers(&self) -> bool {
        self.show_all_papers
    }

    /// Select `id`, or clear the selection if it is already selected or
    /// not in the layout. Returns whether a node is now selected.
    pub fn select(&mut self, id: &NodeId) -> bool {
        if self.selected.as_ref() == Some(id) || self.layout.node(id).is_none() {
            self.selected = None;
        } else {
            self.selected = Some(id.clone());
        }
        self.selected.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Recompute the layout; a selected node that disappears is deselected.
    pub fn set_show_all_papers(&mut self, show_all: bool) {
        if show_all == self.show_all_papers {
            return;
        }
        self.show_all_papers = show_all;
        self.layout = self
            .engine
            .layout(&self.papers, &self.contentions, &self.gaps, show_all);
        if let Some(id) = &self.selected {
            if self.layout.node(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// The selected node and its direct neighbors; every node when nothing is selected
    pub fn active_nodes(&self) -> BTreeSet<NodeId> {
        match &self.selected {
            None => self.layout.nodes.iter().map(|n| n.id.clone()).collect(),
            Some(selected) => {
                let mut active = BTreeSet::from([selected.clone()]);
                for edge in self.layout.edges.iter().filter(|e| e.touches(selected)) {
                    active.insert(edge.source.clone());
                    active.insert(edge.target.clone());
                }
                active
            }
        }
    }

    pub fn is_node_active(&self, id: &NodeId) -> bool {
        match &self.selected {
            None => true,
            Some(_) => self.active_nodes().contains(id),
        }
    }

    /// Active when nothing is selected or the edge touches the selection
    pub fn is_edge_active(&self, edge: &LayoutEdge) -> bool {
        match &self.selected {
            None => true,
            Some(selected) => edge.touches(selected),
        }
    }
}
