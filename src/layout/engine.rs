//! Layered barycenter layout
//!
//! Three fixed columns, left to right: papers, contention points, research
//! gaps. Papers keep input order. Each later column is ordered by the
//! barycenter of its connections in the column before it, in a single
//! left-to-right pass. This approximates, but does not minimize, edge
//! crossings.

use super::edge::{CubicCurve, EdgeKind, LayoutEdge};
use super::heuristic::related_gaps;
use super::node::{LayoutNode, NodeId, NodeKind};
use crate::model::{ContentionPoint, Doi, Paper};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Fixed geometry of the layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub padding: f64,
    pub column_gap: f64,
    pub vertical_gap: f64,
    /// Multiplier on `vertical_gap` in the contention column
    pub contention_gap_factor: f64,
    pub paper_size: (f64, f64),
    pub contention_size: (f64, f64),
    pub gap_size: (f64, f64),
    pub min_control_offset: f64,
    pub control_offset_ratio: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            padding: 40.0,
            column_gap: 250.0,
            vertical_gap: 25.0,
            contention_gap_factor: 2.0,
            paper_size: (220.0, 60.0),
            contention_size: (240.0, 90.0),
            gap_size: (220.0, 90.0),
            min_control_offset: 40.0,
            control_offset_ratio: 0.4,
        }
    }
}

/// A computed layout. Empty when there is nothing to connect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphLayout {
    /// Paper column, then contention column, then gap column; each top to bottom
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub width: f64,
    pub height: f64,
}

impl GraphLayout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Nodes of one column, top to bottom
    pub fn column(&self, kind: NodeKind) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }
}

/// Mean of `centers`, or `None` when there are none
pub fn barycenter(centers: &[f64]) -> Option<f64> {
    if centers.is_empty() {
        None
    } else {
        Some(centers.iter().sum::<f64>() / centers.len() as f64)
    }
}

/// Unconnected (`None`) before any barycenter, then ascending
fn compare_barycenters(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

/// Stable sort of nodes by barycenter, unconnected nodes first
pub fn order_by_barycenter(nodes: &mut [LayoutNode]) {
    nodes.sort_by(|a, b| compare_barycenters(a.barycenter, b.barycenter));
}

/// Papers shown in the paper column.
///
/// Only papers referenced by some contention point, unless `show_all` is
/// set or no paper is referenced at all.
pub fn displayed_papers<'a>(
    papers: &'a [Paper],
    contentions: &[ContentionPoint],
    show_all: bool,
) -> Vec<&'a Paper> {
    let referenced: HashSet<&Doi> = contentions.iter().flat_map(|c| c.related_dois()).collect();
    if show_all || referenced.is_empty() {
        papers.iter().collect()
    } else {
        papers.iter().filter(|p| referenced.contains(&p.doi)).collect()
    }
}

/// Computes [`GraphLayout`]s. Pure: equal inputs give equal layouts.
#[derive(Debug, Clone, Default)]
pub struct GraphLayoutEngine {
    metrics: LayoutMetrics,
}

impl GraphLayoutEngine {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn layout(
        &self,
        papers: &[Paper],
        contentions: &[ContentionPoint],
        gaps: &[String],
        show_all_papers: bool,
    ) -> GraphLayout {
        let displayed = displayed_papers(papers, contentions, show_all_papers);
        if contentions.is_empty() || displayed.is_empty() {
            return GraphLayout::default();
        }
        let m = &self.metrics;

        // Papers: input order
        let mut paper_y = m.padding;
        let paper_nodes: Vec<LayoutNode> = displayed
            .iter()
            .enumerate()
            .map(|(index, paper)| {
                let node = LayoutNode {
                    id: NodeId::paper(&paper.doi),
                    kind: NodeKind::Paper,
                    index,
                    label: paper.title.clone(),
                    x: m.padding,
                    y: paper_y,
                    width: m.paper_size.0,
                    height: m.paper_size.1,
                    barycenter: None,
                };
                paper_y += node.height + m.vertical_gap;
                node
            })
            .collect();
        let paper_centers: HashMap<&Doi, f64> = displayed
            .iter()
            .zip(&paper_nodes)
            .map(|(p, n)| (&p.doi, n.center_y()))
            .collect();

        // Contention and gap connectivity. A gap remembers the last
        // contention point that targets it.
        let contention_gaps: Vec<Vec<usize>> = contentions
            .iter()
            .enumerate()
            .map(|(i, c)| related_gaps(&c.topic, i, gaps))
            .collect();
        let mut gap_owner: Vec<Option<usize>> = vec![None; gaps.len()];
        for (i, targets) in contention_gaps.iter().enumerate() {
            for &g in targets {
                gap_owner[g] = Some(i);
            }
        }

        // Contentions: barycenter of connected papers
        let contention_x = m.padding + m.paper_size.0 + m.column_gap;
        let mut contention_nodes: Vec<LayoutNode> = contentions
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let related: HashSet<&Doi> = c.related_dois().collect();
                let centers: Vec<f64> = displayed
                    .iter()
                    .filter(|p| related.contains(&p.doi))
                    .filter_map(|p| paper_centers.get(&p.doi).copied())
                    .collect();
                LayoutNode {
                    id: NodeId::contention(index),
                    kind: NodeKind::Contention,
                    index,
                    label: c.topic.clone(),
                    x: contention_x,
                    y: 0.0,
                    width: m.contention_size.0,
                    height: m.contention_size.1,
                    barycenter: barycenter(&centers),
                }
            })
            .collect();
        order_by_barycenter(&mut contention_nodes);
        let contention_y = stack(
            &mut contention_nodes,
            m.padding,
            m.vertical_gap * m.contention_gap_factor,
        );
        let contention_centers: HashMap<usize, f64> = contention_nodes
            .iter()
            .map(|n| (n.index, n.center_y()))
            .collect();

        // Gaps: center of the owning contention
        let gap_x = contention_x + m.contention_size.0 + m.column_gap;
        let mut gap_nodes: Vec<LayoutNode> = gaps
            .iter()
            .enumerate()
            .map(|(index, text)| LayoutNode {
                id: NodeId::gap(index),
                kind: NodeKind::Gap,
                index,
                label: text.clone(),
                x: gap_x,
                y: 0.0,
                width: m.gap_size.0,
                height: m.gap_size.1,
                barycenter: gap_owner[index].and_then(|c| contention_centers.get(&c).copied()),
            })
            .collect();
        order_by_barycenter(&mut gap_nodes);
        let gap_y = stack(&mut gap_nodes, m.padding, m.vertical_gap);

        let edges = self.edges(contentions, &contention_gaps, &paper_nodes, &contention_nodes, &gap_nodes);

        let height = paper_y.max(contention_y).max(gap_y) + m.padding;
        let width = gap_x + m.gap_size.0 + m.padding;
        let mut nodes = paper_nodes;
        nodes.extend(contention_nodes);
        nodes.extend(gap_nodes);

        GraphLayout {
            nodes,
            edges,
            width,
            height,
        }
    }

    /// Edges in contention column order: each contention's paper edges,
    /// then its gap edges. Duplicate pairs are emitted once.
    fn edges(
        &self,
        contentions: &[ContentionPoint],
        contention_gaps: &[Vec<usize>],
        paper_nodes: &[LayoutNode],
        contention_nodes: &[LayoutNode],
        gap_nodes: &[LayoutNode],
    ) -> Vec<LayoutEdge> {
        let m = &self.metrics;
        let papers_by_id: HashMap<&NodeId, &LayoutNode> = paper_nodes.iter().map(|n| (&n.id, n)).collect();
        let gaps_by_index: HashMap<usize, &LayoutNode> = gap_nodes.iter().map(|n| (n.index, n)).collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut edges = Vec::new();
        for contention in contention_nodes {
            let point = &contentions[contention.index];
            for related in &point.related_papers {
                let paper_id = NodeId::paper(&related.doi);
                let Some(paper) = papers_by_id.get(&paper_id) else {
                    continue;
                };
                let id = format!("line-p-{}-{}", related.doi, contention.index);
                if seen.insert(id.clone()) {
                    edges.push(LayoutEdge {
                        id,
                        source: paper.id.clone(),
                        target: contention.id.clone(),
                        kind: EdgeKind::PaperContention,
                        relevance: Some(related.relevance),
                        curve: CubicCurve::between(paper, contention, m.min_control_offset, m.control_offset_ratio),
                    });
                }
            }
            for gap_index in &contention_gaps[contention.index] {
                let Some(gap) = gaps_by_index.get(gap_index) else {
                    continue;
                };
                let id = format!("line-g-{}-{}", contention.index, gap_index);
                if seen.insert(id.clone()) {
                    edges.push(LayoutEdge {
                        id,
                        source: contention.id.clone(),
                        target: gap.id.clone(),
                        kind: EdgeKind::ContentionGap,
                        relevance: None,
                        curve: CubicCurve::between(contention, gap, m.min_control_offset, m.control_offset_ratio),
                    });
                }
            }
        }
        edges
    }
}

/// Assign `y` top to bottom; returns the running offset after the last node
fn stack(nodes: &mut [LayoutNode], start: f64, gap: f64) -> f64 {
    let mut y = start;
    for node in nodes {
        node.y = y;
        y += node.height + gap;
    }
    y
}
