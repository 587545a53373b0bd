//! Derivation forests as petgraph graphs.
//!
//! The best derivations of a [`Derivation`] are exported bottom-up: edges
//! run from a child (a cell or a lexical leaf) to the cell it helps build,
//! labelled with the rule of the step. Tied Viterbi steps all appear, so a
//! cell may have several incoming groups of edges.

use std::collections::HashMap;
use std::fmt;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use semparse_ccg::{Category, RuleName};

use crate::cell::CellId;
use crate::output::Derivation;
use crate::step::StepKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ForestNode {
    Cell {
        category: Category,
        start: usize,
        end: usize,
    },
    Lexical {
        tokens: Vec<String>,
        start: usize,
        end: usize,
    },
}

impl fmt::Display for ForestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForestNode::Cell { category, start, end } => write!(f, "[{}-{}] {}", start, end, category),
            ForestNode::Lexical { tokens, start, end } => {
                write!(f, "[{}-{}] \"{}\"", start, end, tokens.join(" "))
            }
        }
    }
}

pub type Forest = DiGraph<ForestNode, RuleName>;

impl Derivation {
    /// The best derivations as a graph; the root is the only sink.
    pub fn forest(&self) -> Forest {
        let mut graph = Forest::new();
        let mut nodes: HashMap<CellId, NodeIndex> = HashMap::new();
        let root = self.cell_id();
        let mut stack = vec![root];
        nodes.insert(root, graph.add_node(self.cell_node(root)));

        while let Some(id) = stack.pop() {
            let Some(&parent) = nodes.get(&id) else {
                continue;
            };
            let cell = self.chart().cell(id);
            for weighted in cell.viterbi_steps() {
                let step = weighted.step();
                if let StepKind::Lexical(entry) = &step.kind {
                    let leaf = graph.add_node(ForestNode::Lexical {
                        tokens: entry.tokens().to_vec(),
                        start: step.span.start,
                        end: step.span.end,
                    });
                    graph.add_edge(leaf, parent, step.rule.clone());
                    continue;
                }
                for child in step.children() {
                    let node = match nodes.get(&child) {
                        Some(&node) => node,
                        None => {
                            let node = graph.add_node(self.cell_node(child));
                            nodes.insert(child, node);
                            stack.push(child);
                            node
                        }
                    };
                    graph.add_edge(node, parent, step.rule.clone());
                }
            }
        }
        graph
    }

    /// The forest in Graphviz dot format.
    pub fn forest_dot(&self) -> String {
        format!("{}", Dot::new(&self.forest()))
    }

    fn cell_node(&self, id: CellId) -> ForestNode {
        let cell = self.chart().cell(id);
        ForestNode::Cell {
            category: cell.category().clone(),
            start: cell.span().start,
            end: cell.span().end,
        }
    }
}
