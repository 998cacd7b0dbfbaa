use std::collections::HashMap;

use course_requirement_parser::{parse_requirement, CourseCode, ParseError};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::Catalogue;

/// Course-level view of a catalogue: an edge from each course to every course
/// its prerequisite expression names.
///
/// Courses that are only referenced, never described, still get a node.
#[derive(Debug)]
pub struct PrerequisiteGraph {
    graph: DiGraph<CourseCode, ()>,
    nodes: HashMap<CourseCode, NodeIndex>,
    unparsed: Vec<(CourseCode, ParseError)>,
}

impl PrerequisiteGraph {
    pub fn build(catalogue: &Catalogue) -> PrerequisiteGraph {
        let mut this = PrerequisiteGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            unparsed: Vec::new(),
        };
        for entry in catalogue.entries() {
            let from = this.node(&entry.code);
            if entry.prerequisites.trim().is_empty() {
                continue;
            }
            match parse_requirement(&entry.prerequisites) {
                Ok(requirement) => {
                    for code in requirement.course_codes() {
                        let to = this.node(code);
                        this.graph.update_edge(from, to, ());
                    }
                }
                Err(error) => {
                    debug!(code = %entry.code, %error, "skipping unparsed prerequisites");
                    this.unparsed.push((entry.code.clone(), error));
                }
            }
        }
        this
    }

    fn node(&mut self, code: &CourseCode) -> NodeIndex {
        if let Some(&index) = self.nodes.get(code) {
            return index;
        }
        let index = self.graph.add_node(code.clone());
        self.nodes.insert(code.clone(), index);
        index
    }

    fn neighbors(&self, code: &str, direction: Direction) -> Vec<&CourseCode> {
        let Some(&index) = self.nodes.get(code) else {
            return Vec::new();
        };
        let mut codes: Vec<&CourseCode> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|neighbor| &self.graph[neighbor])
            .collect();
        codes.sort();
        codes
    }

    /// Courses named in `code`'s prerequisites.
    pub fn prerequisites_of(&self, code: &str) -> Vec<&CourseCode> {
        self.neighbors(code, Direction::Outgoing)
    }

    /// Courses whose prerequisites name `code`.
    pub fn dependents_of(&self, code: &str) -> Vec<&CourseCode> {
        self.neighbors(code, Direction::Incoming)
    }

    /// Groups of courses that require each other, directly or transitively.
    /// Each group and the list of groups are sorted.
    pub fn cycles(&self) -> Vec<Vec<&CourseCode>> {
        let mut cycles: Vec<Vec<&CourseCode>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut codes: Vec<&CourseCode> =
                    component.into_iter().map(|index| &self.graph[index]).collect();
                codes.sort();
                codes
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Catalogue entries whose prerequisite text did not parse.
    pub fn unparsed(&self) -> &[(CourseCode, ParseError)] {
        &self.unparsed
    }
}
