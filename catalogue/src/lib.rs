//! Course records scraped from a university catalogue, and the prerequisite
//! graph they describe.

mod graph;
mod store;

pub use graph::PrerequisiteGraph;
pub use store::{Catalogue, CatalogueEntry, CatalogueError};
