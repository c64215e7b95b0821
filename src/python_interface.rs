use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use crate::parser::parse_tree;
use crate::search::Pathfinder;
use crate::search::SearchResult;
use crate::tree::ProcessTree;

pyo3::create_exception!(ptpathfinder, PathfinderException, PyRuntimeError);
pyo3::create_exception!(ptpathfinder, InvalidTreeNotation, PathfinderException);
pyo3::create_exception!(ptpathfinder, NoPathFound, PathfinderException);

#[pyclass]
#[derive(Debug, Clone)]
struct Tree {
	tree: ProcessTree,
}

#[pyclass]
#[derive(Debug, Clone)]
struct PathResult {
	#[pyo3(get)]
	cost: u64,
	#[pyo3(get)]
	firing_sequence: Vec<String>,
	#[pyo3(get)]
	leaf_sequence: Vec<String>,
	#[pyo3(get)]
	visited_states: usize,
}

#[pymethods]
impl Tree {
	#[new]
	fn new(notation: &str) -> PyResult<Self> {
		let tree: ProcessTree = parse_tree(notation)
			.map_err(|err| InvalidTreeNotation::new_err(format!("Invalid tree notation: {err:?}")))?;
		Ok(Self { tree })
	}

	fn __str__(&self) -> String {
		self.tree.to_string()
	}

	fn node_count(&self) -> usize {
		self.tree.len()
	}

	#[pyo3(signature = (unidirectional = false))]
	fn search(&self, unidirectional: bool) -> PyResult<PathResult> {
		let result: SearchResult = Pathfinder::new(&self.tree)
			.run(unidirectional)
			.map_err(|err| NoPathFound::new_err(format!("Search failed: {err:?}")))?;

		Ok(PathResult {
			cost: result.cost,
			firing_sequence: result
				.firing_sequence
				.iter()
				.map(|transition| transition.to_string())
				.collect::<Vec<_>>(),
			leaf_sequence: result
				.trace(&self.tree)
				.iter()
				.map(|&label| label.to_owned())
				.collect::<Vec<_>>(),
			visited_states: result.visited_states,
		})
	}
}

#[pymodule]
mod ptpathfinder {
	#[pymodule_export]
	use super::PathResult;
	#[pymodule_export]
	use super::Tree;
}
