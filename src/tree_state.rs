use crate::node_state::InvalidStateChar;
use crate::node_state::NodeState;
use crate::tree::NodeIdx;
use crate::tree::ProcessTree;

/// The global state of a tree: one [`NodeState`] cell per node, indexed by
/// pre-order position. Values, not places; `update` hands back a fresh state
/// and never touches the original, so search states may share predecessors
/// freely. Equality and hashing cover the whole vector.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct TreeState {
	cells: Vec<NodeState>,
}

impl TreeState {
	/// Every node `Future`.
	pub fn initial(tree: &ProcessTree) -> Self {
		Self {
			cells: vec![NodeState::Future; tree.len()],
		}
	}

	pub fn from_text(text: &str) -> Result<Self, InvalidStateChar> {
		let mut cells: Vec<NodeState> = Vec::with_capacity(text.len());
		for ch in text.chars() {
			cells.push(NodeState::from_char(ch)?);
		}
		Ok(Self { cells })
	}

	pub fn len(&self) -> usize {
		self.cells.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}

	pub fn get(&self, node: NodeIdx) -> NodeState {
		self.cells[node.position()]
	}

	pub fn is_future(&self, node: NodeIdx) -> bool {
		self.get(node) == NodeState::Future
	}

	pub fn is_open(&self, node: NodeIdx) -> bool {
		self.get(node) == NodeState::Open
	}

	pub fn is_closed(&self, node: NodeIdx) -> bool {
		self.get(node) == NodeState::Closed
	}

	/// A copy of this state differing in exactly the one cell.
	pub fn update(&self, node: NodeIdx, state: NodeState) -> Self {
		let mut cells: Vec<NodeState> = self.cells.clone();
		cells[node.position()] = state;
		Self { cells }
	}

	/// Cellwise [`NodeState::invert`]; an involution on tree states.
	pub fn invert(&self) -> Self {
		Self {
			cells: self.cells.iter().map(|cell| cell.invert()).collect::<Vec<_>>(),
		}
	}

	/// Whether `node` and every transitive descendant sit in `state`.
	pub fn all_descendants_in(&self, tree: &ProcessTree, node: NodeIdx, state: NodeState) -> bool {
		self.get(node) == state
			&& tree
				.children(node)
				.iter()
				.all(|&child| self.all_descendants_in(tree, child, state))
	}

	pub fn all_descendants_future(&self, tree: &ProcessTree, node: NodeIdx) -> bool {
		self.all_descendants_in(tree, node, NodeState::Future)
	}

	pub fn all_descendants_closed(&self, tree: &ProcessTree, node: NodeIdx) -> bool {
		self.all_descendants_in(tree, node, NodeState::Closed)
	}
}

impl std::fmt::Display for TreeState {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for cell in self.cells.iter() {
			fmt.write_fmt(format_args!("{}", cell.to_char()))?;
		}
		Ok(())
	}
}
