use crate::node_state::NodeState;
use crate::tree::NodeIdx;
use crate::tree::Operator;
use crate::tree::ProcessTree;
use crate::tree_state::TreeState;

/// A single state change of one node. Only four kinds are ever legal:
/// activation (`Future→Open`), completion (`Open→Closed`), skip
/// (`Future→Closed`) and re-arming (`Closed→Future`).
#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Transition {
	pub node: NodeIdx,
	pub from_state: NodeState,
	pub to_state: NodeState,
}

/// Applying a transition was rejected; see [`Transition::apply`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IllegalTransition {
	/// The node is not in the transition's `from` state.
	StateMismatch { expected: NodeState, actual: NodeState },
	/// The endpoints match but the enabling predicate is false here.
	NotEnabled,
}

impl Transition {
	pub fn future_to_open(node: NodeIdx) -> Self {
		Self {
			node,
			from_state: NodeState::Future,
			to_state: NodeState::Open,
		}
	}

	pub fn future_to_closed(node: NodeIdx) -> Self {
		Self {
			node,
			from_state: NodeState::Future,
			to_state: NodeState::Closed,
		}
	}

	pub fn open_to_closed(node: NodeIdx) -> Self {
		Self {
			node,
			from_state: NodeState::Open,
			to_state: NodeState::Closed,
		}
	}

	pub fn closed_to_future(node: NodeIdx) -> Self {
		Self {
			node,
			from_state: NodeState::Closed,
			to_state: NodeState::Future,
		}
	}

	pub fn is_future_to_open(&self) -> bool {
		self.from_state == NodeState::Future && self.to_state == NodeState::Open
	}

	pub fn is_future_to_closed(&self) -> bool {
		self.from_state == NodeState::Future && self.to_state == NodeState::Closed
	}

	pub fn is_open_to_closed(&self) -> bool {
		self.from_state == NodeState::Open && self.to_state == NodeState::Closed
	}

	pub fn is_closed_to_future(&self) -> bool {
		self.from_state == NodeState::Closed && self.to_state == NodeState::Future
	}

	/// The time-reversed counterpart on the same node: endpoints are swapped
	/// and inverted. Activation and completion map to one another; skip and
	/// re-arming map to themselves.
	pub fn invert(self) -> Self {
		Self {
			node: self.node,
			from_state: self.to_state.invert(),
			to_state: self.from_state.invert(),
		}
	}

	/// Checked application: rejects a transition whose `from` endpoint does
	/// not match the node's cell, or whose enabling predicate is false in
	/// `state`. The search itself applies enumerated transitions directly;
	/// this is the safe surface for everyone else.
	pub fn apply(&self, tree: &ProcessTree, state: &TreeState) -> Result<TreeState, IllegalTransition> {
		let actual: NodeState = state.get(self.node);
		if actual != self.from_state {
			return Err(IllegalTransition::StateMismatch {
				expected: self.from_state,
				actual,
			});
		}

		let enabled: bool = match (self.from_state, self.to_state) {
			(NodeState::Future, NodeState::Open) => can_future_to_open(tree, self.node, state),
			(NodeState::Future, NodeState::Closed) => can_future_to_closed(tree, self.node, state),
			(NodeState::Open, NodeState::Closed) => can_open_to_closed(tree, self.node, state),
			(NodeState::Closed, NodeState::Future) => can_closed_to_future(tree, self.node, state),
			_ => false,
		};
		if !enabled {
			return Err(IllegalTransition::NotEnabled);
		}

		Ok(state.update(self.node, self.to_state))
	}
}

impl std::fmt::Display for Transition {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		fmt.write_fmt(format_args!(
			"{}->{}@{}",
			self.from_state.to_char(),
			self.to_state.to_char(),
			self.node.position()
		))
	}
}

/// Every transition legal in `state`, enumerated from the root down.
///
/// Two early exits shape the enumeration: an enabled activation or completion
/// of a node suppresses enumeration inside that node's subtree. Every pruned
/// move stays reachable through the admitted one, so shortest paths survive,
/// and the branching factor stays small.
pub fn valid_transitions(tree: &ProcessTree, state: &TreeState) -> Vec<Transition> {
	let mut transitions: Vec<Transition> = Vec::new();
	collect_transitions(tree, tree.root(), state, &mut transitions);
	transitions
}

fn collect_transitions(tree: &ProcessTree, node: NodeIdx, state: &TreeState, out: &mut Vec<Transition>) {
	if state.is_future(node) {
		if can_future_to_open(tree, node, state) {
			out.push(Transition::future_to_open(node));
			return;
		}
		if can_future_to_closed(tree, node, state) {
			out.push(Transition::future_to_closed(node));
		}
	}

	if state.is_closed(node) && can_closed_to_future(tree, node, state) {
		out.push(Transition::closed_to_future(node));
	}

	if state.is_open(node) && can_open_to_closed(tree, node, state) {
		out.push(Transition::open_to_closed(node));
		return;
	}

	for &child in tree.children(node).iter() {
		collect_transitions(tree, child, state, out);
	}
}

/// Activation. The node must be `Future` (asserted), its subtree fresh, and
/// its open parent's operator must schedule it now.
pub fn can_future_to_open(tree: &ProcessTree, node: NodeIdx, state: &TreeState) -> bool {
	assert!(state.is_future(node));

	if !tree
		.children(node)
		.iter()
		.all(|&child| state.all_descendants_future(tree, child))
	{
		return false;
	}

	let Some(parent): Option<NodeIdx> = tree.parent(node) else {
		return true;
	};

	if !state.is_open(parent) {
		return false;
	}

	let siblings: &[NodeIdx] = tree.children(parent);
	let offset: usize = tree.child_offset(node).unwrap();

	match tree.operator(parent) {
		Some(Operator::Parallel) => true,
		Some(Operator::Sequence) => {
			siblings[..offset]
				.iter()
				.all(|&sibling| state.all_descendants_closed(tree, sibling))
				&& siblings[offset + 1..]
					.iter()
					.all(|&sibling| state.all_descendants_future(tree, sibling))
		},
		Some(Operator::ReverseSequence) => {
			siblings[..offset]
				.iter()
				.all(|&sibling| state.all_descendants_future(tree, sibling))
				&& siblings[offset + 1..]
					.iter()
					.all(|&sibling| state.all_descendants_closed(tree, sibling))
		},
		Some(Operator::Xor) => siblings
			.iter()
			.all(|&sibling| state.all_descendants_future(tree, sibling)),
		Some(Operator::Loop) => {
			if offset == 0 {
				state.all_descendants_future(tree, siblings[1])
			} else {
				state.all_descendants_closed(tree, siblings[0])
			}
		},
		None => false,
	}
}

/// Completion. The node must be `Open` (asserted) with a fully closed
/// subtree; the sibling clauses mirror activation, with Xor demanding every
/// *other* alternative closed.
pub fn can_open_to_closed(tree: &ProcessTree, node: NodeIdx, state: &TreeState) -> bool {
	assert!(state.is_open(node));

	if !tree
		.children(node)
		.iter()
		.all(|&child| state.all_descendants_closed(tree, child))
	{
		return false;
	}

	let Some(parent): Option<NodeIdx> = tree.parent(node) else {
		return true;
	};

	if !state.is_open(parent) {
		return false;
	}

	let siblings: &[NodeIdx] = tree.children(parent);
	let offset: usize = tree.child_offset(node).unwrap();

	match tree.operator(parent) {
		Some(Operator::Parallel) => true,
		Some(Operator::Sequence) => {
			siblings[..offset]
				.iter()
				.all(|&sibling| state.all_descendants_closed(tree, sibling))
				&& siblings[offset + 1..]
					.iter()
					.all(|&sibling| state.all_descendants_future(tree, sibling))
		},
		Some(Operator::ReverseSequence) => {
			siblings[..offset]
				.iter()
				.all(|&sibling| state.all_descendants_future(tree, sibling))
				&& siblings[offset + 1..]
					.iter()
					.all(|&sibling| state.all_descendants_closed(tree, sibling))
		},
		Some(Operator::Xor) => siblings
			.iter()
			.enumerate()
			.all(|(i, &sibling)| i == offset || state.all_descendants_closed(tree, sibling)),
		Some(Operator::Loop) => {
			if offset == 0 {
				state.all_descendants_closed(tree, siblings[1])
			} else {
				state.all_descendants_future(tree, siblings[0])
			}
		},
		None => false,
	}
}

/// Skip. Decided at the nearest open ancestor: while the parent is not open
/// the question is delegated upward, so a skippable subtree yields a skip per
/// node inside it.
pub fn can_future_to_closed(tree: &ProcessTree, node: NodeIdx, state: &TreeState) -> bool {
	if !state.is_future(node) {
		return false;
	}

	let Some(parent): Option<NodeIdx> = tree.parent(node) else {
		return false;
	};

	if !state.is_open(parent) {
		return can_future_to_closed(tree, parent, state);
	}

	let siblings: &[NodeIdx] = tree.children(parent);
	let offset: usize = tree.child_offset(node).unwrap();

	match tree.operator(parent) {
		Some(Operator::Xor) => siblings
			.iter()
			.enumerate()
			.any(|(i, &sibling)| i != offset && state.is_open(sibling)),
		// The redo path may be skipped only while the iteration proper runs.
		Some(Operator::Loop) if offset == 1 => state.is_open(siblings[0]),
		_ => false,
	}
}

/// Re-arming, the defining move of Loop; delegated upward like skips.
pub fn can_closed_to_future(tree: &ProcessTree, node: NodeIdx, state: &TreeState) -> bool {
	if !state.is_closed(node) {
		return false;
	}

	let Some(parent): Option<NodeIdx> = tree.parent(node) else {
		return false;
	};

	if !state.is_open(parent) {
		return can_closed_to_future(tree, parent, state);
	}

	let siblings: &[NodeIdx] = tree.children(parent);
	let offset: usize = tree.child_offset(node).unwrap();

	match tree.operator(parent) {
		Some(Operator::Loop) => {
			if offset == 0 {
				state.is_open(siblings[1])
			} else {
				!state.is_open(siblings[0])
			}
		},
		_ => false,
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::tree::TreeExpr;

	fn tree(text: &str) -> ProcessTree {
		ProcessTree::from_text(text).unwrap()
	}

	fn state(text: &str) -> TreeState {
		TreeState::from_text(text).unwrap()
	}

	fn sorted(mut transitions: Vec<Transition>) -> Vec<Transition> {
		transitions.sort();
		transitions
	}

	fn node(tree: &ProcessTree, position: usize) -> NodeIdx {
		tree.positions().nth(position).unwrap()
	}

	#[test]
	fn invert_pairs_the_four_kinds() {
		let t: ProcessTree = tree("'a'");
		let root: NodeIdx = t.root();
		assert_eq!(Transition::future_to_open(root).invert(), Transition::open_to_closed(root));
		assert_eq!(Transition::open_to_closed(root).invert(), Transition::future_to_open(root));
		// Skip and re-arm are their own time-reversals.
		assert_eq!(
			Transition::future_to_closed(root).invert(),
			Transition::future_to_closed(root)
		);
		assert_eq!(
			Transition::closed_to_future(root).invert(),
			Transition::closed_to_future(root)
		);
		// Inverting twice is the identity on every kind.
		for transition in [
			Transition::future_to_open(root),
			Transition::future_to_closed(root),
			Transition::open_to_closed(root),
			Transition::closed_to_future(root),
		] {
			assert_eq!(transition.invert().invert(), transition);
		}
	}

	#[test]
	fn initial_state_only_activates_the_root() {
		for text in ["'a'", "->('a','b')", "X('a','b')", "+('a','b')", "*('a','b')"] {
			let t: ProcessTree = tree(text);
			let transitions: Vec<Transition> = valid_transitions(&t, &TreeState::initial(&t));
			assert_eq!(transitions, vec![Transition::future_to_open(t.root())], "{text}");
		}
	}

	#[test]
	fn sequence_scheduling() {
		// 0 ->, 1 'a', 2 'b'
		let t: ProcessTree = tree("->('a','b')");
		let a: NodeIdx = node(&t, 1);
		let b: NodeIdx = node(&t, 2);

		assert_eq!(
			valid_transitions(&t, &state("off")),
			vec![Transition::future_to_open(a)]
		);
		// b waits until a's subtree is closed.
		assert_eq!(
			valid_transitions(&t, &state("oof")),
			vec![Transition::open_to_closed(a)]
		);
		assert_eq!(
			valid_transitions(&t, &state("ocf")),
			vec![Transition::future_to_open(b)]
		);
		assert_eq!(
			valid_transitions(&t, &state("occ")),
			vec![Transition::open_to_closed(t.root())]
		);
	}

	#[test]
	fn reverse_sequence_schedules_right_to_left() {
		// 0 <-, 1 'a', 2 'b'
		let t: ProcessTree = tree("<-('a','b')");
		let a: NodeIdx = node(&t, 1);
		let b: NodeIdx = node(&t, 2);

		assert_eq!(
			valid_transitions(&t, &state("off")),
			vec![Transition::future_to_open(b)]
		);
		assert_eq!(
			valid_transitions(&t, &state("ofc")),
			vec![Transition::future_to_open(a)]
		);
	}

	#[test]
	fn parallel_interleaves() {
		let t: ProcessTree = tree("+('a','b')");
		let a: NodeIdx = node(&t, 1);
		let b: NodeIdx = node(&t, 2);

		assert_eq!(
			sorted(valid_transitions(&t, &state("off"))),
			sorted(vec![Transition::future_to_open(a), Transition::future_to_open(b)])
		);
		assert_eq!(
			sorted(valid_transitions(&t, &state("oof"))),
			sorted(vec![Transition::open_to_closed(a), Transition::future_to_open(b)])
		);
	}

	#[test]
	fn xor_chooses_then_skips() {
		let t: ProcessTree = tree("X('a','b')");
		let a: NodeIdx = node(&t, 1);
		let b: NodeIdx = node(&t, 2);

		// Before a choice both alternatives may activate, neither may skip.
		assert_eq!(
			sorted(valid_transitions(&t, &state("off"))),
			sorted(vec![Transition::future_to_open(a), Transition::future_to_open(b)])
		);
		// Once a is running, b can only be skipped.
		assert_eq!(
			valid_transitions(&t, &state("oof")),
			vec![Transition::future_to_closed(b)]
		);
		// a cannot close until b's subtree is closed.
		assert!(!can_open_to_closed(&t, a, &state("oof")));
		assert!(can_open_to_closed(&t, a, &state("ooc")));
	}

	#[test]
	fn loop_skips_rearms_and_iterates() {
		// 0 *, 1 'a' (do), 2 'b' (redo)
		let t: ProcessTree = tree("*('a','b')");
		let a: NodeIdx = node(&t, 1);
		let b: NodeIdx = node(&t, 2);

		// While the do child runs, the redo may be skipped but not started.
		assert_eq!(
			valid_transitions(&t, &state("oof")),
			vec![Transition::future_to_closed(b)]
		);
		// With the do child closed, the redo may start (another iteration).
		assert_eq!(
			valid_transitions(&t, &state("ocf")),
			vec![Transition::future_to_open(b)]
		);
		// An open redo re-arms the do child; a waiting one does not.
		assert!(can_closed_to_future(&t, a, &state("oco")));
		assert!(!can_closed_to_future(&t, a, &state("ocf")));
		// A closed redo re-arms itself only while the do child is not open.
		assert!(can_closed_to_future(&t, b, &state("occ")));
		assert!(!can_closed_to_future(&t, b, &state("ooc")));
	}

	#[test]
	fn skip_delegates_through_unopened_ancestors() {
		// 0 X, 1 'a', 2 ->, 3 'b', 4 'c'
		let t: ProcessTree = tree("X('a',->('b','c'))");
		let seq: NodeIdx = node(&t, 2);
		let b: NodeIdx = node(&t, 3);
		let c: NodeIdx = node(&t, 4);

		// With 'a' chosen, the whole sequence subtree becomes skippable,
		// one node at a time.
		assert_eq!(
			sorted(valid_transitions(&t, &state("oofff"))),
			sorted(vec![
				Transition::future_to_closed(seq),
				Transition::future_to_closed(b),
				Transition::future_to_closed(c),
			])
		);
	}

	#[test]
	fn completion_preempts_descendants() {
		let t: ProcessTree = tree("*('a','b')");
		// At occ the loop may close; the redo child's re-arm is pruned by the
		// completion early-exit.
		assert_eq!(
			valid_transitions(&t, &state("occ")),
			vec![Transition::open_to_closed(t.root())]
		);
	}

	#[test]
	fn apply_checks_endpoint_and_enablement() {
		let t: ProcessTree = tree("->('a','b')");
		let a: NodeIdx = node(&t, 1);
		let b: NodeIdx = node(&t, 2);
		let initial: TreeState = TreeState::initial(&t);

		assert_eq!(
			Transition::open_to_closed(a).apply(&t, &initial),
			Err(IllegalTransition::StateMismatch {
				expected: NodeState::Open,
				actual: NodeState::Future,
			})
		);
		// Right endpoint, wrong moment: a before the root opens.
		assert_eq!(
			Transition::future_to_open(a).apply(&t, &initial),
			Err(IllegalTransition::NotEnabled)
		);
		// b before a under a sequence.
		assert_eq!(
			Transition::future_to_open(b).apply(&t, &state("off")),
			Err(IllegalTransition::NotEnabled)
		);

		let opened: TreeState = Transition::future_to_open(t.root()).apply(&t, &initial).unwrap();
		assert_eq!(opened.to_string(), "off");
	}

	#[test]
	fn loop_arity_is_rejected_in_expr_form() {
		let expr: TreeExpr = TreeExpr::Operator(
			crate::tree::Operator::Loop,
			vec![
				TreeExpr::Leaf("a".to_owned()),
				TreeExpr::Leaf("b".to_owned()),
				TreeExpr::Leaf("c".to_owned()),
			],
		);
		assert!(ProcessTree::from_expr(&expr).is_err());
	}
}
