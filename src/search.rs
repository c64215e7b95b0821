use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::collections::HashSet;

use crate::semantics;
use crate::semantics::Transition;
use crate::tree::NodeIdx;
use crate::tree::ProcessTree;
use crate::tree_state::TreeState;

/// Bidirectional Dijkstra over a tree's reachable state graph.
///
/// The forward frontier walks the tree from all-`Future`; the backward
/// frontier walks the mirror tree, also from all-`Future`, which under state
/// inversion is a time-reversed walk of the original from all-`Closed`. The
/// frontiers meet when a state on one side inverts to a state known on the
/// other.
#[derive(Debug)]
pub struct Pathfinder<'tree> {
	tree: &'tree ProcessTree,
	reverse_tree: ProcessTree,
	arena: Vec<SearchState>,
	forward: Frontier,
	backward: Frontier,
	meeting: MeetingInfo,
	statistics: SearchStatistics,
}

/// One node of the search DAG. Records stay in the arena for the whole
/// search; parent indices form two DAGs rooted at the two initial states.
#[derive(Debug)]
pub struct SearchState {
	pub dist: u64,
	pub depth: usize,
	pub tree_state: TreeState,
	pub from_start: bool,
	pub transition: Option<Transition>,
	/// Everything enabled at the producing expansion; kept for diagnostics.
	pub enabled: Vec<Transition>,
	pub executed_leaf: Option<NodeIdx>,
	pub parent: Option<SearchIdx>,
}

#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SearchIdx(usize);

#[derive(Debug, Default)]
struct Frontier {
	open_set: BinaryHeap<Reverse<HeapEntry>>,
	/// Best-known record per tree state. Costs are read off the records,
	/// never stored here, so visiting needs no sentinel in this table.
	distances: HashMap<TreeState, SearchIdx>,
	visited: HashSet<TreeState>,
}

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
struct HeapEntry {
	dist: u64,
	idx: SearchIdx,
}

#[derive(Debug)]
struct MeetingInfo {
	best_cost: u64,
	start_node: Option<SearchIdx>,
	end_node: Option<SearchIdx>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SearchStatistics {
	pub visited_states: usize,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
	pub cost: u64,
	pub firing_sequence: Vec<Transition>,
	pub leaf_sequence: Vec<NodeIdx>,
	pub visited_states: usize,
}

/// Both frontiers drained without ever meeting; fatal for the call.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SearchError {
	NoPathFound,
}

/// Lowest-cost firing sequence from all-`Future` to all-`Closed`.
pub fn shortest_path(tree: &ProcessTree) -> Result<SearchResult, SearchError> {
	Pathfinder::new(tree).run(false)
}

impl<'tree> Pathfinder<'tree> {
	pub fn new(tree: &'tree ProcessTree) -> Self {
		let reverse_tree: ProcessTree = tree.reverse();
		let mut pathfinder: Self = Self {
			tree,
			reverse_tree,
			arena: Vec::new(),
			forward: Frontier::default(),
			backward: Frontier::default(),
			meeting: MeetingInfo {
				best_cost: u64::MAX,
				start_node: None,
				end_node: None,
			},
			statistics: SearchStatistics::default(),
		};
		pathfinder.seed(true);
		pathfinder.seed(false);
		pathfinder
	}

	fn seed(&mut self, from_start: bool) {
		let tree_state: TreeState = if from_start {
			TreeState::initial(self.tree)
		} else {
			TreeState::initial(&self.reverse_tree)
		};

		let idx: SearchIdx = SearchIdx(self.arena.len());
		self.arena.push(SearchState {
			dist: 0,
			depth: 0,
			tree_state: tree_state.clone(),
			from_start,
			transition: None,
			enabled: Vec::new(),
			executed_leaf: None,
			parent: None,
		});

		let frontier: &mut Frontier = if from_start { &mut self.forward } else { &mut self.backward };
		frontier.distances.insert(tree_state, idx);
		frontier.open_set.push(Reverse(HeapEntry { dist: 0, idx }));
	}

	/// Runs the search to completion. `unidirectional` locks expansion to the
	/// forward frontier (plain Dijkstra; the backward frontier still holds its
	/// seeded initial state for the meeting test).
	pub fn run(mut self, unidirectional: bool) -> Result<SearchResult, SearchError> {
		// Prime both frontiers before alternating.
		self.expand(true);
		self.expand(false);

		let mut expand_forward: bool = true;
		let lock_direction: bool = unidirectional;

		while !self.forward.open_set.is_empty() || !self.backward.open_set.is_empty() {
			let front_dist: u64 = self
				.forward
				.open_set
				.peek()
				.map(|&Reverse(entry)| entry.dist)
				.unwrap_or(0);
			let back_dist: u64 = self
				.backward
				.open_set
				.peek()
				.map(|&Reverse(entry)| entry.dist)
				.unwrap_or(0);

			// Eager exit on the first recorded meeting. The cutoff below is
			// the one the optimality argument rests on; this one merely fires
			// earlier under unit weights and alternating expansion.
			if self.meeting.start_node.is_some() {
				return Ok(self.construct_result());
			}

			if front_dist + back_dist >= self.meeting.best_cost {
				return Ok(self.construct_result());
			}

			self.expand(expand_forward);
			expand_forward = !expand_forward || lock_direction;
		}

		Err(SearchError::NoPathFound)
	}

	fn expand(&mut self, expand_forward: bool) {
		let Self {
			tree,
			reverse_tree,
			arena,
			forward,
			backward,
			meeting,
			statistics,
		} = self;

		let tree: &ProcessTree = if expand_forward { *tree } else { &*reverse_tree };
		let (frontier, opposite): (&mut Frontier, &Frontier) = if expand_forward {
			(forward, backward)
		} else {
			(backward, forward)
		};

		let Some(Reverse(entry)) = frontier.open_set.pop() else {
			return;
		};

		let current: SearchIdx = entry.idx;
		let current_state: TreeState = arena[current.0].tree_state.clone();

		// A state improved after this entry was pushed gets popped twice;
		// the second pop is stale.
		if !frontier.visited.insert(current_state.clone()) {
			return;
		}

		statistics.visited_states += 1;

		let enabled: Vec<Transition> = semantics::valid_transitions(tree, &current_state);
		debug!(
			"expand {} {current_state} dist {} with {} enabled",
			if expand_forward { "forward" } else { "backward" },
			entry.dist,
			enabled.len()
		);

		let current_dist: u64 = arena[current.0].dist;
		let current_depth: usize = arena[current.0].depth;

		for &transition in enabled.iter() {
			let new_dist: u64 = current_dist + 1;

			// A leaf really executes on an activation seen forward or a
			// completion seen backward; everything else is bookkeeping and
			// projects to no activity.
			let executed_leaf: Option<NodeIdx> = if tree.is_leaf(transition.node)
				&& ((expand_forward && transition.is_future_to_open())
					|| (!expand_forward && transition.is_open_to_closed()))
			{
				Some(transition.node)
			} else {
				None
			};

			let successor_state: TreeState = current_state.update(transition.node, transition.to_state);

			if let Some(&known) = frontier.distances.get(&successor_state) {
				if arena[known.0].dist <= new_dist {
					continue;
				}
			}

			let successor: SearchIdx = SearchIdx(arena.len());
			arena.push(SearchState {
				dist: new_dist,
				depth: current_depth + 1,
				tree_state: successor_state.clone(),
				from_start: expand_forward,
				transition: Some(transition),
				enabled: enabled.clone(),
				executed_leaf,
				parent: Some(current),
			});

			frontier.distances.insert(successor_state.clone(), successor);
			frontier.open_set.push(Reverse(HeapEntry {
				dist: new_dist,
				idx: successor,
			}));

			// Meeting test: does this state, inverted, already exist on the
			// other side?
			let inverse_state: TreeState = successor_state.invert();
			if let Some(&candidate) = opposite.distances.get(&inverse_state) {
				let total: u64 = arena[candidate.0].dist + new_dist;
				if total < meeting.best_cost {
					meeting.best_cost = total;
					let (start_node, end_node): (SearchIdx, SearchIdx) = if expand_forward {
						(successor, candidate)
					} else {
						(candidate, successor)
					};
					meeting.start_node = Some(start_node);
					meeting.end_node = Some(end_node);
				}
			}
		}
	}

	fn construct_result(&self) -> SearchResult {
		let start_node: SearchIdx = self.meeting.start_node.unwrap();
		let end_node: SearchIdx = self.meeting.end_node.unwrap();

		// Forward segment root-first; backward segment meeting-first, which
		// reads time-forward once each transition is inverted.
		let mut forward_chain: Vec<SearchIdx> = self.chain(start_node);
		forward_chain.reverse();
		let backward_chain: Vec<SearchIdx> = self.chain(end_node);

		let mut firing_sequence: Vec<Transition> = Vec::new();
		let mut leaf_sequence: Vec<NodeIdx> = Vec::new();

		for &idx in forward_chain.iter() {
			if let Some(transition) = self[idx].transition {
				firing_sequence.push(transition);
			}
			if let Some(leaf) = self[idx].executed_leaf {
				leaf_sequence.push(leaf);
			}
		}

		for &idx in backward_chain.iter() {
			if let Some(transition) = self[idx].transition {
				firing_sequence.push(transition.invert());
			}
			if let Some(leaf) = self[idx].executed_leaf {
				leaf_sequence.push(leaf);
			}
		}

		SearchResult {
			cost: self[start_node].dist + self[end_node].dist,
			firing_sequence,
			leaf_sequence,
			visited_states: self.statistics.visited_states,
		}
	}

	fn chain(&self, from: SearchIdx) -> Vec<SearchIdx> {
		let mut chain: Vec<SearchIdx> = Vec::new();
		let mut cursor: Option<SearchIdx> = Some(from);
		while let Some(idx) = cursor {
			chain.push(idx);
			cursor = self[idx].parent;
		}
		chain
	}
}

impl std::ops::Index<SearchIdx> for Pathfinder<'_> {
	type Output = SearchState;

	fn index(&self, i: SearchIdx) -> &Self::Output {
		&self.arena[i.0]
	}
}

impl SearchResult {
	/// Leaf labels in execution order.
	pub fn trace<'tree>(&self, tree: &'tree ProcessTree) -> Vec<&'tree str> {
		self.leaf_sequence
			.iter()
			.filter_map(|&leaf| tree.label(leaf))
			.collect::<Vec<_>>()
	}
}
