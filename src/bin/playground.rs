#![allow(unused)]

use pt_pathfinder::parser::parse_tree;
use pt_pathfinder::search::Pathfinder;
use pt_pathfinder::search::SearchResult;
use pt_pathfinder::search::shortest_path;
use pt_pathfinder::tree::ProcessTree;

fn main() {
	// let tree: ProcessTree = parse_tree("X('a','b')").unwrap();
	// let tree: ProcessTree = parse_tree("+(->('a','b'),X('c','d'))").unwrap();
	let tree: ProcessTree = parse_tree("->(*('a','b'),X('c','d'))").unwrap();

	println!("tree: {tree}");

	let result: SearchResult = shortest_path(&tree).unwrap();

	println!("cost: {}", result.cost);
	println!("trace: {:?}", result.trace(&tree));
	for transition in result.firing_sequence.iter() {
		println!("  {transition}");
	}
	println!("visited states: {}", result.visited_states);

	// let unidirectional: SearchResult = Pathfinder::new(&tree).run(true).unwrap();
	// println!("unidirectional cost: {}", unidirectional.cost);
}
