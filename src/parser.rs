use nom::Err as NomErr;
use nom::IResult;
use nom::Parser;
use nom::error::ErrorKind as NomErrorKind;
use nom::error::ParseError;

use crate::tree::Operator;
use crate::tree::ProcessTree;
use crate::tree::TreeExpr;
use crate::tree::TreeShapeError;

/// Parser for the prefix tree notation, e.g. `->(*('a','b'),X('c','d'))`.
///
/// Grammar: `Tree := Operator "(" Tree ("," Tree)+ ")" | "'" Label "'"` with
/// operator literals `->`, `<-`, `+`, `X`, `*`. Labels run to the next quote
/// and may be empty. Whitespace is tolerated between tokens.
pub fn parse_tree(text: &str) -> Result<ProcessTree, TreeTextError<'_>> {
	match parse_to_end(text) {
		Ok((remaining, expr)) => {
			assert_eq!(remaining, "");
			match ProcessTree::from_expr(&expr) {
				Ok(tree) => Ok(tree),
				Err(shape) => Err(TreeTextError {
					consumed: text,
					remaining: "",
					kind: TreeTextErrorKind::from_shape(shape),
				}),
			}
		},
		Err(NomErr::Incomplete(_)) => {
			panic!("We shouldn't be using anything that can return this!");
		},
		Err(NomErr::Error(err) | NomErr::Failure(err)) => {
			let consumed: &str = text.strip_suffix(err.input).unwrap();
			Err(TreeTextError {
				consumed,
				remaining: err.input,
				kind: err.kind,
			})
		},
	}
}

#[derive(Debug)]
pub struct TreeTextError<'a> {
	consumed: &'a str,
	remaining: &'a str,
	kind: TreeTextErrorKind,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TreeTextErrorKind {
	/// Neither an operator nor a quoted label starts here.
	ExpectedTree,
	/// An operator literal was not followed by its child list.
	ExpectedChar(char),
	/// Missing the closing delimiter for the following pair.
	MissingClose(char, char),
	/// A complete tree was parsed but input remains.
	TrailingInput,
	/// Loops take exactly a do child and a redo child.
	LoopArity { children: usize },
	/// Every other operator takes at least two children.
	TooFewChildren { operator: Operator, children: usize },
	/// Swallowed by the `ExpectedTree` diagnostic before surfacing;
	/// exists because it models what the operator alternative saw.
	ExpectedOperator,
	/// An error from nom; shouldn't happen, but used to implement [`nom::error::ParseError`].
	Nom(NomErrorKind),
}

// Accessors
impl<'a> TreeTextError<'a> {
	pub fn consumed(&self) -> &'a str {
		self.consumed
	}

	pub fn remaining(&self) -> &'a str {
		self.remaining
	}

	pub fn kind(&self) -> TreeTextErrorKind {
		self.kind
	}
}

#[derive(Debug)]
struct TreeParsingError<'a> {
	pub input: &'a str,
	pub kind: TreeTextErrorKind,
}

impl<'a> ParseError<&'a str> for TreeParsingError<'a> {
	fn from_error_kind(input: &'a str, nom: NomErrorKind) -> Self {
		Self {
			input,
			kind: TreeTextErrorKind::Nom(nom),
		}
	}

	fn append(_input: &'a str, _kind: NomErrorKind, other: Self) -> Self {
		other
	}
}

impl<'a> TreeParsingError<'a> {
	fn new(input: &'a str, kind: TreeTextErrorKind) -> Self {
		Self { input, kind }
	}
}

impl TreeTextErrorKind {
	fn from_shape(shape: TreeShapeError) -> Self {
		match shape {
			TreeShapeError::LoopArity { children } => Self::LoopArity { children },
			TreeShapeError::TooFewChildren { operator, children } => Self::TooFewChildren { operator, children },
		}
	}

	fn error(self, input: &str) -> NomErr<TreeParsingError<'_>> {
		NomErr::Error(TreeParsingError::new(input, self))
	}

	fn diagnostic<'a, T>(self) -> impl Fn(&'a str) -> ParsingResult<'a, T> {
		move |input| Err(self.error(input))
	}
}

type ParsingResult<'a, T> = IResult<&'a str, T, TreeParsingError<'a>>;

// ==================================

fn parse_to_end(input: &str) -> ParsingResult<'_, TreeExpr> {
	let (input, expr): (&str, TreeExpr) = parse_subtree(input)?;

	let input: &str = skip_whitespace(input);
	if !input.is_empty() {
		return Err(TreeTextErrorKind::TrailingInput.error(input));
	}

	Ok((input, expr))
}

fn parse_subtree(input: &str) -> ParsingResult<'_, TreeExpr> {
	use nom::branch::alt;

	let input: &str = skip_whitespace(input);

	alt((
		parse_leaf,
		parse_operator_subtree,
		TreeTextErrorKind::ExpectedTree.diagnostic(),
	))
	.parse(input)
}

fn parse_leaf(input: &str) -> ParsingResult<'_, TreeExpr> {
	let (input, _): (&str, char) = parse_char::<'\''>(input)?;

	// A label is everything up to the closing quote, quotes not included.
	match input.find('\'') {
		Some(end) => Ok((
			&input[end + '\''.len_utf8()..],
			TreeExpr::Leaf(input[..end].to_owned()),
		)),
		None => Err(NomErr::Failure(TreeParsingError::new(
			input,
			TreeTextErrorKind::MissingClose('\'', '\''),
		))),
	}
}

fn parse_operator_subtree(original_input: &str) -> ParsingResult<'_, TreeExpr> {
	use nom::combinator::cut;
	use nom::combinator::opt;

	let (input, operator): (&str, Operator) = parse_operator(original_input)?;

	// Cut: After an operator literal, the child list must follow.
	let input: &str = skip_whitespace(input);
	let (mut input, _): (&str, char) =
		cut(parse_char::<'('>.or(TreeTextErrorKind::ExpectedChar('(').diagnostic())).parse(input)?;

	let first: TreeExpr;
	(input, first) = cut(parse_subtree).parse(input)?;

	let mut children: Vec<TreeExpr> = vec![first];

	loop {
		let maybe_comma: Option<char>;
		(input, maybe_comma) = opt(parse_char::<','>).parse(skip_whitespace(input))?;
		if maybe_comma.is_none() {
			break;
		}

		// Cut: After seeing a ',', we necessarily are expecting another subtree.
		let child: TreeExpr;
		(input, child) = cut(parse_subtree).parse(input)?;
		children.push(child);
	}

	let input: &str = skip_whitespace(input);
	let (input, _): (&str, char) =
		cut(parse_char::<')'>.or(TreeTextErrorKind::MissingClose('(', ')').diagnostic())).parse(input)?;

	Ok((input, TreeExpr::Operator(operator, children)))
}

fn parse_operator(input: &str) -> ParsingResult<'_, Operator> {
	for operator in Operator::ALL {
		if let Some(remaining) = input.strip_prefix(operator.symbol()) {
			return Ok((remaining, operator));
		}
	}

	Err(TreeTextErrorKind::ExpectedOperator.error(input))
}

fn parse_char<const CHAR: char>(input: &str) -> ParsingResult<'_, char> {
	let mut chars: std::str::Chars<'_> = input.chars();

	if let Some(ch) = chars.next() {
		if ch == CHAR {
			return Ok((chars.as_str(), ch));
		}
	}

	Err(TreeTextErrorKind::ExpectedChar(CHAR).error(input))
}

fn skip_whitespace(input: &str) -> &str {
	input.trim_start()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trip() {
		for text in [
			"'a'",
			"->('a','b')",
			"X('a','b')",
			"+('a','b','c')",
			"*('a','b')",
			"->(*('a','b'),X('c','d'))",
			"<-('x',->('y','z'))",
			"X('','with space')",
		] {
			let tree: ProcessTree = parse_tree(text).unwrap();
			assert_eq!(tree.to_string(), text);
			assert_eq!(parse_tree(&tree.to_string()).unwrap(), tree);
		}
	}

	#[test]
	fn whitespace_tolerated() {
		let tree: ProcessTree = parse_tree("->(* ( 'a', 'b' ), X('c', 'd'))").unwrap();
		assert_eq!(tree.to_string(), "->(*('a','b'),X('c','d'))");
		assert_eq!(parse_tree("  'a'  ").unwrap().to_string(), "'a'");
	}

	#[test]
	fn preorder_positions_from_text() {
		let tree: ProcessTree = parse_tree("->(*('a','b'),X('c','d'))").unwrap();
		let labels: Vec<Option<&str>> = tree.positions().map(|node| tree.label(node)).collect::<Vec<_>>();
		assert_eq!(
			labels,
			vec![None, None, Some("a"), Some("b"), None, Some("c"), Some("d")]
		);
	}

	#[test]
	fn malformed_input() {
		assert_eq!(parse_tree("").unwrap_err().kind(), TreeTextErrorKind::ExpectedTree);
		assert_eq!(parse_tree("a").unwrap_err().kind(), TreeTextErrorKind::ExpectedTree);
		assert_eq!(
			parse_tree("'a").unwrap_err().kind(),
			TreeTextErrorKind::MissingClose('\'', '\'')
		);
		assert_eq!(
			parse_tree("->('a','b'").unwrap_err().kind(),
			TreeTextErrorKind::MissingClose('(', ')')
		);
		assert_eq!(
			parse_tree("->'a'").unwrap_err().kind(),
			TreeTextErrorKind::ExpectedChar('(')
		);
		assert_eq!(
			parse_tree("->('a',)").unwrap_err().kind(),
			TreeTextErrorKind::ExpectedTree
		);
		assert_eq!(
			parse_tree("'a' trailing").unwrap_err().kind(),
			TreeTextErrorKind::TrailingInput
		);
	}

	#[test]
	fn arity_violations() {
		assert_eq!(
			parse_tree("X('a')").unwrap_err().kind(),
			TreeTextErrorKind::TooFewChildren {
				operator: Operator::Xor,
				children: 1,
			}
		);
		assert_eq!(
			parse_tree("*('a','b','c')").unwrap_err().kind(),
			TreeTextErrorKind::LoopArity { children: 3 }
		);
	}

	#[test]
	fn error_spans() {
		let err: TreeTextError<'_> = parse_tree("->('a',#)").unwrap_err();
		assert_eq!(err.consumed(), "->('a',");
		assert_eq!(err.remaining(), "#)");
	}
}
