//! Route pattern parsing and matching.
//!
//! Pattern syntax:
//!
//! - `/shop` - literal segment
//! - `/product/:id` - captures one segment (no `/`) as `id`
//! - `/files/*path` - captures the rest of the path (including `/`) as `path`;
//!   a bare `*` matches the rest without capturing it
//!
//! Patterns start with `/`. A trailing slash is optional on both sides: the pattern
//! `/shop/product/:id/` matches `/shop/product/42` and `/shop/product/42/`.

use std::collections::BTreeMap;

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_while1},
	character::complete::{alpha1, alphanumeric1},
	combinator::{map, opt, recognize},
	multi::{many0, many0_count},
	sequence::{pair, preceded},
};

use crate::error::RouterError;

/// Maximum allowed length of a pattern in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum size of a compiled pattern regex in bytes.
const MAX_REGEX_SIZE: usize = 1 << 20;

/// One `/`-separated piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	/// Text matched exactly
	Literal(String),
	/// `:name`
	Param(String),
	/// `*name` or `*`
	Wildcard(Option<String>),
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
	pattern: String,
	segments: Vec<Segment>,
	trailing_slash: bool,
	regex: regex::Regex,
}

fn identifier(input: &str) -> IResult<&str, &str> {
	recognize(pair(
		alt((alpha1, tag("_"))),
		many0_count(alt((alphanumeric1, tag("_")))),
	))
	.parse(input)
}

fn param(input: &str) -> IResult<&str, Segment> {
	map(preceded(tag(":"), identifier), |name| {
		Segment::Param(name.to_string())
	})
	.parse(input)
}

fn wildcard(input: &str) -> IResult<&str, Segment> {
	map(preceded(tag("*"), opt(identifier)), |name| {
		Segment::Wildcard(name.map(str::to_string))
	})
	.parse(input)
}

fn literal(input: &str) -> IResult<&str, Segment> {
	map(
		take_while1(|c: char| c != '/' && c != ':' && c != '*'),
		|text: &str| Segment::Literal(text.to_string()),
	)
	.parse(input)
}

/// `/`-prefixed pieces; `None` marks an empty piece (`//` or a trailing `/`).
fn pieces(input: &str) -> IResult<&str, Vec<Option<Segment>>> {
	many0(preceded(tag("/"), opt(alt((param, wildcard, literal))))).parse(input)
}

impl RoutePattern {
	/// Parses and compiles `pattern`.
	pub fn parse(pattern: &str) -> Result<Self, RouterError> {
		let invalid = |message: String| RouterError::InvalidPattern {
			pattern: pattern.to_string(),
			message,
		};
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(invalid(format!(
				"pattern exceeds {MAX_PATTERN_LENGTH} bytes"
			)));
		}
		if !pattern.starts_with('/') {
			return Err(invalid("pattern must start with `/`".to_string()));
		}

		let (remaining, pieces) = match pieces(pattern) {
			Ok(parsed) => parsed,
			Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
				let position = pattern.len() - e.input.len();
				return Err(invalid(format!("parse error at position {position}")));
			}
			Err(nom::Err::Incomplete(_)) => {
				return Err(invalid("incomplete pattern".to_string()));
			}
		};
		if !remaining.is_empty() {
			let position = pattern.len() - remaining.len();
			return Err(invalid(format!(
				"unexpected `{remaining}` at position {position}"
			)));
		}

		let trailing_slash = pattern.len() > 1 && pattern.ends_with('/');
		let mut segments = Vec::new();
		for (index, piece) in pieces.iter().enumerate() {
			match piece {
				Some(segment) => segments.push(segment.clone()),
				None if index + 1 == pieces.len() => {}
				None => return Err(invalid("empty segment".to_string())),
			}
		}

		let mut names: Vec<&str> = Vec::new();
		for (index, segment) in segments.iter().enumerate() {
			let name = match segment {
				Segment::Literal(_) => continue,
				Segment::Wildcard(_) if index + 1 != segments.len() => {
					return Err(invalid("`*` must be the last segment".to_string()));
				}
				Segment::Param(name) | Segment::Wildcard(Some(name)) => name.as_str(),
				Segment::Wildcard(None) => continue,
			};
			if names.contains(&name) {
				return Err(invalid(format!("parameter `{name}` appears twice")));
			}
			names.push(name);
		}

		let regex = regex::RegexBuilder::new(&compile(&segments))
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| invalid(e.to_string()))?;

		Ok(Self {
			pattern: pattern.to_string(),
			segments,
			trailing_slash,
			regex,
		})
	}

	/// The pattern as written.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Parsed segments.
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Names of the captured parameters, in pattern order.
	pub fn param_names(&self) -> Vec<&str> {
		self.segments
			.iter()
			.filter_map(|segment| match segment {
				Segment::Param(name) | Segment::Wildcard(Some(name)) => Some(name.as_str()),
				_ => None,
			})
			.collect()
	}

	/// Matches `path`, returning the percent-decoded parameters.
	pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
		let captures = self.regex.captures(path)?;
		Some(
			self.param_names()
				.into_iter()
				.filter_map(|name| {
					let raw = captures.name(name)?.as_str();
					let value = urlencoding::decode(raw)
						.map(|decoded| decoded.into_owned())
						.unwrap_or_else(|_| raw.to_string());
					Some((name.to_string(), value))
				})
				.collect(),
		)
	}

	/// Builds a path from parameters. Values are percent-encoded; a wildcard value
	/// keeps its `/` separators. An unnamed `*` expands to nothing.
	pub fn reverse(&self, params: &BTreeMap<String, String>) -> Result<String, RouterError> {
		let lookup = |name: &str| {
			params.get(name).ok_or_else(|| RouterError::MissingParam {
				pattern: self.pattern.clone(),
				param: name.to_string(),
			})
		};
		let mut path = String::new();
		for segment in &self.segments {
			match segment {
				Segment::Literal(text) => {
					path.push('/');
					path.push_str(text);
				}
				Segment::Param(name) => {
					path.push('/');
					path.push_str(&urlencoding::encode(lookup(name)?));
				}
				Segment::Wildcard(Some(name)) => {
					let value = lookup(name)?;
					let encoded: Vec<String> = value
						.split('/')
						.map(|part| urlencoding::encode(part).into_owned())
						.collect();
					path.push('/');
					path.push_str(&encoded.join("/"));
				}
				Segment::Wildcard(None) => {}
			}
		}
		if path.is_empty() || self.trailing_slash {
			path.push('/');
		}
		Ok(path)
	}
}

fn compile(segments: &[Segment]) -> String {
	let mut regex = String::from("^");
	for segment in segments {
		regex.push('/');
		match segment {
			Segment::Literal(text) => regex.push_str(&regex::escape(text)),
			Segment::Param(name) => regex.push_str(&format!("(?P<{name}>[^/]+)")),
			Segment::Wildcard(Some(name)) => regex.push_str(&format!("(?P<{name}>.*)")),
			Segment::Wildcard(None) => regex.push_str(".*"),
		}
	}
	regex.push_str("/?$");
	regex
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[rstest]
	fn test_parse_segments() {
		let pattern = RoutePattern::parse("/shop/product/:id/").unwrap();
		assert_eq!(
			pattern.segments(),
			&[
				Segment::Literal("shop".into()),
				Segment::Literal("product".into()),
				Segment::Param("id".into()),
			]
		);
		assert_eq!(pattern.param_names(), vec!["id"]);
	}

	#[rstest]
	#[case("/shop/product/:id/", "/shop/product/42/", Some(vec![("id", "42")]))]
	#[case("/shop/product/:id/", "/shop/product/42", Some(vec![("id", "42")]))]
	#[case("/shop/product/:id", "/shop/product/42/", Some(vec![("id", "42")]))]
	#[case("/shop/product/:id/", "/shop/product/", None)]
	#[case("/shop/product/:id/", "/shop/product/42/extra", None)]
	#[case("/", "/", Some(vec![]))]
	#[case("/", "", Some(vec![]))]
	#[case("/", "/shop", None)]
	#[case("/users/:user/posts/:post", "/users/ann/posts/7", Some(vec![("post", "7"), ("user", "ann")]))]
	#[case("/files/*path", "/files/a/b/c.txt", Some(vec![("path", "a/b/c.txt")]))]
	#[case("/files/*", "/files/a/b", Some(vec![]))]
	#[case("/search/:q", "/search/hello%20world", Some(vec![("q", "hello world")]))]
	#[case("/v1.0/:x", "/v1x0/y", None)]
	fn test_matches(
		#[case] pattern: &str,
		#[case] path: &str,
		#[case] expected: Option<Vec<(&str, &str)>>,
	) {
		let pattern = RoutePattern::parse(pattern).unwrap();
		assert_eq!(pattern.matches(path), expected.map(|pairs| params(&pairs)));
	}

	#[rstest]
	#[case("shop", "pattern must start with `/`")]
	#[case("/shop//cart", "empty segment")]
	#[case("/:id/:id", "parameter `id` appears twice")]
	#[case("/*rest/more", "`*` must be the last segment")]
	#[case("/:", "unexpected `:` at position 1")]
	#[case("/:1abc", "unexpected `:1abc` at position 1")]
	fn test_invalid_patterns(#[case] pattern: &str, #[case] message: &str) {
		match RoutePattern::parse(pattern).unwrap_err() {
			RouterError::InvalidPattern { message: got, .. } => assert_eq!(got, message),
			other => panic!("unexpected error {other:?}"),
		}
	}

	#[rstest]
	#[case("/shop/product/:id/", &[("id", "42")], "/shop/product/42/")]
	#[case("/shop/product/:id", &[("id", "a b")], "/shop/product/a%20b")]
	#[case("/files/*path", &[("path", "a/b c")], "/files/a/b%20c")]
	#[case("/", &[], "/")]
	fn test_reverse(#[case] pattern: &str, #[case] values: &[(&str, &str)], #[case] expected: &str) {
		let pattern = RoutePattern::parse(pattern).unwrap();
		assert_eq!(pattern.reverse(&params(values)).unwrap(), expected);
	}

	#[rstest]
	fn test_reverse_missing_param() {
		let pattern = RoutePattern::parse("/shop/product/:id/").unwrap();
		let err = pattern.reverse(&BTreeMap::new()).unwrap_err();
		assert!(matches!(err, RouterError::MissingParam { param, .. } if param == "id"));
	}
}
