//! Directive primitives: conditionals, keyed lists and raw markup.
//!
//! Directives produce hole values the reconciler treats specially:
//!
//! - [`when`] / [`when_else`] produce a [`Choice`]. Switching branches remounts the
//!   branch; staying on a branch patches it in place.
//! - [`each`] / [`each_keyed`] produce a [`KeyedList`]. Entries are matched by key
//!   across renders, so reordering moves existing nodes instead of recreating them.
//! - [`raw`] produces [`Raw`] markup, inserted verbatim.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::{html, directive::{each_keyed, when_else}};
//!
//! html!(
//!     "<ul>{}</ul>{}",
//!     each_keyed(todos.iter(), |t, _| t.id, |t, _| html!("<li>{}</li>", t.title)),
//!     when_else(todos.is_empty(), "Nothing to do", || html!("<p>{} left</p>", todos.len())),
//! )
//! ```

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use reinhardt_reactive::Value;
use thiserror::Error;

use crate::template::{HoleValue, TemplateResult};

/// Identity of a list entry across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	/// Positional identity (default, and fallback for duplicate keys)
	Position(usize),
	/// Integer key
	Int(i64),
	/// String key
	Str(Rc<str>),
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Position(i) => write!(f, "#{i}"),
			Key::Int(i) => write!(f, "{i}"),
			Key::Str(s) => write!(f, "{s:?}"),
		}
	}
}

macro_rules! impl_key_from_int {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Key {
				fn from(value: $ty) -> Self {
					Key::Int(value as i64)
				}
			}
		)*
	};
}

impl_key_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Key::Str(value.into())
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Key::Str(value.into())
	}
}

impl From<Rc<str>> for Key {
	fn from(value: Rc<str>) -> Self {
		Key::Str(value)
	}
}

impl From<Value> for Key {
	fn from(value: Value) -> Self {
		match value {
			Value::Int(i) => Key::Int(i),
			Value::Str(s) => Key::Str(s),
			other => Key::Str(other.to_display().into()),
		}
	}
}

/// Which branch of a conditional was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
	/// The condition held
	Then,
	/// The condition did not hold
	Else,
}

/// A conditional: the selected branch and its value.
#[derive(Debug, Clone)]
pub struct Choice {
	branch: Branch,
	value: Box<HoleValue>,
}

impl Choice {
	/// Selected branch.
	pub fn branch(&self) -> Branch {
		self.branch
	}

	/// Value of the selected branch.
	pub fn value(&self) -> &HoleValue {
		&self.value
	}

	pub(crate) fn into_parts(self) -> (Branch, HoleValue) {
		(self.branch, *self.value)
	}
}

/// Values usable as a conditional branch.
///
/// Closures are called only when their branch is selected.
pub trait IntoBranch {
	/// Produces the branch value.
	fn into_branch(self) -> HoleValue;
}

impl IntoBranch for HoleValue {
	fn into_branch(self) -> HoleValue {
		self
	}
}

impl IntoBranch for TemplateResult {
	fn into_branch(self) -> HoleValue {
		HoleValue::Template(self)
	}
}

impl IntoBranch for &str {
	fn into_branch(self) -> HoleValue {
		HoleValue::from(self)
	}
}

impl IntoBranch for String {
	fn into_branch(self) -> HoleValue {
		HoleValue::from(self)
	}
}

impl IntoBranch for Value {
	fn into_branch(self) -> HoleValue {
		HoleValue::Data(self)
	}
}

impl IntoBranch for Choice {
	fn into_branch(self) -> HoleValue {
		HoleValue::Choice(self)
	}
}

impl IntoBranch for KeyedList {
	fn into_branch(self) -> HoleValue {
		HoleValue::List(self)
	}
}

impl IntoBranch for Raw {
	fn into_branch(self) -> HoleValue {
		HoleValue::Raw(self)
	}
}

impl<F, R> IntoBranch for F
where
	F: FnOnce() -> R,
	R: Into<HoleValue>,
{
	fn into_branch(self) -> HoleValue {
		self().into()
	}
}

/// Renders `then` when `condition` holds, nothing otherwise.
pub fn when(condition: bool, then: impl IntoBranch) -> Choice {
	if condition {
		Choice {
			branch: Branch::Then,
			value: Box::new(then.into_branch()),
		}
	} else {
		Choice {
			branch: Branch::Else,
			value: Box::new(HoleValue::default()),
		}
	}
}

/// Renders `then` when `condition` holds, `otherwise` when it does not.
///
/// Only the selected branch is evaluated.
pub fn when_else(condition: bool, then: impl IntoBranch, otherwise: impl IntoBranch) -> Choice {
	let (branch, value) = if condition {
		(Branch::Then, then.into_branch())
	} else {
		(Branch::Else, otherwise.into_branch())
	};
	Choice {
		branch,
		value: Box::new(value),
	}
}

/// Two entries of a keyed list produced the same key.
///
/// Recoverable: the later entry falls back to positional identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate key {key} at position {position} in keyed list")]
pub struct DuplicateKeyError {
	/// The repeated key
	pub key: Key,
	/// Position of the entry that repeated it
	pub position: usize,
}

/// A list of keyed entries.
#[derive(Debug, Clone, Default)]
pub struct KeyedList {
	entries: Vec<(Key, HoleValue)>,
	duplicates: Vec<DuplicateKeyError>,
}

impl KeyedList {
	/// Entries in render order.
	pub fn entries(&self) -> &[(Key, HoleValue)] {
		&self.entries
	}

	/// Keys in render order.
	pub fn keys(&self) -> impl Iterator<Item = &Key> {
		self.entries.iter().map(|(k, _)| k)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the list has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Duplicate keys detected while building the list.
	pub fn duplicate_keys(&self) -> &[DuplicateKeyError] {
		&self.duplicates
	}

	pub(crate) fn into_parts(self) -> (Vec<(Key, HoleValue)>, Vec<DuplicateKeyError>) {
		(self.entries, self.duplicates)
	}
}

/// Renders each item with positional keys.
pub fn each<T, R>(items: impl IntoIterator<Item = T>, mut render: impl FnMut(T, usize) -> R) -> KeyedList
where
	R: Into<HoleValue>,
{
	KeyedList {
		entries: items
			.into_iter()
			.enumerate()
			.map(|(i, item)| (Key::Position(i), render(item, i).into()))
			.collect(),
		duplicates: Vec::new(),
	}
}

/// Renders each item under the key returned by `key`.
///
/// A key already used by an earlier entry is reported as a [`DuplicateKeyError`] and the
/// entry falls back to its position.
pub fn each_keyed<T, K, R>(
	items: impl IntoIterator<Item = T>,
	mut key: impl FnMut(&T, usize) -> K,
	mut render: impl FnMut(T, usize) -> R,
) -> KeyedList
where
	K: Into<Key>,
	R: Into<HoleValue>,
{
	let mut seen = HashSet::new();
	let mut list = KeyedList::default();
	for (i, item) in items.into_iter().enumerate() {
		let mut k = key(&item, i).into();
		if !seen.insert(k.clone()) {
			list.duplicates.push(DuplicateKeyError {
				key: k,
				position: i,
			});
			k = Key::Position(i);
		}
		list.entries.push((k, render(item, i).into()));
	}
	list
}

/// Markup inserted verbatim. Only use with trusted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw(Rc<str>);

impl Raw {
	/// The markup.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub(crate) fn into_inner(self) -> Rc<str> {
		self.0
	}
}

/// Wraps trusted markup for insertion without escaping.
pub fn raw(markup: impl Into<String>) -> Raw {
	Raw(markup.into().into())
}
