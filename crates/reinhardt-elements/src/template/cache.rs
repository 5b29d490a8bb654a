//! Per-call-site template cache.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::debug_log;
use crate::error::TemplateError;

use super::TemplateSource;
use super::compiler::{TemplateDescription, compile};

type Entry = Result<Rc<TemplateDescription>, TemplateError>;

/// Compiled templates keyed by call site.
///
/// Each call site compiles once; every later render of it reuses the same
/// `Rc<TemplateDescription>`. Failed compilations are cached as well.
#[derive(Default)]
pub struct TemplateCache {
	entries: RefCell<HashMap<(&'static str, &'static str), Entry>>,
	compilations: Cell<usize>,
}

impl TemplateCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the compiled description of `source`, compiling it on first use.
	pub fn get_or_compile(&self, source: &'static TemplateSource) -> Entry {
		let key = (source.site(), source.markup());
		if let Some(entry) = self.entries.borrow().get(&key) {
			return entry.clone();
		}
		debug_log!(site = source.site(), "compiling template");
		let entry = compile(source).map(Rc::new);
		self.compilations.set(self.compilations.get() + 1);
		self.entries.borrow_mut().insert(key, entry.clone());
		entry
	}

	/// Number of cached call sites.
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Returns true if nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	/// Number of compilations performed since creation.
	pub fn compilations(&self) -> usize {
		self.compilations.get()
	}

	/// Drops every cached description.
	pub fn clear(&self) {
		self.entries.borrow_mut().clear();
	}
}

thread_local! {
	static TEMPLATE_CACHE: TemplateCache = TemplateCache::new();
}

/// Runs `f` with the thread's template cache.
pub fn with_template_cache<R>(f: impl FnOnce(&TemplateCache) -> R) -> R {
	TEMPLATE_CACHE.with(f)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	static GREETING: TemplateSource = TemplateSource::new("cache.rs:1:1", "<p>Hello {}</p>");
	static BROKEN: TemplateSource = TemplateSource::new("cache.rs:2:1", "<p>Hello {}");

	#[rstest]
	fn test_compiles_once_per_site() {
		let cache = TemplateCache::new();
		let first = cache.get_or_compile(&GREETING).unwrap();
		let second = cache.get_or_compile(&GREETING).unwrap();

		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(cache.compilations(), 1);
		assert_eq!(cache.len(), 1);
	}

	#[rstest]
	fn test_errors_are_cached() {
		let cache = TemplateCache::new();
		let first = cache.get_or_compile(&BROKEN).unwrap_err();
		let second = cache.get_or_compile(&BROKEN).unwrap_err();

		assert_eq!(first, second);
		assert_eq!(cache.compilations(), 1);
	}

	#[rstest]
	fn test_clear() {
		let cache = TemplateCache::new();
		cache.get_or_compile(&GREETING).unwrap();
		cache.clear();
		assert!(cache.is_empty());
		cache.get_or_compile(&GREETING).unwrap();
		assert_eq!(cache.compilations(), 2);
	}
}
