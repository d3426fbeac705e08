/*!
# Namespace prefix registry

Holds the prefix → URI bindings and the optional default namespace a
[`ElementWriter`](crate::ElementWriter) resolves names against. The registry
is plain data: it does no I/O and knows nothing about which declarations have
already been written.
*/
use std::collections::BTreeMap;
use std::iter::FromIterator;

use crate::error::{Error, Result};

/// Prefix → URI bindings plus an optional default namespace URI.
///
/// Bindings are kept ordered by prefix, which is also the order in which
/// [`ElementWriter::start_root_element`](crate::ElementWriter::start_root_element)
/// declares them.
///
/// # Example
///
/// ```
/// use nswriter::NamespaceRegistry;
///
/// let mut ns = NamespaceRegistry::new();
/// ns.bind("foo", "http://x/foo");
/// ns.set_default("http://x/quux");
/// assert_eq!(ns.resolve("foo").unwrap(), "http://x/foo");
/// assert!(ns.resolve("bar").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceRegistry {
	prefixes: BTreeMap<String, String>,
	default_uri: Option<String>,
}

impl NamespaceRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Bind `prefix` to `uri`, replacing any previous binding of `prefix`.
	pub fn bind<P: Into<String>, U: Into<String>>(&mut self, prefix: P, uri: U) {
		self.prefixes.insert(prefix.into(), uri.into());
	}

	/// Bind every `(prefix, uri)` pair of `mapping`.
	pub fn bind_all<I, P, U>(&mut self, mapping: I)
	where
		I: IntoIterator<Item = (P, U)>,
		P: Into<String>,
		U: Into<String>,
	{
		for (prefix, uri) in mapping {
			self.bind(prefix, uri);
		}
	}

	/// Set or replace the default (unprefixed) namespace URI.
	pub fn set_default<U: Into<String>>(&mut self, uri: U) {
		self.default_uri = Some(uri.into());
	}

	/// The default namespace URI, if one is set.
	pub fn default_uri(&self) -> Option<&str> {
		self.default_uri.as_deref()
	}

	/// Look up the URI bound to `prefix`.
	///
	/// Fails with [`Error::UnknownNamespace`] if the prefix was never bound.
	pub fn resolve(&self, prefix: &str) -> Result<&str> {
		self.prefixes
			.get(prefix)
			.map(|uri| uri.as_str())
			.ok_or_else(|| Error::UnknownNamespace(prefix.to_string()))
	}

	/// Return true if `prefix` is bound.
	pub fn contains(&self, prefix: &str) -> bool {
		self.prefixes.contains_key(prefix)
	}

	/// Iterate over all `(prefix, uri)` bindings, ordered by prefix.
	pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
		self.prefixes
			.iter()
			.map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
	}

	/// Number of prefix bindings (the default namespace is not counted).
	pub fn len(&self) -> usize {
		self.prefixes.len()
	}

	/// Return true if no prefix is bound.
	pub fn is_empty(&self) -> bool {
		self.prefixes.is_empty()
	}
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceRegistry {
	fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
		let mut result = Self::new();
		result.bind_all(iter);
		result
	}
}

impl<P: Into<String>, U: Into<String>> Extend<(P, U)> for NamespaceRegistry {
	fn extend<I: IntoIterator<Item = (P, U)>>(&mut self, iter: I) {
		self.bind_all(iter);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashMap;

	#[test]
	fn resolve_unbound_prefix_fails() {
		let ns = NamespaceRegistry::new();
		match ns.resolve("x") {
			Err(Error::UnknownNamespace(p)) => assert_eq!(p, "x"),
			other => panic!("unexpected resolve result: {:?}", other),
		}
	}

	#[test]
	fn rebinding_replaces_uri() {
		let mut ns = NamespaceRegistry::new();
		ns.bind("aa", "http://www.example.org/aa");
		ns.bind("aa", "http://www.example.org/other");
		assert_eq!(ns.resolve("aa").unwrap(), "http://www.example.org/other");
		assert_eq!(ns.len(), 1);
	}

	#[test]
	fn bind_all_applies_every_entry() {
		let mut mapping = HashMap::new();
		mapping.insert("aa", "http://www.example.org/aa");
		mapping.insert("bb", "http://www.example.org/bb");
		let mut ns = NamespaceRegistry::new();
		ns.bind_all(mapping);
		assert!(ns.contains("aa"));
		assert!(ns.contains("bb"));
		assert!(!ns.contains("cc"));
	}

	#[test]
	fn bindings_are_ordered_by_prefix() {
		let ns: NamespaceRegistry = vec![("xsi", "uri:xsi"), ("bar", "uri:bar"), ("foo", "uri:foo")]
			.into_iter()
			.collect();
		let prefixes: Vec<&str> = ns.bindings().map(|(p, _)| p).collect();
		assert_eq!(prefixes, vec!["bar", "foo", "xsi"]);
	}

	#[test]
	fn default_namespace_is_not_a_binding() {
		let mut ns = NamespaceRegistry::new();
		assert_eq!(ns.default_uri(), None);
		ns.set_default("http://www.quux.org/quux");
		ns.set_default("http://www.quux.org/other");
		assert_eq!(ns.default_uri(), Some("http://www.quux.org/other"));
		assert!(ns.is_empty());
	}
}
