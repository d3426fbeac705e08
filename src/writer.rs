/*!
# Namespace-aware element writer

[`ElementWriter`] sits on top of a [`Sink`] and adds the namespace cursor,
per-call namespace overrides, root-level namespace declarations and the
document lifecycle. Everything byte-level is left to the sink.
*/
use std::collections::HashMap;
use std::fmt;
use std::io;

use log::{debug, trace, warn};

use crate::error::{Error, Result, SinkError, WriteFailure};
use crate::namespace::NamespaceRegistry;
use crate::sink::{Encoder, EncoderOptions, Sink};

/// Lifecycle state of the document written by an [`ElementWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentState {
	/// `start_doc` has not been called yet.
	NotStarted,
	/// Between `start_doc` and `end_doc`.
	Open,
	/// `end_doc` has been called; the sink is closed.
	Ended,
}

impl fmt::Display for DocumentState {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::NotStarted => f.write_str("not started"),
			Self::Open => f.write_str("open"),
			Self::Ended => f.write_str("ended"),
		}
	}
}

/// Namespace selection for a single element.
#[derive(Debug, Clone, Copy)]
enum Qualify<'x> {
	/// Use the current namespace cursor.
	Cursor,
	/// Use the given prefix (or none) for this element only.
	Prefix(Option<&'x str>),
}

fn sink_failure<E: Into<SinkError>>(
	operation: &'static str,
	primitive: &'static str,
) -> impl FnOnce(E) -> Error {
	move |e| WriteFailure::new(operation, primitive, e).into()
}

/**
Streaming XML writer with a namespace cursor.

Namespace prefixes are registered up front (or at any time before they are
first used) and selected for the elements which follow with
[`set_current_namespace`](Self::set_current_namespace). The root element,
written with [`start_root_element`](Self::start_root_element), carries the
declarations for the default namespace and every registered prefix.

All writing methods return `&mut Self`, so calls chain with `?`.

# Example

```rust
use nswriter::ElementWriter;

let mut w = ElementWriter::from_writer(Vec::new());
w.set_default_namespace("http://x/quux")
	.map_namespace("foo", "http://x/foo");
w.start_doc()?
	.start_root_element("inventory")?
	.set_current_namespace(Some("foo"))?
	.start_element("site")?
	.prefixed_attribute("foo", "isWarehouse", "yes")?
	.characters("Oklahoma City facility")?
	.end_element()?
	.set_current_namespace(None)?
	.end_doc()?;
let out = String::from_utf8(w.into_sink().into_inner()?)?;
assert_eq!(
	out,
	"<?xml version=\"1.0\"?>\n\
	 <inventory xmlns=\"http://x/quux\" xmlns:foo=\"http://x/foo\">\
	 <foo:site foo:isWarehouse=\"yes\">Oklahoma City facility</foo:site>\
	 </inventory>"
);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub struct ElementWriter<S: Sink> {
	sink: S,
	namespaces: NamespaceRegistry,
	current: Option<String>,
	state: DocumentState,
	// uri -> prefix the sink currently qualifies that uri with
	sink_prefixes: HashMap<String, String>,
	// prefix -> uri, as declared on the root element
	root_declared: HashMap<String, String>,
	// prefixes declared on the start tag which is still open
	head_declared: Vec<String>,
	// only used to report auto-closed elements in end_doc
	open_elements: usize,
}

impl<W: io::Write> ElementWriter<Encoder<W>> {
	/// Create a writer which serializes into `inner` through an
	/// [`Encoder`] with default options.
	///
	/// The encoder is owned by the writer; `end_doc` flushes and closes it.
	pub fn from_writer(inner: W) -> Self {
		Self::new(Encoder::new(inner))
	}

	/// Create a writer which serializes into `inner` through an
	/// [`Encoder`] configured with `opts`.
	pub fn from_writer_with_options(inner: W, opts: EncoderOptions) -> Self {
		Self::new(Encoder::with_options(inner, opts))
	}
}

impl<S: Sink> ElementWriter<S> {
	/// Create a writer on top of `sink` with an empty namespace registry.
	pub fn new(sink: S) -> Self {
		Self::with_namespaces(sink, NamespaceRegistry::new())
	}

	/// Create a writer on top of `sink` using the given bindings.
	pub fn with_namespaces(sink: S, namespaces: NamespaceRegistry) -> Self {
		Self {
			sink,
			namespaces,
			current: None,
			state: DocumentState::NotStarted,
			sink_prefixes: HashMap::new(),
			root_declared: HashMap::new(),
			head_declared: Vec::new(),
			open_elements: 0,
		}
	}

	pub fn state(&self) -> DocumentState {
		self.state
	}

	/// Prefix the current namespace cursor points at, if any.
	pub fn current_namespace(&self) -> Option<&str> {
		self.current.as_deref()
	}

	pub fn namespaces(&self) -> &NamespaceRegistry {
		&self.namespaces
	}

	pub fn sink(&self) -> &S {
		&self.sink
	}

	/// Mutable access to the sink.
	///
	/// Items written directly to the sink bypass the namespace handling of
	/// the writer.
	pub fn sink_mut(&mut self) -> &mut S {
		&mut self.sink
	}

	pub fn into_sink(self) -> S {
		self.sink
	}

	fn require(&self, operation: &'static str, expected: DocumentState) -> Result<()> {
		if self.state == expected {
			Ok(())
		} else {
			Err(Error::Lifecycle {
				operation,
				state: self.state,
			})
		}
	}

	/// Record that the sink now qualifies `uri` with `prefix`.
	///
	/// A prefix stands for one URI at a time, so older URIs lose it.
	fn note_binding(&mut self, prefix: &str, uri: &str) {
		self.sink_prefixes.retain(|_, p| p != prefix);
		self.sink_prefixes
			.insert(uri.to_string(), prefix.to_string());
	}

	/// Map `prefix` to its URI and make sure the sink qualifies that URI
	/// with `prefix`.
	fn bind_in_sink(&mut self, operation: &'static str, prefix: &str) -> Result<String> {
		let uri = self.namespaces.resolve(prefix)?.to_string();
		if self.sink_prefixes.get(&uri).map(|p| p.as_str()) != Some(prefix) {
			trace!("binding prefix {:?} to {:?} in sink", prefix, uri);
			self.sink
				.bind_prefix(prefix, &uri)
				.map_err(sink_failure(operation, "bind_prefix"))?;
			self.note_binding(prefix, &uri);
		}
		Ok(uri)
	}

	/// Declare `prefix` on the open start tag unless the root element or
	/// this start tag already declares it.
	fn declare_in_head(&mut self, operation: &'static str, prefix: &str, uri: &str) -> Result<()> {
		if self.root_declared.get(prefix).map(|u| u.as_str()) == Some(uri)
			|| self.head_declared.iter().any(|p| p == prefix)
		{
			return Ok(());
		}
		trace!("declaring prefix {:?} outside of the root element", prefix);
		self.sink
			.namespace(prefix, uri)
			.map_err(sink_failure(operation, "namespace"))?;
		self.note_binding(prefix, uri);
		self.head_declared.push(prefix.to_string());
		Ok(())
	}

	fn open(
		&mut self,
		operation: &'static str,
		name: &str,
		qualify: Qualify<'_>,
		empty: bool,
		root: bool,
	) -> Result<()> {
		self.require(operation, DocumentState::Open)?;
		let prefix = match qualify {
			Qualify::Cursor => self.current.clone(),
			Qualify::Prefix(prefix) => prefix.map(|p| p.to_string()),
		};
		let uri = match prefix {
			Some(ref prefix) => Some(self.bind_in_sink(operation, prefix)?),
			None => None,
		};
		trace!("{}: {:?} in namespace {:?}", operation, name, uri);
		if empty {
			self.sink
				.empty_element(uri.as_deref(), name)
				.map_err(sink_failure(operation, "empty_element"))?;
		} else {
			self.sink
				.start_element(uri.as_deref(), name)
				.map_err(sink_failure(operation, "start_element"))?;
			self.open_elements += 1;
		}
		self.head_declared.clear();
		if let (Some(prefix), Some(uri), false) = (prefix, uri, root) {
			self.declare_in_head(operation, &prefix, &uri)?;
		}
		Ok(())
	}

	/// Set the default (unprefixed) namespace URI declared on the root
	/// element.
	pub fn set_default_namespace<U: Into<String>>(&mut self, uri: U) -> &mut Self {
		self.namespaces.set_default(uri);
		self
	}

	/// Bind `prefix` to `uri`.
	///
	/// Bindings may be added at any time. Those present when
	/// [`start_root_element`](Self::start_root_element) is called are
	/// declared on the root element, later ones on the start tags using
	/// them.
	pub fn map_namespace<P: Into<String>, U: Into<String>>(&mut self, prefix: P, uri: U) -> &mut Self {
		self.namespaces.bind(prefix, uri);
		self
	}

	/// Bind every `(prefix, uri)` pair of `mapping`.
	pub fn map_namespaces<I, P, U>(&mut self, mapping: I) -> &mut Self
	where
		I: IntoIterator<Item = (P, U)>,
		P: Into<String>,
		U: Into<String>,
	{
		self.namespaces.bind_all(mapping);
		self
	}

	/// Select the namespace for the elements which follow.
	///
	/// `None` makes subsequent elements unprefixed. A prefix which is not
	/// bound is rejected with [`Error::UnknownNamespace`] and the cursor
	/// keeps its previous value.
	pub fn set_current_namespace(&mut self, prefix: Option<&str>) -> Result<&mut Self> {
		match prefix {
			Some(prefix) => {
				self.namespaces.resolve(prefix)?;
				self.current = Some(prefix.to_string());
			}
			None => self.current = None,
		}
		Ok(self)
	}

	/// Write the XML declaration with version 1.0 and no encoding.
	pub fn start_doc(&mut self) -> Result<&mut Self> {
		self.start_document("start_doc", None, None)
	}

	/// Write the XML declaration with the given version and, optionally, an
	/// encoding.
	///
	/// The values only end up in the declaration; the output is always
	/// UTF-8.
	pub fn start_doc_with(&mut self, version: &str, encoding: Option<&str>) -> Result<&mut Self> {
		self.start_document("start_doc_with", Some(version), encoding)
	}

	fn start_document(
		&mut self,
		operation: &'static str,
		version: Option<&str>,
		encoding: Option<&str>,
	) -> Result<&mut Self> {
		self.require(operation, DocumentState::NotStarted)?;
		self.sink
			.start_document(version, encoding)
			.map_err(sink_failure(operation, "start_document"))?;
		let bindings: Vec<(String, String)> = self
			.namespaces
			.bindings()
			.map(|(p, u)| (p.to_string(), u.to_string()))
			.collect();
		for (prefix, uri) in bindings.iter() {
			self.sink
				.bind_prefix(prefix, uri)
				.map_err(sink_failure(operation, "bind_prefix"))?;
			self.note_binding(prefix, uri);
		}
		debug!(
			"document started with {} namespace binding(s)",
			bindings.len()
		);
		self.state = DocumentState::Open;
		Ok(self)
	}

	/// Finish the document.
	///
	/// Elements which are still open are closed by the sink. The sink is
	/// then flushed and closed.
	pub fn end_doc(&mut self) -> Result<&mut Self> {
		const OP: &str = "end_doc";
		self.require(OP, DocumentState::Open)?;
		if self.open_elements > 0 {
			warn!(
				"closing {} element(s) left open at end of document",
				self.open_elements
			);
		}
		self.sink
			.end_document()
			.map_err(sink_failure(OP, "end_document"))?;
		self.open_elements = 0;
		self.sink.flush().map_err(sink_failure(OP, "flush"))?;
		self.sink.close().map_err(sink_failure(OP, "close"))?;
		self.state = DocumentState::Ended;
		debug!("document ended");
		Ok(self)
	}

	/// Open the outermost element and declare all namespaces on it.
	///
	/// The element itself is qualified like in
	/// [`start_element`](Self::start_element). It then carries the default
	/// namespace declaration (if one is set) and one declaration per
	/// registered prefix, ordered by prefix.
	///
	/// Using [`start_element`](Self::start_element) for the root element
	/// instead writes no declarations there. Prefixes which are not declared
	/// on a root element get declared on each start tag using them.
	pub fn start_root_element(&mut self, name: &str) -> Result<&mut Self> {
		const OP: &str = "start_root_element";
		self.open(OP, name, Qualify::Cursor, false, true)?;
		if let Some(uri) = self.namespaces.default_uri() {
			self.sink
				.default_namespace(uri)
				.map_err(sink_failure(OP, "default_namespace"))?;
		}
		let bindings: Vec<(String, String)> = self
			.namespaces
			.bindings()
			.map(|(p, u)| (p.to_string(), u.to_string()))
			.collect();
		self.root_declared.clear();
		for (prefix, uri) in bindings {
			self.sink
				.namespace(&prefix, &uri)
				.map_err(sink_failure(OP, "namespace"))?;
			self.note_binding(&prefix, &uri);
			self.root_declared.insert(prefix, uri);
		}
		debug!(
			"declared {} namespace prefix(es) on root element {:?}",
			self.root_declared.len(),
			name
		);
		Ok(self)
	}

	/// Open an element in the current namespace.
	pub fn start_element(&mut self, name: &str) -> Result<&mut Self> {
		self.open("start_element", name, Qualify::Cursor, false, false)?;
		Ok(self)
	}

	/// Open an element in the namespace bound to `prefix`, or in no
	/// namespace for `None`, ignoring the cursor.
	///
	/// The cursor is left unchanged.
	pub fn start_element_in(&mut self, name: &str, prefix: Option<&str>) -> Result<&mut Self> {
		self.open("start_element_in", name, Qualify::Prefix(prefix), false, false)?;
		Ok(self)
	}

	/// Write a self-closing element in the current namespace.
	///
	/// Attributes may be added until the next item is written.
	pub fn empty_element(&mut self, name: &str) -> Result<&mut Self> {
		self.open("empty_element", name, Qualify::Cursor, true, false)?;
		Ok(self)
	}

	/// Write a self-closing element with a per-call namespace, like
	/// [`start_element_in`](Self::start_element_in).
	pub fn empty_element_in(&mut self, name: &str, prefix: Option<&str>) -> Result<&mut Self> {
		self.open("empty_element_in", name, Qualify::Prefix(prefix), true, false)?;
		Ok(self)
	}

	/// Close the innermost open element.
	pub fn end_element(&mut self) -> Result<&mut Self> {
		self.close_element("end_element")
	}

	/// Close the innermost open element.
	///
	/// `label` only serves readability at the call site. It is not compared
	/// against the element being closed.
	pub fn end_element_named(&mut self, _label: &str) -> Result<&mut Self> {
		self.close_element("end_element_named")
	}

	fn close_element(&mut self, operation: &'static str) -> Result<&mut Self> {
		self.require(operation, DocumentState::Open)?;
		trace!("{}", operation);
		self.sink
			.end_element()
			.map_err(sink_failure(operation, "end_element"))?;
		self.open_elements = self.open_elements.saturating_sub(1);
		Ok(self)
	}

	/// Add an unqualified attribute to the element just opened.
	pub fn attribute(&mut self, name: &str, value: &str) -> Result<&mut Self> {
		const OP: &str = "attribute";
		self.require(OP, DocumentState::Open)?;
		self.sink
			.attribute(None, name, value)
			.map_err(sink_failure(OP, "attribute"))?;
		Ok(self)
	}

	/// Add an attribute qualified with the namespace bound to `prefix`.
	///
	/// Neither the cursor nor the element's own namespace play a role. If
	/// the root element does not declare `prefix`, the start tag carrying
	/// the attribute does.
	pub fn prefixed_attribute(&mut self, prefix: &str, name: &str, value: &str) -> Result<&mut Self> {
		const OP: &str = "prefixed_attribute";
		self.require(OP, DocumentState::Open)?;
		let uri = self.bind_in_sink(OP, prefix)?;
		self.declare_in_head(OP, prefix, &uri)?;
		self.sink
			.attribute(Some(&uri), name, value)
			.map_err(sink_failure(OP, "attribute"))?;
		Ok(self)
	}

	/// Write character data.
	pub fn characters(&mut self, text: &str) -> Result<&mut Self> {
		self.write_text("characters", text)
	}

	/// Write `len` chars of `buf` starting at `start` as character data.
	///
	/// Fails with [`Error::OutOfBounds`] if the range does not fit `buf`.
	pub fn characters_from(&mut self, buf: &[char], start: usize, len: usize) -> Result<&mut Self> {
		const OP: &str = "characters_from";
		self.require(OP, DocumentState::Open)?;
		let range = match start.checked_add(len) {
			Some(end) if end <= buf.len() => start..end,
			_ => {
				return Err(Error::OutOfBounds {
					start,
					len,
					available: buf.len(),
				})
			}
		};
		let text: String = buf[range].iter().collect();
		self.write_text(OP, &text)
	}

	fn write_text(&mut self, operation: &'static str, text: &str) -> Result<&mut Self> {
		self.require(operation, DocumentState::Open)?;
		self.sink
			.text(text)
			.map_err(sink_failure(operation, "text"))?;
		Ok(self)
	}

	pub fn comment(&mut self, text: &str) -> Result<&mut Self> {
		const OP: &str = "comment";
		self.require(OP, DocumentState::Open)?;
		self.sink
			.comment(text)
			.map_err(sink_failure(OP, "comment"))?;
		Ok(self)
	}

	/// Write a processing instruction without data.
	pub fn processing_instruction(&mut self, target: &str) -> Result<&mut Self> {
		self.write_pi("processing_instruction", target, None)
	}

	/// Write a processing instruction with data.
	pub fn processing_instruction_with(&mut self, target: &str, data: &str) -> Result<&mut Self> {
		self.write_pi("processing_instruction_with", target, Some(data))
	}

	fn write_pi(
		&mut self,
		operation: &'static str,
		target: &str,
		data: Option<&str>,
	) -> Result<&mut Self> {
		self.require(operation, DocumentState::Open)?;
		self.sink
			.processing_instruction(target, data)
			.map_err(sink_failure(operation, "processing_instruction"))?;
		Ok(self)
	}

	/// Write an entity reference, `&name;`.
	pub fn entity_ref(&mut self, name: &str) -> Result<&mut Self> {
		const OP: &str = "entity_ref";
		self.require(OP, DocumentState::Open)?;
		self.sink
			.entity_ref(name)
			.map_err(sink_failure(OP, "entity_ref"))?;
		Ok(self)
	}

	pub fn cdata(&mut self, text: &str) -> Result<&mut Self> {
		const OP: &str = "cdata";
		self.require(OP, DocumentState::Open)?;
		self.sink.cdata(text).map_err(sink_failure(OP, "cdata"))?;
		Ok(self)
	}

	/// Write `text` verbatim, typically a document type declaration.
	pub fn raw_declaration(&mut self, text: &str) -> Result<&mut Self> {
		const OP: &str = "raw_declaration";
		self.require(OP, DocumentState::Open)?;
		self.sink
			.raw_declaration(text)
			.map_err(sink_failure(OP, "raw_declaration"))?;
		Ok(self)
	}
}
