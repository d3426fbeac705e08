/*!
# Encoder for XML 1.0 documents

[`Encoder`] is the [`Sink`] shipped with this crate. It serializes items into
a [`BytesMut`] buffer and writes the buffer through to an [`io::Write`] once
it grows beyond [`EncoderOptions::flush_threshold`], on
[`Sink::flush`] and on [`Sink::close`].
*/
use std::collections::HashMap;
use std::convert::TryFrom;
use std::io;

use bytes::{BufMut, BytesMut};
use log::{debug, trace};
use thiserror::Error;

use super::Sink;
use crate::strings::{NCName, NCNameStr, Name};
use crate::validation::{validate_cdata, validate_name, validate_ncname, ValidationError};

const TEXT_SPECIALS: &[u8] = &[b'<', b'>', b'&', b'\r'];

const ATTR_SPECIALS: &[u8] = &[b'"', b'\'', b'\r', b'\n', b'\t', b'<', b'>', b'&'];

/// Namespace URI permanently bound to the `xml` prefix.
pub const XMLNS_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI permanently bound to the `xmlns` prefix.
pub const XMLNS_XMLNS: &str = "http://www.w3.org/2000/xmlns/";

fn check_binding(prefix: Option<&str>, uri: &str) -> Result<(), EncodeError> {
	match prefix {
		Some("xml") if uri == XMLNS_XML => return Ok(()),
		Some(p @ "xml") | Some(p @ "xmlns") => return Err(EncodeError::ReservedPrefix(p.to_string())),
		_ => (),
	}
	if uri == XMLNS_XML || uri == XMLNS_XMLNS {
		return Err(EncodeError::ReservedNamespace(uri.to_string()));
	}
	Ok(())
}

fn replacement(ch: u8) -> Option<&'static [u8]> {
	match ch {
		b'"' => Some(b"&#34;"),
		b'\'' => Some(b"&#39;"),
		b'<' => Some(b"&lt;"),
		b'>' => Some(b"&gt;"),
		b'&' => Some(b"&amp;"),
		b'\r' => Some(b"&#xd;"),
		b'\n' => Some(b"&#xa;"),
		b'\t' => Some(b"&#x9;"),
		_ => None,
	}
}

fn escape<B: BufMut>(out: &mut B, data: &[u8], specials: &[u8]) {
	let mut last_index = 0;
	for (i, ch) in data.iter().enumerate() {
		if !specials.contains(ch) {
			continue;
		}
		if let Some(repl) = replacement(*ch) {
			out.put_slice(&data[last_index..i]);
			out.put_slice(repl);
			last_index = i + 1;
		}
	}
	out.put_slice(&data[last_index..]);
}

fn validate_encoding_name(s: &str) -> bool {
	// [81] EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*
	let mut bytes = s.bytes();
	match bytes.next() {
		Some(b) if b.is_ascii_alphabetic() => (),
		_ => return false,
	}
	bytes.all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}

/// Errors reported by the [`Encoder`].
#[derive(Debug, Error)]
pub enum EncodeError {
	/// Emitted if an XML declaration is placed after anything else has
	/// been written or if multiple XML declarations are placed.
	#[error("misplaced XML declaration")]
	MisplacedXmlDeclaration,

	/// Emitted if a raw declaration is placed after the root element
	/// started.
	#[error("declarations are only allowed before the root element")]
	MisplacedDeclaration,

	/// Emitted if an element or text is placed after the end of the root
	/// element.
	#[error("no content allowed after end of root element")]
	EndOfDocument,

	/// Emitted if text, CDATA or an entity reference is placed outside of
	/// an element.
	#[error("text not allowed outside of elements")]
	TextNotAllowed,

	/// Emitted if an attribute or namespace declaration is placed outside
	/// of an element header
	#[error("attributes not allowed outside element headers")]
	AttributeNotAllowed,

	/// Emitted on an element end without matching start.
	#[error("no open element")]
	NoOpenElement,

	/// A namespace URI was used for which no prefix is bound.
	#[error("namespace {0:?} is not bound to a prefix")]
	UnboundNamespace(String),

	/// A name does not conform to the grammar.
	#[error("invalid name {0:?}: {1}")]
	InvalidName(String, ValidationError),

	/// Text, an attribute value or a namespace URI contains a character
	/// which is not allowed in XML.
	#[error("invalid character data: {0}")]
	InvalidText(ValidationError),

	/// Comment text contains `--` or ends with `-`.
	#[error("comment must not contain '--' or end with '-'")]
	InvalidComment,

	/// CDATA section text contains `]]>`.
	#[error("CDATA section must not contain ']]>'")]
	InvalidCData,

	/// Processing instruction with a reserved target or data containing
	/// `?>`.
	#[error("invalid processing instruction: {0}")]
	InvalidProcessingInstruction(&'static str),

	/// Version other than 1.0 or 1.1 requested in the XML declaration.
	#[error("unsupported XML version {0:?}")]
	UnsupportedVersion(String),

	/// Encoding name which does not match the EncName production.
	#[error("invalid encoding name {0:?}")]
	InvalidEncodingName(String),

	/// Attempt to bind `xmlns`, or `xml` to anything but its fixed URI.
	#[error("prefix {0:?} is reserved")]
	ReservedPrefix(String),

	/// Attempt to bind the `xml` or `xmlns` namespace URI to another prefix
	/// or to the default namespace.
	#[error("namespace {0:?} is reserved")]
	ReservedNamespace(String),

	/// Any item passed after [`Sink::close`].
	#[error("encoder has been closed")]
	Closed,

	/// The underlying writer failed.
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

/// Options for an [`Encoder`].
///
/// # Example
///
/// ```
/// use nswriter::{Encoder, EncoderOptions};
/// let enc = Encoder::with_options(
/// 	Vec::new(),
/// 	EncoderOptions::default().flush_threshold(1024).declaration_newline(false),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
	/// Number of buffered bytes above which the buffer is written to the
	/// underlying writer after an item.
	pub flush_threshold: usize,

	/// Whether a newline is written after the XML declaration.
	pub declaration_newline: bool,
}

impl EncoderOptions {
	/// Set the [`EncoderOptions::flush_threshold`] value.
	pub fn flush_threshold(mut self, v: usize) -> EncoderOptions {
		self.flush_threshold = v;
		self
	}

	/// Set the [`EncoderOptions::declaration_newline`] value.
	pub fn declaration_newline(mut self, v: bool) -> EncoderOptions {
		self.declaration_newline = v;
		self
	}
}

impl Default for EncoderOptions {
	fn default() -> Self {
		Self {
			flush_threshold: 8192,
			declaration_newline: true,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
	/// Nothing written yet; the XML declaration is still allowed.
	Start,
	/// Declaration, comments, PIs or DOCTYPE written; no element yet.
	Prolog,
	/// Inside `<name ...`, attributes may follow.
	ElementHead { empty: bool },
	Content,
	/// The root element has been closed.
	EndOfDocument,
	Closed,
}

/**
Encodes XML into an [`io::Write`].

Encoders are stateful. They can only be used to encode a single XML document
and have then to be disposed.

```rust
use nswriter::{Encoder, Sink};

let mut enc = Encoder::new(Vec::new());
enc.start_document(None, None).unwrap();
enc.start_element(None, "hello").unwrap();
enc.text("World!").unwrap();
enc.end_document().unwrap();
let out = enc.into_inner().unwrap();
assert_eq!(&out[..], &b"<?xml version=\"1.0\"?>\n<hello>World!</hello>"[..]);
```
*/
pub struct Encoder<W: io::Write> {
	state: EncoderState,
	qname_stack: Vec<Name>,
	default_ns_stack: Vec<Option<String>>,
	// uri -> prefix
	prefixes: HashMap<String, NCName>,
	buf: BytesMut,
	inner: W,
	opts: EncoderOptions,
}

impl<W: io::Write> Encoder<W> {
	/// Create an encoder writing to `inner` with default options.
	pub fn new(inner: W) -> Self {
		Self::with_options(inner, EncoderOptions::default())
	}

	/// Create an encoder writing to `inner`.
	pub fn with_options(inner: W, opts: EncoderOptions) -> Self {
		Self {
			state: EncoderState::Start,
			qname_stack: Vec::new(),
			default_ns_stack: Vec::new(),
			prefixes: HashMap::new(),
			buf: BytesMut::with_capacity(opts.flush_threshold),
			inner,
			opts,
		}
	}

	/// Borrow the underlying writer.
	///
	/// Output may still be held in the internal buffer; call
	/// [`Sink::flush`] first to see everything written so far.
	pub fn get_ref(&self) -> &W {
		&self.inner
	}

	/// Number of bytes held in the internal buffer.
	pub fn buffered(&self) -> usize {
		self.buf.len()
	}

	/// Number of elements which are currently open.
	pub fn depth(&self) -> usize {
		self.qname_stack.len()
	}

	/// Write any buffered output and return the underlying writer.
	///
	/// A pending element header is terminated first. Open elements are not
	/// closed; use [`Sink::end_document`] for that.
	pub fn into_inner(mut self) -> Result<W, EncodeError> {
		self.finish_head();
		self.write_buffer()?;
		Ok(self.inner)
	}

	fn write_buffer(&mut self) -> Result<(), EncodeError> {
		if !self.buf.is_empty() {
			trace!("writing {} buffered bytes", self.buf.len());
			self.inner.write_all(&self.buf[..])?;
			self.buf.clear();
		}
		Ok(())
	}

	fn maybe_write_buffer(&mut self) -> Result<(), EncodeError> {
		if self.buf.len() >= self.opts.flush_threshold {
			self.write_buffer()
		} else {
			Ok(())
		}
	}

	fn check_not_closed(&self) -> Result<(), EncodeError> {
		match self.state {
			EncoderState::Closed => Err(EncodeError::Closed),
			_ => Ok(()),
		}
	}

	fn state_after_element(&self) -> EncoderState {
		if self.qname_stack.is_empty() {
			EncoderState::EndOfDocument
		} else {
			EncoderState::Content
		}
	}

	/// Terminate a pending element header, if any.
	fn finish_head(&mut self) {
		match self.state {
			EncoderState::ElementHead { empty: false } => {
				self.buf.put_u8(b'>');
				self.state = EncoderState::Content;
			}
			EncoderState::ElementHead { empty: true } => {
				self.buf.put_slice(b"/>");
				self.qname_stack.pop();
				self.default_ns_stack.pop();
				self.state = self.state_after_element();
			}
			_ => (),
		}
	}

	/// Move from the initial state to the prolog; used by items which may
	/// occur before the root element.
	fn enter_prolog(&mut self) {
		if self.state == EncoderState::Start {
			self.state = EncoderState::Prolog;
		}
	}

	fn in_scope_default(&self) -> Option<&str> {
		self.default_ns_stack.last().and_then(|v| v.as_deref())
	}

	fn bind(&mut self, prefix: NCName, uri: &str) {
		self.prefixes.retain(|_, existing| *existing != prefix);
		self.prefixes.insert(uri.to_string(), prefix);
	}

	fn qualify_element(&self, namespace: Option<&str>, name: &str) -> Result<Name, EncodeError> {
		let uri = match namespace {
			None => {
				return Name::try_from(name)
					.map_err(|e| EncodeError::InvalidName(name.to_string(), e))
			}
			Some(uri) => uri,
		};
		let local = NCNameStr::from_str(name)
			.map_err(|e| EncodeError::InvalidName(name.to_string(), e))?;
		match self.prefixes.get(uri) {
			Some(prefix) => Ok(prefix.with_suffix(local)),
			None if self.in_scope_default() == Some(uri) => Ok(local.to_owned().into()),
			None => Err(EncodeError::UnboundNamespace(uri.to_string())),
		}
	}

	fn qualify_attribute(&self, namespace: Option<&str>, name: &str) -> Result<Name, EncodeError> {
		match namespace {
			None => {
				Name::try_from(name).map_err(|e| EncodeError::InvalidName(name.to_string(), e))
			}
			Some(uri) => {
				let local = NCNameStr::from_str(name)
					.map_err(|e| EncodeError::InvalidName(name.to_string(), e))?;
				match self.prefixes.get(uri) {
					Some(prefix) => Ok(prefix.with_suffix(local)),
					None => Err(EncodeError::UnboundNamespace(uri.to_string())),
				}
			}
		}
	}

	fn open_element(
		&mut self,
		namespace: Option<&str>,
		name: &str,
		empty: bool,
	) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		// syntax errors must not leave a closed header behind
		match namespace {
			Some(_) => validate_ncname(name),
			None => validate_name(name),
		}
		.map_err(|e| EncodeError::InvalidName(name.to_string(), e))?;
		self.finish_head();
		if self.state == EncoderState::EndOfDocument {
			return Err(EncodeError::EndOfDocument);
		}
		let qname = self.qualify_element(namespace, name)?;
		trace!("opening element {}", qname);
		self.buf.put_u8(b'<');
		self.buf.put_slice(qname.as_bytes());
		self.qname_stack.push(qname);
		let inherited = self.default_ns_stack.last().cloned().unwrap_or(None);
		self.default_ns_stack.push(inherited);
		self.state = EncoderState::ElementHead { empty };
		self.maybe_write_buffer()
	}

	fn check_head(&self) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		match self.state {
			EncoderState::ElementHead { .. } => Ok(()),
			_ => Err(EncodeError::AttributeNotAllowed),
		}
	}

	fn put_nsdecl(&mut self, prefix: Option<&str>, uri: &str) {
		match prefix {
			Some(prefix) => {
				self.buf.put_slice(b" xmlns:");
				self.buf.put_slice(prefix.as_bytes());
				self.buf.put_slice(b"=\"");
			}
			None => self.buf.put_slice(b" xmlns=\""),
		}
		escape(&mut self.buf, uri.as_bytes(), ATTR_SPECIALS);
		self.buf.put_u8(b'"');
	}

	/// Terminate a pending header and require to be inside an element.
	fn enter_content(&mut self) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		self.finish_head();
		match self.state {
			EncoderState::Content => Ok(()),
			_ => Err(EncodeError::TextNotAllowed),
		}
	}
}

impl<W: io::Write> Sink for Encoder<W> {
	type Error = EncodeError;

	fn start_document(
		&mut self,
		version: Option<&str>,
		encoding: Option<&str>,
	) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		if self.state != EncoderState::Start {
			return Err(EncodeError::MisplacedXmlDeclaration);
		}
		let version = version.unwrap_or("1.0");
		if version != "1.0" && version != "1.1" {
			return Err(EncodeError::UnsupportedVersion(version.to_string()));
		}
		if let Some(encoding) = encoding {
			if !validate_encoding_name(encoding) {
				return Err(EncodeError::InvalidEncodingName(encoding.to_string()));
			}
		}
		self.buf.put_slice(b"<?xml version=\"");
		self.buf.put_slice(version.as_bytes());
		self.buf.put_u8(b'"');
		if let Some(encoding) = encoding {
			self.buf.put_slice(b" encoding=\"");
			self.buf.put_slice(encoding.as_bytes());
			self.buf.put_u8(b'"');
		}
		self.buf.put_slice(b"?>");
		if self.opts.declaration_newline {
			self.buf.put_u8(b'\n');
		}
		self.state = EncoderState::Prolog;
		self.maybe_write_buffer()
	}

	fn end_document(&mut self) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		self.finish_head();
		if !self.qname_stack.is_empty() {
			debug!(
				"closing {} element(s) left open at end of document",
				self.qname_stack.len()
			);
		}
		while let Some(qname) = self.qname_stack.pop() {
			self.default_ns_stack.pop();
			self.buf.put_slice(b"</");
			self.buf.put_slice(qname.as_bytes());
			self.buf.put_u8(b'>');
		}
		self.state = EncoderState::EndOfDocument;
		self.maybe_write_buffer()
	}

	fn bind_prefix(&mut self, prefix: &str, uri: &str) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		let prefix =
			NCName::try_from(prefix).map_err(|e| EncodeError::InvalidName(prefix.to_string(), e))?;
		check_binding(Some(prefix.as_str()), uri)?;
		self.bind(prefix, uri);
		Ok(())
	}

	fn start_element(&mut self, namespace: Option<&str>, name: &str) -> Result<(), EncodeError> {
		self.open_element(namespace, name, false)
	}

	fn empty_element(&mut self, namespace: Option<&str>, name: &str) -> Result<(), EncodeError> {
		self.open_element(namespace, name, true)
	}

	fn end_element(&mut self) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		self.finish_head();
		if self.state != EncoderState::Content {
			return Err(EncodeError::NoOpenElement);
		}
		let qname = match self.qname_stack.pop() {
			Some(qname) => qname,
			None => return Err(EncodeError::NoOpenElement),
		};
		self.default_ns_stack.pop();
		trace!("closing element {}", qname);
		self.buf.put_slice(b"</");
		self.buf.put_slice(qname.as_bytes());
		self.buf.put_u8(b'>');
		self.state = self.state_after_element();
		self.maybe_write_buffer()
	}

	fn attribute(
		&mut self,
		namespace: Option<&str>,
		name: &str,
		value: &str,
	) -> Result<(), EncodeError> {
		self.check_head()?;
		validate_cdata(value).map_err(EncodeError::InvalidText)?;
		let qname = self.qualify_attribute(namespace, name)?;
		self.buf.put_u8(b' ');
		self.buf.put_slice(qname.as_bytes());
		self.buf.put_slice(b"=\"");
		escape(&mut self.buf, value.as_bytes(), ATTR_SPECIALS);
		self.buf.put_u8(b'"');
		self.maybe_write_buffer()
	}

	fn default_namespace(&mut self, uri: &str) -> Result<(), EncodeError> {
		self.check_head()?;
		validate_cdata(uri).map_err(EncodeError::InvalidText)?;
		check_binding(None, uri)?;
		self.put_nsdecl(None, uri);
		if let Some(top) = self.default_ns_stack.last_mut() {
			// xmlns="" undeclares the default namespace
			*top = if uri.is_empty() {
				None
			} else {
				Some(uri.to_string())
			};
		}
		self.maybe_write_buffer()
	}

	fn namespace(&mut self, prefix: &str, uri: &str) -> Result<(), EncodeError> {
		self.check_head()?;
		let prefix =
			NCName::try_from(prefix).map_err(|e| EncodeError::InvalidName(prefix.to_string(), e))?;
		validate_cdata(uri).map_err(EncodeError::InvalidText)?;
		check_binding(Some(prefix.as_str()), uri)?;
		self.put_nsdecl(Some(prefix.as_str()), uri);
		self.bind(prefix, uri);
		self.maybe_write_buffer()
	}

	fn text(&mut self, content: &str) -> Result<(), EncodeError> {
		validate_cdata(content).map_err(EncodeError::InvalidText)?;
		self.enter_content()?;
		escape(&mut self.buf, content.as_bytes(), TEXT_SPECIALS);
		self.maybe_write_buffer()
	}

	fn comment(&mut self, content: &str) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		validate_cdata(content).map_err(EncodeError::InvalidText)?;
		if content.contains("--") || content.ends_with('-') {
			return Err(EncodeError::InvalidComment);
		}
		self.finish_head();
		self.enter_prolog();
		self.buf.put_slice(b"<!--");
		self.buf.put_slice(content.as_bytes());
		self.buf.put_slice(b"-->");
		self.maybe_write_buffer()
	}

	fn processing_instruction(
		&mut self,
		target: &str,
		data: Option<&str>,
	) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		let target =
			Name::try_from(target).map_err(|e| EncodeError::InvalidName(target.to_string(), e))?;
		if target.eq_ignore_ascii_case("xml") {
			return Err(EncodeError::InvalidProcessingInstruction(
				"target xml is reserved",
			));
		}
		if let Some(data) = data {
			validate_cdata(data).map_err(EncodeError::InvalidText)?;
			if data.contains("?>") {
				return Err(EncodeError::InvalidProcessingInstruction(
					"data must not contain '?>'",
				));
			}
		}
		self.finish_head();
		self.enter_prolog();
		self.buf.put_slice(b"<?");
		self.buf.put_slice(target.as_bytes());
		if let Some(data) = data {
			self.buf.put_u8(b' ');
			self.buf.put_slice(data.as_bytes());
		}
		self.buf.put_slice(b"?>");
		self.maybe_write_buffer()
	}

	fn entity_ref(&mut self, name: &str) -> Result<(), EncodeError> {
		let name = Name::try_from(name).map_err(|e| EncodeError::InvalidName(name.to_string(), e))?;
		self.enter_content()?;
		self.buf.put_u8(b'&');
		self.buf.put_slice(name.as_bytes());
		self.buf.put_u8(b';');
		self.maybe_write_buffer()
	}

	fn cdata(&mut self, content: &str) -> Result<(), EncodeError> {
		validate_cdata(content).map_err(EncodeError::InvalidText)?;
		if content.contains("]]>") {
			return Err(EncodeError::InvalidCData);
		}
		self.enter_content()?;
		self.buf.put_slice(b"<![CDATA[");
		self.buf.put_slice(content.as_bytes());
		self.buf.put_slice(b"]]>");
		self.maybe_write_buffer()
	}

	fn raw_declaration(&mut self, text: &str) -> Result<(), EncodeError> {
		self.check_not_closed()?;
		match self.state {
			EncoderState::Start | EncoderState::Prolog => (),
			_ => return Err(EncodeError::MisplacedDeclaration),
		}
		self.state = EncoderState::Prolog;
		self.buf.put_slice(text.as_bytes());
		self.maybe_write_buffer()
	}

	fn flush(&mut self) -> Result<(), EncodeError> {
		self.write_buffer()?;
		self.inner.flush()?;
		Ok(())
	}

	fn close(&mut self) -> Result<(), EncodeError> {
		if self.state == EncoderState::Closed {
			return Ok(());
		}
		self.flush()?;
		self.state = EncoderState::Closed;
		Ok(())
	}
}
