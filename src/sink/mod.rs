/*!
# Low-level XML output

The [`Sink`] trait is the seam between the namespace bookkeeping of
[`ElementWriter`](crate::ElementWriter) and the code which actually produces
bytes. [`Encoder`] is the implementation shipped with this crate.
*/
use std::error::Error as StdError;

pub mod encoder;

#[doc(inline)]
pub use encoder::{EncodeError, Encoder, EncoderOptions};

/// Trait for a streaming XML emitter.
///
/// A sink receives one primitive per call and is responsible for escaping,
/// serialization and tracking the stack of open elements. Indirection via
/// this trait allows to plug in other serializers, or recorders in tests.
///
/// Objects implementing this trait expect the following protocol:
///
/// 1. Optionally write the XML declaration with `start_document`.
/// 2. Open an element with `start_element` or `empty_element`.
/// 3. While the start tag is still open (i.e. before any other item),
///    `attribute`, `namespace` and `default_namespace` may be called.
/// 4. Content and child elements follow; `end_element` closes the innermost
///    element opened with `start_element`.
/// 5. `end_document` closes whatever is still open; `flush` and `close`
///    finish the output.
///
/// Namespace URIs passed to `start_element`, `empty_element` and `attribute`
/// are turned into prefixes using the bindings established through
/// `bind_prefix` and `namespace`.
pub trait Sink {
	/// Error type reported by every primitive.
	type Error: StdError + Send + Sync + 'static;

	/// Write the XML declaration. `None` leaves the respective pseudo
	/// attribute to the sink's default (for the version) or out (for the
	/// encoding).
	fn start_document(
		&mut self,
		version: Option<&str>,
		encoding: Option<&str>,
	) -> Result<(), Self::Error>;

	/// Close all open elements and finish the document.
	fn end_document(&mut self) -> Result<(), Self::Error>;

	/// Make `prefix` the prefix used for `uri` without declaring it.
	///
	/// The latest binding of a URI wins, and `prefix` stops standing for
	/// any URI it was bound to before. [`namespace`](Self::namespace)
	/// binds the same way.
	fn bind_prefix(&mut self, prefix: &str, uri: &str) -> Result<(), Self::Error>;

	/// Open an element, leaving its start tag open for attributes.
	fn start_element(&mut self, namespace: Option<&str>, name: &str) -> Result<(), Self::Error>;

	/// Write a self-closing element; its start tag stays open for
	/// attributes until the next item.
	fn empty_element(&mut self, namespace: Option<&str>, name: &str) -> Result<(), Self::Error>;

	/// Close the innermost open element.
	fn end_element(&mut self) -> Result<(), Self::Error>;

	/// Add an attribute to the open start tag.
	fn attribute(
		&mut self,
		namespace: Option<&str>,
		name: &str,
		value: &str,
	) -> Result<(), Self::Error>;

	/// Declare the default namespace on the open start tag.
	fn default_namespace(&mut self, uri: &str) -> Result<(), Self::Error>;

	/// Declare a prefixed namespace on the open start tag.
	fn namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Self::Error>;

	/// Write character data.
	fn text(&mut self, content: &str) -> Result<(), Self::Error>;

	/// Write a comment.
	fn comment(&mut self, content: &str) -> Result<(), Self::Error>;

	/// Write a processing instruction.
	fn processing_instruction(
		&mut self,
		target: &str,
		data: Option<&str>,
	) -> Result<(), Self::Error>;

	/// Write an entity reference (`&name;`).
	fn entity_ref(&mut self, name: &str) -> Result<(), Self::Error>;

	/// Write a CDATA section.
	fn cdata(&mut self, content: &str) -> Result<(), Self::Error>;

	/// Write `text` verbatim, e.g. a document type declaration.
	fn raw_declaration(&mut self, text: &str) -> Result<(), Self::Error>;

	/// Push buffered output to the underlying destination.
	fn flush(&mut self) -> Result<(), Self::Error>;

	/// Flush and release the sink. No further items are accepted.
	fn close(&mut self) -> Result<(), Self::Error>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
	type Error = S::Error;

	fn start_document(
		&mut self,
		version: Option<&str>,
		encoding: Option<&str>,
	) -> Result<(), Self::Error> {
		(**self).start_document(version, encoding)
	}

	fn end_document(&mut self) -> Result<(), Self::Error> {
		(**self).end_document()
	}

	fn bind_prefix(&mut self, prefix: &str, uri: &str) -> Result<(), Self::Error> {
		(**self).bind_prefix(prefix, uri)
	}

	fn start_element(&mut self, namespace: Option<&str>, name: &str) -> Result<(), Self::Error> {
		(**self).start_element(namespace, name)
	}

	fn empty_element(&mut self, namespace: Option<&str>, name: &str) -> Result<(), Self::Error> {
		(**self).empty_element(namespace, name)
	}

	fn end_element(&mut self) -> Result<(), Self::Error> {
		(**self).end_element()
	}

	fn attribute(
		&mut self,
		namespace: Option<&str>,
		name: &str,
		value: &str,
	) -> Result<(), Self::Error> {
		(**self).attribute(namespace, name, value)
	}

	fn default_namespace(&mut self, uri: &str) -> Result<(), Self::Error> {
		(**self).default_namespace(uri)
	}

	fn namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Self::Error> {
		(**self).namespace(prefix, uri)
	}

	fn text(&mut self, content: &str) -> Result<(), Self::Error> {
		(**self).text(content)
	}

	fn comment(&mut self, content: &str) -> Result<(), Self::Error> {
		(**self).comment(content)
	}

	fn processing_instruction(
		&mut self,
		target: &str,
		data: Option<&str>,
	) -> Result<(), Self::Error> {
		(**self).processing_instruction(target, data)
	}

	fn entity_ref(&mut self, name: &str) -> Result<(), Self::Error> {
		(**self).entity_ref(name)
	}

	fn cdata(&mut self, content: &str) -> Result<(), Self::Error> {
		(**self).cdata(content)
	}

	fn raw_declaration(&mut self, text: &str) -> Result<(), Self::Error> {
		(**self).raw_declaration(text)
	}

	fn flush(&mut self) -> Result<(), Self::Error> {
		(**self).flush()
	}

	fn close(&mut self) -> Result<(), Self::Error> {
		(**self).close()
	}
}
