/*!
# Streaming namespace-aware XML writer

This crate writes XML documents item by item, without building a tree in
memory. Its focus is the namespace handling: prefixes are registered once,
a *current namespace* cursor selects the prefix for the elements which
follow, and the root element carries all namespace declarations.

## Features

* Namespace cursor with per-element overrides
* Default namespace and prefix declarations written once, on the root element;
  prefixes registered later are declared on the start tags using them
* Prefixed attributes independent of the element's namespace
* Elements left open are closed at the end of the document
* Pluggable output through the [`Sink`] trait; [`Encoder`] writes to any
  [`std::io::Write`]
* Names, text, comments, CDATA sections and processing instructions are
  checked against the XML 1.0 grammar before they are written

## Example

```
use nswriter::ElementWriter;

let mut w = ElementWriter::from_writer(Vec::new());
w.set_default_namespace("http://x/quux")
	.map_namespace("bar", "http://x/bar");
w.start_doc()?
	.start_root_element("inventory")?
	.start_element_in("capacity", Some("bar"))?
	.characters("200,000")?
	.end_doc()?;
let out = w.into_sink().into_inner()?;
assert_eq!(
	&out[..],
	&b"<?xml version=\"1.0\"?>\n<inventory xmlns=\"http://x/quux\" \
	   xmlns:bar=\"http://x/bar\"><bar:capacity>200,000</bar:capacity></inventory>"[..]
);
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Layering

The [`ElementWriter`] keeps the [`NamespaceRegistry`], the cursor and the
document lifecycle. Escaping, serialization and the stack of open elements
are the business of the [`Sink`]. Every error a sink reports is returned
as a [`WriteFailure`] naming the writer operation and the sink primitive
involved.
*/

pub mod error;
pub mod namespace;
pub mod sink;
pub mod strings;
pub mod validation;
pub mod writer;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use error::{Error, Result, WriteFailure};
#[doc(inline)]
pub use namespace::NamespaceRegistry;
#[doc(inline)]
pub use sink::{EncodeError, Encoder, EncoderOptions, Sink};
#[doc(inline)]
pub use writer::{DocumentState, ElementWriter};
