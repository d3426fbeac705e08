/*!
# Error types

This module holds the error types returned by
[`ElementWriter`](crate::ElementWriter). Errors from the sink itself (for the
bundled sink, [`EncodeError`](crate::sink::encoder::EncodeError)) never reach
the caller unwrapped: they are always carried inside a [`WriteFailure`] which
names the writer operation and the sink primitive involved.

All errors are fatal for the document being written. Nothing is retried and
output which already reached the sink stays there.
*/
use std::error::Error as StdError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::writer::DocumentState;

/// Boxed error reported by a [`Sink`](crate::Sink) primitive.
pub type SinkError = Box<dyn StdError + Send + Sync + 'static>;

/// A sink primitive failed while the writer was executing an operation.
#[derive(Debug, Error)]
#[error("ElementWriter::{operation} failed when calling Sink::{primitive}: {source}")]
pub struct WriteFailure {
	operation: &'static str,
	primitive: &'static str,
	source: SinkError,
}

impl WriteFailure {
	pub(crate) fn new<E>(operation: &'static str, primitive: &'static str, source: E) -> Self
	where
		E: Into<SinkError>,
	{
		Self {
			operation,
			primitive,
			source: source.into(),
		}
	}

	/// Name of the [`ElementWriter`](crate::ElementWriter) method which was
	/// called.
	pub fn operation(&self) -> &'static str {
		self.operation
	}

	/// Name of the [`Sink`](crate::Sink) method which failed.
	pub fn primitive(&self) -> &'static str {
		self.primitive
	}

	/// The error as reported by the sink.
	pub fn sink_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
		&*self.source
	}

	/// Consume the failure and return the sink's error.
	pub fn into_sink_error(self) -> SinkError {
		self.source
	}
}

/// Error types which may be returned from the [`ElementWriter`](crate::ElementWriter).
#[derive(Debug, Error)]
pub enum Error {
	/// The operation is not allowed in the current document state, e.g.
	/// writing before `start_doc` or after `end_doc`.
	#[error("{operation} is not allowed while the document is {state}")]
	Lifecycle {
		operation: &'static str,
		state: DocumentState,
	},

	/// A namespace prefix was referenced which has never been mapped to a
	/// URI.
	#[error("namespace prefix {0:?} has not been mapped to a uri")]
	UnknownNamespace(String),

	/// The sink reported an error.
	#[error(transparent)]
	Write(#[from] WriteFailure),

	/// A `start`/`len` pair does not describe a range inside the buffer it
	/// refers to.
	#[error("{len} chars at offset {start} are out of bounds for a buffer of {available} chars")]
	OutOfBounds {
		start: usize,
		len: usize,
		available: usize,
	},
}

impl Error {
	/// Return the contained [`WriteFailure`], if this is a sink error.
	pub fn as_write_failure(&self) -> Option<&WriteFailure> {
		match self {
			Self::Write(f) => Some(f),
			_ => None,
		}
	}
}

pub type Result<T> = StdResult<T, Error>;
