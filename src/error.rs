/*!
# Error types

This module holds the error type returned by the canonicalization transform
and the components it is built from.
*/
use std::io;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error as ThisError;

use crate::writer::EncodeError;

/// Coarse classification of an [`Error`].
///
/// Hosts embedding the transform into a signature pipeline use this to map a
/// failure onto their own error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The input uses a construct which the transform does not accept.
	InputValidation,

	/// The event stream contradicts itself, for instance by closing an
	/// element whose namespace is not bound in any open scope.
	StreamConsistency,

	/// Reading the source or writing the destination failed.
	Upstream,
}

/// Error returned by the transform.
///
/// All errors are fatal: the transform does not retry and any output written
/// before the error occurred must be discarded by the caller.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
	/// An element without a namespace name was encountered.
	///
	/// Unqualified elements cannot be assigned a canonical prefix and are
	/// rejected.
	#[error("element {local_name:?} has no namespace, unqualified elements are not supported")]
	MissingNamespace {
		/// Local name of the offending element.
		local_name: String,
	},

	/// An element end refers to a namespace which is not bound in any open
	/// scope.
	#[error("namespace {namespace:?} of closing element {local_name:?} is not bound")]
	UnboundNamespace {
		/// Namespace name of the closing element.
		namespace: String,
		/// Local name of the closing element.
		local_name: String,
	},

	/// The prefix counter cannot advance any further.
	///
	/// Only reachable with a [`first_prefix_index`] close to
	/// [`usize::MAX`].
	///
	///   [`first_prefix_index`]: crate::Options::first_prefix_index
	#[error("prefix counter exhausted at {index}")]
	PrefixesExhausted {
		/// Value of the counter which could not be used.
		index: usize,
	},

	/// I/O error on the underlying byte source or sink.
	///
	/// The error is wrapped in an [`Arc`] so that [`Error`] can be cloned.
	#[error("I/O error: {0}")]
	Io(Arc<io::Error>),

	/// The byte input could not be parsed into XML events.
	#[error("malformed XML input: {0}")]
	Parse(String),

	/// A canonical event could not be rendered.
	#[error("failed to encode canonical event: {0}")]
	Encode(#[from] EncodeError),
}

impl Error {
	/// Classify the error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::MissingNamespace { .. } | Self::PrefixesExhausted { .. } => {
				ErrorKind::InputValidation
			}
			Self::UnboundNamespace { .. } => ErrorKind::StreamConsistency,
			Self::Io(_) | Self::Parse(_) | Self::Encode(_) => ErrorKind::Upstream,
		}
	}

	pub(crate) fn parse<T: ToString>(msg: T) -> Self {
		Self::Parse(msg.to_string())
	}
}

impl From<io::Error> for Error {
	fn from(other: io::Error) -> Self {
		Self::Io(Arc::new(other))
	}
}

impl From<quick_xml::Error> for Error {
	fn from(other: quick_xml::Error) -> Self {
		match other {
			quick_xml::Error::Io(e) => Self::Io(e),
			other => Self::Parse(other.to_string()),
		}
	}
}

/// Result type alias using [`Error`].
pub type Result<T> = StdResult<T, Error>;
