/*!
# Signature pipeline integration

XML signature implementations apply transforms to octet streams and look
them up by algorithm URI. [`SmevTransform`] provides the canonicalization
of this crate through the [`Transform`] trait, so that it can be plugged
into such a pipeline next to other transforms.
*/
use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::driver::process;
use crate::error::Result;
use crate::options::Options;

/// Algorithm URI under which the transform is registered.
pub const ALGORITHM_URN: &'static str = "urn://smev-gov-ru/xmldsig/transform";

/**
# Octet input or output of a transform

Wraps an immutable, cheaply cloneable byte buffer.

```
use smev_transform::SignatureInput;
use std::io::Read;

let input = SignatureInput::from(b"<a/>".to_vec());
let mut buf = String::new();
input.octet_stream().read_to_string(&mut buf).unwrap();
assert_eq!(buf, "<a/>");
```
*/
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureInput {
	data: Bytes,
}

impl SignatureInput {
	pub fn new<T: Into<Bytes>>(data: T) -> Self {
		Self { data: data.into() }
	}

	/// Open a reader over the octets.
	///
	/// Each call returns an independent reader starting at the first byte.
	pub fn octet_stream(&self) -> bytes::buf::Reader<Bytes> {
		self.data.clone().reader()
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.data
	}

	pub fn into_bytes(self) -> Bytes {
		self.data
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

impl From<Vec<u8>> for SignatureInput {
	fn from(other: Vec<u8>) -> Self {
		Self::new(other)
	}
}

impl From<Bytes> for SignatureInput {
	fn from(other: Bytes) -> Self {
		Self::new(other)
	}
}

impl From<&'static [u8]> for SignatureInput {
	fn from(other: &'static [u8]) -> Self {
		Self::new(other)
	}
}

/**
# Transform of a signature pipeline

Implementations must be usable from several threads at once; any per-run
state lives on the stack of [`perform`](Self::perform).
*/
pub trait Transform {
	/// Algorithm URI identifying the transform.
	fn uri(&self) -> &'static str;

	/// Apply the transform to `input`, returning the transformed octets.
	fn perform(&self, input: &SignatureInput) -> Result<SignatureInput>;

	/// Apply the transform to `input` and write the transformed octets to
	/// `output`.
	///
	/// Nothing is written if the transform fails.
	fn perform_into(&self, input: &SignatureInput, output: &mut dyn io::Write) -> Result<()> {
		let result = self.perform(input)?;
		output.write_all(result.as_bytes())?;
		output.flush()?;
		Ok(())
	}
}

/**
# Canonicalizing pre-digest transform

```
use smev_transform::{SignatureInput, SmevTransform, Transform, ALGORITHM_URN};

let t = SmevTransform::new();
assert_eq!(t.uri(), ALGORITHM_URN);
let out = t.perform(&SignatureInput::from(&b"<x:a xmlns:x='urn:x'/>"[..])).unwrap();
assert_eq!(out.as_bytes(), &b"<ns1:a xmlns:ns1=\"urn:x\"></ns1:a>"[..]);
```
*/
#[derive(Debug, Clone, Default)]
pub struct SmevTransform {
	options: Options,
}

impl SmevTransform {
	/// Create the transform producing the standard canonical form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create the transform with custom options.
	///
	/// Only the default options produce output which other implementations
	/// of the algorithm will agree with.
	pub fn with_options(options: Options) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	/// Canonicalize the document read from `input` into `output`.
	///
	/// On error, whatever has been written to `output` must be discarded.
	pub fn process<R: io::BufRead, W: io::Write>(&self, input: R, output: W) -> Result<()> {
		process(input, output, &self.options)
	}
}

impl Transform for SmevTransform {
	fn uri(&self) -> &'static str {
		ALGORITHM_URN
	}

	fn perform(&self, input: &SignatureInput) -> Result<SignatureInput> {
		debug!(uri = ALGORITHM_URN, len = input.len(), "performing transform");
		let mut out = BytesMut::with_capacity(input.len()).writer();
		self.process(input.octet_stream(), &mut out)?;
		Ok(SignatureInput::new(out.into_inner().freeze()))
	}
}
