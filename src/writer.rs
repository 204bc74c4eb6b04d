/*!
# Serializer for canonical events

The [`Encoder`] renders [`CanonicalEvent`]s into bytes the way a streaming
XML event writer does: element heads are left open until the next text or
element event, elements are never self-closed and no XML declaration is
written. [`XmlWriter`] couples an encoder with an [`io::Write`].
*/
use std::io;

use bytes::{BufMut, BytesMut};
use smartstring::alias::String as SmartString;
use thiserror::Error as ThisError;

use crate::error::Result;
use crate::event::CanonicalEvent;
use crate::EventWrite;

const TEXT_SPECIALS: &'static [u8] = &[b'<', b'>', b'&'];

const ATTR_SPECIALS: &'static [u8] = &[b'"', b'<', b'>', b'&'];

fn escape<'a, B: BufMut>(out: &'a mut B, data: &'a [u8], specials: &'static [u8]) {
	let mut last_index = 0;
	for i in 0..data.len() {
		let ch = data[i];
		if !specials.contains(&ch) {
			continue;
		}
		if i > last_index {
			out.put_slice(&data[last_index..i]);
		}
		match ch {
			b'"' => out.put_slice(b"&quot;"),
			b'<' => out.put_slice(b"&lt;"),
			b'>' => out.put_slice(b"&gt;"),
			b'&' => out.put_slice(b"&amp;"),
			// specials only contains the bytes handled above
			_ => out.put_u8(ch),
		}
		last_index = i + 1;
	}
	out.put_slice(&data[last_index..data.len()]);
}

/// Canonical event placed where it cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum EncodeError {
	/// Emitted if an element is started after the end of the root element.
	#[error("no element allowed after end of root element")]
	EndOfDocument,

	/// Emitted if an attribute or namespace declaration is placed outside
	/// of an element head.
	#[error("attributes not allowed outside element headers")]
	AttributeNotAllowed,

	/// Emitted if an element is ended while no element is open.
	#[error("no open element")]
	NoOpenElement,

	/// Emitted if an element end does not match the innermost open element.
	#[error("element end does not match the open element")]
	ElementMismatch,

	/// Emitted if non-empty text is placed before or after the root
	/// element.
	#[error("text not allowed outside the root element")]
	TextNotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
	Start,
	ElementHead,
	Content,
	EndOfDocument,
}

fn put_qname<O: BufMut>(prefix: Option<&str>, local_name: &str, output: &mut O) {
	if let Some(prefix) = prefix {
		output.put_slice(prefix.as_bytes());
		output.put_u8(b':');
	}
	output.put_slice(local_name.as_bytes());
}

fn qname(prefix: &str, local_name: &str) -> SmartString {
	let mut result = SmartString::new();
	result.push_str(prefix);
	result.push(':');
	result.push_str(local_name);
	result
}

/**
Encodes canonical events into buffers.

Encoders are stateful. They can only be used to encode a single document and
have then to be disposed.

```rust
use smev_transform::{CanonicalEvent, Encoder};
use bytes::BytesMut;

let mut enc = Encoder::new();
let mut buf = BytesMut::new();
enc.encode(&CanonicalEvent::StartElement {
	prefix: "ns1".into(),
	namespace: "urn:x".into(),
	local_name: "a".into(),
}, &mut buf).unwrap();
enc.encode(&CanonicalEvent::Namespace {
	prefix: "ns1".into(),
	namespace: "urn:x".into(),
}, &mut buf).unwrap();
assert_eq!(&buf[..], b"<ns1:a xmlns:ns1=\"urn:x\"");
```
*/
pub struct Encoder {
	state: EncoderState,
	qname_stack: Vec<SmartString>,
}

impl Encoder {
	/// Create a new encoder.
	pub fn new() -> Self {
		Self {
			state: EncoderState::Start,
			qname_stack: Vec::new(),
		}
	}

	fn close_head<O: BufMut>(&mut self, output: &mut O) {
		if self.state == EncoderState::ElementHead {
			output.put_u8(b'>');
			self.state = EncoderState::Content;
		}
	}

	/// Encode a single event into a buffer.
	///
	/// There is no requirement for the buffer to be the same for subsequent
	/// calls to this function. This allows users to use small, but
	/// long-lived, buffers for serialization before handing data to the
	/// digest, for instance.
	pub fn encode<O: BufMut>(
		&mut self,
		ev: &CanonicalEvent,
		output: &mut O,
	) -> std::result::Result<(), EncodeError> {
		match ev {
			CanonicalEvent::StartDocument | CanonicalEvent::EndDocument => Ok(()),
			CanonicalEvent::StartElement {
				prefix, local_name, ..
			} => {
				if self.state == EncoderState::EndOfDocument {
					return Err(EncodeError::EndOfDocument);
				}
				self.close_head(output);
				output.put_u8(b'<');
				put_qname(Some(prefix.as_str()), local_name, output);
				self.qname_stack.push(qname(prefix, local_name));
				self.state = EncoderState::ElementHead;
				Ok(())
			}
			CanonicalEvent::Namespace { prefix, namespace } => match self.state {
				EncoderState::ElementHead => {
					output.put_slice(b" xmlns:");
					output.put_slice(prefix.as_bytes());
					output.put_slice(b"=\"");
					escape(output, namespace.as_bytes(), ATTR_SPECIALS);
					output.put_u8(b'"');
					Ok(())
				}
				_ => Err(EncodeError::AttributeNotAllowed),
			},
			CanonicalEvent::Attribute {
				prefix,
				local_name,
				value,
				..
			} => match self.state {
				EncoderState::ElementHead => {
					output.put_u8(b' ');
					put_qname(prefix.as_deref(), local_name, output);
					output.put_slice(b"=\"");
					escape(output, value.as_bytes(), ATTR_SPECIALS);
					output.put_u8(b'"');
					Ok(())
				}
				_ => Err(EncodeError::AttributeNotAllowed),
			},
			CanonicalEvent::Text(text) => {
				match self.state {
					EncoderState::Start | EncoderState::EndOfDocument if !text.is_empty() => {
						return Err(EncodeError::TextNotAllowed)
					}
					_ => (),
				}
				self.close_head(output);
				escape(output, text.as_bytes(), TEXT_SPECIALS);
				Ok(())
			}
			CanonicalEvent::EndElement {
				prefix, local_name, ..
			} => {
				match self.qname_stack.last() {
					None => return Err(EncodeError::NoOpenElement),
					Some(open) if open != &qname(prefix, local_name) => {
						return Err(EncodeError::ElementMismatch)
					}
					Some(_) => (),
				}
				self.close_head(output);
				output.put_slice(b"</");
				put_qname(Some(prefix.as_str()), local_name, output);
				output.put_u8(b'>');
				self.qname_stack.pop();
				self.state = if self.qname_stack.is_empty() {
					EncoderState::EndOfDocument
				} else {
					EncoderState::Content
				};
				Ok(())
			}
		}
	}

	/// Encode a single event into a BytesMut.
	///
	/// There is no requirement for the buffer to be the same for subsequent
	/// calls to this function.
	pub fn encode_into_bytes(
		&mut self,
		ev: &CanonicalEvent,
		output: &mut BytesMut,
	) -> std::result::Result<(), EncodeError> {
		self.encode(ev, output)
	}

	/// Number of elements which have been started but not ended.
	pub fn depth(&self) -> usize {
		self.qname_stack.len()
	}
}

impl Default for Encoder {
	fn default() -> Self {
		Self::new()
	}
}

/**
# Canonical event sink writing to [`io::Write`]

Each event is encoded into an internal scratch buffer and then written to
the wrapped writer in one piece. Closing the writer flushes it.
*/
pub struct XmlWriter<W> {
	inner: W,
	encoder: Encoder,
	buf: BytesMut,
}

impl<W: io::Write> XmlWriter<W> {
	/// Wrap a writer.
	pub fn new(inner: W) -> Self {
		Self {
			inner,
			encoder: Encoder::new(),
			buf: BytesMut::new(),
		}
	}

	/// Access the encoder state.
	pub fn encoder(&self) -> &Encoder {
		&self.encoder
	}

	/// Access the wrapped writer.
	pub fn get_ref(&self) -> &W {
		&self.inner
	}

	/// Release the wrapped writer.
	///
	/// The writer is not flushed.
	pub fn into_inner(self) -> W {
		self.inner
	}
}

impl<W: io::Write> EventWrite for XmlWriter<W> {
	fn write(&mut self, ev: CanonicalEvent) -> Result<()> {
		self.buf.clear();
		self.encoder.encode_into_bytes(&ev, &mut self.buf)?;
		if !self.buf.is_empty() {
			self.inner.write_all(&self.buf)?;
		}
		Ok(())
	}

	fn close(&mut self) -> Result<()> {
		self.inner.flush()?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::error::Error;
	use crate::event::NamespaceName;

	fn start(prefix: &str, namespace: &str, local_name: &str) -> CanonicalEvent {
		CanonicalEvent::StartElement {
			prefix: prefix.into(),
			namespace: NamespaceName::from(namespace),
			local_name: local_name.into(),
		}
	}

	fn end(prefix: &str, namespace: &str, local_name: &str) -> CanonicalEvent {
		CanonicalEvent::EndElement {
			prefix: prefix.into(),
			namespace: NamespaceName::from(namespace),
			local_name: local_name.into(),
		}
	}

	fn encode_all(evs: &[CanonicalEvent]) -> std::result::Result<Vec<u8>, EncodeError> {
		let mut enc = Encoder::new();
		let mut buf = BytesMut::new();
		for ev in evs {
			enc.encode(ev, &mut buf)?;
		}
		Ok(buf.to_vec())
	}

	#[test]
	fn escape_text_specials() {
		let mut buf = BytesMut::new();
		escape(&mut buf, b"a < b && c > \"d\"", TEXT_SPECIALS);
		assert_eq!(&buf[..], &b"a &lt; b &amp;&amp; c &gt; \"d\""[..]);
	}

	#[test]
	fn escape_attribute_specials() {
		let mut buf = BytesMut::new();
		escape(&mut buf, b"\"x\" & 'y'", ATTR_SPECIALS);
		assert_eq!(&buf[..], &b"&quot;x&quot; &amp; 'y'"[..]);
	}

	#[test]
	fn escape_passes_non_ascii() {
		let mut buf = BytesMut::new();
		escape(&mut buf, "Привет & мир".as_bytes(), TEXT_SPECIALS);
		assert_eq!(&buf[..], "Привет &amp; мир".as_bytes());
	}

	#[test]
	fn encodes_full_element() {
		let out = encode_all(&[
			CanonicalEvent::StartDocument,
			start("ns1", "urn:x", "Foo"),
			CanonicalEvent::Namespace {
				prefix: "ns1".into(),
				namespace: "urn:x".into(),
			},
			CanonicalEvent::Namespace {
				prefix: "ns2".into(),
				namespace: "urn:y".into(),
			},
			CanonicalEvent::Attribute {
				prefix: Some("ns2".into()),
				namespace: Some("urn:y".into()),
				local_name: "id".into(),
				value: "2".into(),
			},
			CanonicalEvent::Attribute {
				prefix: None,
				namespace: None,
				local_name: "val".into(),
				value: "1".into(),
			},
			start("ns1", "urn:x", "Bar"),
			CanonicalEvent::Text(String::new()),
			end("ns1", "urn:x", "Bar"),
			CanonicalEvent::Text(String::new()),
			end("ns1", "urn:x", "Foo"),
			CanonicalEvent::EndDocument,
		])
		.unwrap();
		assert_eq!(
			std::str::from_utf8(&out).unwrap(),
			"<ns1:Foo xmlns:ns1=\"urn:x\" xmlns:ns2=\"urn:y\" ns2:id=\"2\" val=\"1\"><ns1:Bar></ns1:Bar></ns1:Foo>"
		);
	}

	#[test]
	fn never_self_closes() {
		let out = encode_all(&[start("p", "urn:x", "a"), end("p", "urn:x", "a")]).unwrap();
		assert_eq!(&out[..], &b"<p:a></p:a>"[..]);
	}

	#[test]
	fn escapes_attribute_values_and_text() {
		let out = encode_all(&[
			start("p", "urn:x", "a"),
			CanonicalEvent::Attribute {
				prefix: None,
				namespace: None,
				local_name: "v".into(),
				value: "<\"&\">".into(),
			},
			CanonicalEvent::Text("1 < 2 \"ok\"".into()),
			end("p", "urn:x", "a"),
		])
		.unwrap();
		assert_eq!(
			std::str::from_utf8(&out).unwrap(),
			"<p:a v=\"&lt;&quot;&amp;&quot;&gt;\">1 &lt; 2 \"ok\"</p:a>"
		);
	}

	#[test]
	fn rejects_attribute_in_content() {
		match encode_all(&[
			start("p", "urn:x", "a"),
			CanonicalEvent::Text(String::new()),
			CanonicalEvent::Attribute {
				prefix: None,
				namespace: None,
				local_name: "v".into(),
				value: String::new(),
			},
		]) {
			Err(EncodeError::AttributeNotAllowed) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_namespace_before_root() {
		match encode_all(&[CanonicalEvent::Namespace {
			prefix: "p".into(),
			namespace: "urn:x".into(),
		}]) {
			Err(EncodeError::AttributeNotAllowed) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_text_before_root() {
		match encode_all(&[CanonicalEvent::Text("x".into()), start("p", "urn:x", "a")]) {
			Err(EncodeError::TextNotAllowed) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_text_after_root() {
		match encode_all(&[
			start("p", "urn:x", "a"),
			end("p", "urn:x", "a"),
			CanonicalEvent::Text("x".into()),
		]) {
			Err(EncodeError::TextNotAllowed) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn empty_text_outside_root_is_harmless() {
		let out = encode_all(&[
			CanonicalEvent::Text(String::new()),
			start("p", "urn:x", "a"),
			end("p", "urn:x", "a"),
			CanonicalEvent::Text(String::new()),
		])
		.unwrap();
		assert_eq!(std::str::from_utf8(&out).unwrap(), "<p:a></p:a>");
	}

	#[test]
	fn rejects_unbalanced_end() {
		match encode_all(&[end("p", "urn:x", "a")]) {
			Err(EncodeError::NoOpenElement) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_mismatched_end() {
		match encode_all(&[start("p", "urn:x", "a"), end("p", "urn:x", "b")]) {
			Err(EncodeError::ElementMismatch) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_second_root() {
		match encode_all(&[
			start("p", "urn:x", "a"),
			end("p", "urn:x", "a"),
			start("p", "urn:x", "a"),
		]) {
			Err(EncodeError::EndOfDocument) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn tracks_depth() {
		let mut enc = Encoder::new();
		let mut buf = BytesMut::new();
		enc.encode(&start("p", "urn:x", "a"), &mut buf).unwrap();
		enc.encode(&start("p", "urn:x", "b"), &mut buf).unwrap();
		assert_eq!(enc.depth(), 2);
		enc.encode(&end("p", "urn:x", "b"), &mut buf).unwrap();
		assert_eq!(enc.depth(), 1);
	}

	#[test]
	fn xml_writer_writes_and_flushes() {
		let mut w = XmlWriter::new(Vec::new());
		w.write(start("p", "urn:x", "a")).unwrap();
		w.write(CanonicalEvent::Text("t".into())).unwrap();
		w.write(end("p", "urn:x", "a")).unwrap();
		w.close().unwrap();
		assert_eq!(w.encoder().depth(), 0);
		assert_eq!(&w.into_inner()[..], &b"<p:a>t</p:a>"[..]);
	}

	#[test]
	fn xml_writer_reports_encode_errors() {
		let mut w = XmlWriter::new(Vec::new());
		match w.write(end("p", "urn:x", "a")) {
			Err(Error::Encode(EncodeError::NoOpenElement)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		assert!(w.get_ref().is_empty());
	}

	struct BrokenPipe;

	impl io::Write for BrokenPipe {
		fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
			Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
		}

		fn flush(&mut self) -> io::Result<()> {
			Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
		}
	}

	#[test]
	fn xml_writer_reports_io_errors() {
		let mut w = XmlWriter::new(BrokenPipe);
		match w.write(start("p", "urn:x", "a")) {
			Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
			other => panic!("unexpected result: {:?}", other),
		}
		match w.close() {
			Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
			other => panic!("unexpected result: {:?}", other),
		}
	}
}
