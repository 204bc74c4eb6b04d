/*!
# Byte-level parser front-end

[`XmlReader`] turns UTF-8 encoded XML bytes into the [`Event`]s consumed by
the [`Canonicalizer`](crate::Canonicalizer). It is a thin layer over the
namespace-aware reader of `quick-xml`, which does the tokenizing and prefix
resolution; this module maps its output onto the event model of this crate.

Comments, processing instructions, the XML declaration and the document type
declaration are never reported. Namespace declarations are consumed by the
resolver and do not show up as attributes.
*/
use std::borrow::Cow;
use std::io;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use tracing::trace;

use crate::canonical::is_insignificant;
use crate::error::{Error, Result};
use crate::event::{namespace_name, Attribute, Event, QName};
use crate::EventRead;

/// Namespace name permanently bound to the `xml` prefix.
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";

fn decode(bytes: &[u8]) -> Result<&str> {
	std::str::from_utf8(bytes).map_err(Error::parse)
}

fn unescape(raw: &str) -> Result<Cow<'_, str>> {
	quick_xml::escape::unescape(raw).map_err(Error::parse)
}

/// Apply end-of-line handling (XML 1.0 section 2.11).
fn normalize_newlines(raw: &str) -> Cow<'_, str> {
	if !raw.contains('\r') {
		return Cow::Borrowed(raw);
	}
	Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Apply attribute value normalization for CDATA attributes (XML 1.0
/// section 3.3.3). Whitespace introduced by character references survives,
/// because references are expanded afterwards.
fn normalize_attribute_value(raw: &str) -> Cow<'_, str> {
	let raw = normalize_newlines(raw);
	if !raw.contains(|ch: char| ch == '\t' || ch == '\n') {
		return raw;
	}
	Cow::Owned(raw.replace(|ch: char| ch == '\t' || ch == '\n', " "))
}

fn text(raw: &[u8]) -> Result<String> {
	let raw = decode(raw)?;
	Ok(unescape(&normalize_newlines(raw))?.into_owned())
}

fn namespace<'ns>(result: ResolveResult<'ns>, qname: &[u8]) -> Result<Option<&'ns str>> {
	match result {
		ResolveResult::Bound(ns) => Ok(Some(decode(ns.0)?)),
		ResolveResult::Unbound => Ok(None),
		ResolveResult::Unknown(prefix) => Err(Error::Parse(format!(
			"undeclared namespace prefix {:?} in {:?}",
			String::from_utf8_lossy(&prefix),
			String::from_utf8_lossy(qname),
		))),
	}
}

fn qname(namespace: Option<&str>, local_name: &[u8]) -> Result<QName> {
	let local_name = decode(local_name)?;
	let namespace = match namespace {
		Some(ns) => namespace_name(&unescape(ns)?),
		None => None,
	};
	Ok(QName::from_parts(namespace, local_name))
}

fn element_name<R: io::BufRead>(reader: &NsReader<R>, raw: quick_xml::name::QName<'_>) -> Result<QName> {
	let (ns, local_name) = reader.resolve_element(raw);
	let ns = namespace(ns, raw.as_ref())?;
	qname(ns, local_name.as_ref())
}

fn attributes<R: io::BufRead>(reader: &NsReader<R>, e: &BytesStart<'_>) -> Result<Vec<Attribute>> {
	let mut result: Vec<Attribute> = Vec::new();
	for attr in e.attributes() {
		let attr = attr.map_err(Error::parse)?;
		let key = attr.key.as_ref();
		if key == b"xmlns" || key.starts_with(b"xmlns:") {
			continue;
		}
		let name = if key.starts_with(b"xml:") {
			qname(Some(XMLNS_XML), &key[4..])?
		} else {
			let (ns, local_name) = reader.resolve_attribute(attr.key);
			let ns = namespace(ns, key)?;
			qname(ns, local_name.as_ref())?
		};
		// distinct prefixes may still resolve to the same expanded name
		if result.iter().any(|other| other.name == name) {
			return Err(Error::Parse(format!("duplicate attribute {}", name)));
		}
		let value = decode(&attr.value)?;
		let value = unescape(&normalize_attribute_value(value))?.into_owned();
		result.push(Attribute::new(name, value));
	}
	Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
	Start,
	Document,
	Eof,
}

/**
# Pull parser producing [`Event`]s

```
use smev_transform::{Event, EventRead, QName, XmlReader};

let mut reader = XmlReader::from_bytes(b"<a:root xmlns:a='urn:x' id='1'/>");
assert_eq!(reader.read().unwrap(), Some(Event::StartDocument));
match reader.read().unwrap() {
	Some(Event::StartElement(name, attrs)) => {
		assert_eq!(name, QName::new("urn:x", "root"));
		assert_eq!(attrs.len(), 1);
	}
	other => panic!("unexpected event: {:?}", other),
}
assert_eq!(reader.read().unwrap(), Some(Event::EndElement(QName::new("urn:x", "root"))));
assert_eq!(reader.read().unwrap(), Some(Event::EndDocument));
assert_eq!(reader.read().unwrap(), None);
```

Once an error has been returned, the reader returns the same error for every
further call.
*/
pub struct XmlReader<R> {
	inner: NsReader<R>,
	buf: Vec<u8>,
	state: ReaderState,
	pending: Option<Event>,
	depth: usize,
	seen_root: bool,
	poison: Option<Error>,
}

impl<R: io::BufRead> XmlReader<R> {
	/// Create a reader parsing from `inner`.
	pub fn new(inner: R) -> Self {
		let mut inner = NsReader::from_reader(inner);
		inner.config_mut().trim_text(false);
		Self {
			inner,
			buf: Vec::new(),
			state: ReaderState::Start,
			pending: None,
			depth: 0,
			seen_root: false,
			poison: None,
		}
	}

	/// Only whitespace may appear before or after the root element.
	fn check_text_placement(&self, text: &str) -> Result<()> {
		if self.depth == 0 && !is_insignificant(text) {
			return Err(Error::parse("text outside root element"));
		}
		Ok(())
	}

	fn read_inner(&mut self) -> Result<Option<Event>> {
		if let Some(ev) = self.pending.take() {
			self.depth -= 1;
			return Ok(Some(ev));
		}
		match self.state {
			ReaderState::Start => {
				self.state = ReaderState::Document;
				return Ok(Some(Event::StartDocument));
			}
			ReaderState::Eof => return Ok(None),
			ReaderState::Document => (),
		}

		loop {
			self.buf.clear();
			match self.inner.read_event_into(&mut self.buf)? {
				XmlEvent::Start(e) => {
					if self.depth == 0 && self.seen_root {
						return Err(Error::parse("more than one root element"));
					}
					let name = element_name(&self.inner, e.name())?;
					let attrs = attributes(&self.inner, &e)?;
					self.depth += 1;
					self.seen_root = true;
					return Ok(Some(Event::StartElement(name, attrs)));
				}
				XmlEvent::Empty(e) => {
					if self.depth == 0 && self.seen_root {
						return Err(Error::parse("more than one root element"));
					}
					let name = element_name(&self.inner, e.name())?;
					let attrs = attributes(&self.inner, &e)?;
					self.depth += 1;
					self.seen_root = true;
					self.pending = Some(Event::EndElement(name.clone()));
					return Ok(Some(Event::StartElement(name, attrs)));
				}
				XmlEvent::End(e) => {
					if self.depth == 0 {
						return Err(Error::parse("element end without matching start"));
					}
					let name = element_name(&self.inner, e.name())?;
					self.depth -= 1;
					return Ok(Some(Event::EndElement(name)));
				}
				XmlEvent::Text(e) => {
					let text = text(&e)?;
					if text.is_empty() {
						continue;
					}
					self.check_text_placement(&text)?;
					return Ok(Some(Event::Text(text)));
				}
				XmlEvent::CData(e) => {
					let text = normalize_newlines(decode(&e)?).into_owned();
					if text.is_empty() {
						continue;
					}
					self.check_text_placement(&text)?;
					return Ok(Some(Event::Text(text)));
				}
				XmlEvent::Eof => {
					if self.depth > 0 {
						return Err(Error::Parse(format!(
							"unexpected end of input, {} element(s) still open",
							self.depth
						)));
					}
					if !self.seen_root {
						return Err(Error::parse("document has no root element"));
					}
					self.state = ReaderState::Eof;
					return Ok(Some(Event::EndDocument));
				}
				other => {
					trace!(event = ?other, "skipping markup");
				}
			}
		}
	}
}

impl<'a> XmlReader<&'a [u8]> {
	/// Create a reader parsing from a byte slice.
	pub fn from_bytes(data: &'a [u8]) -> Self {
		Self::new(data)
	}
}

impl<R: io::BufRead> EventRead for XmlReader<R> {
	type Output = Event;

	/// Read a single event from the parser.
	///
	/// Returns `None` after the `EndDocument` event has been returned.
	fn read(&mut self) -> Result<Option<Self::Output>> {
		if let Some(poison) = self.poison.as_ref() {
			return Err(poison.clone());
		}
		match self.read_inner() {
			Ok(ev) => Ok(ev),
			Err(e) => {
				self.poison = Some(e.clone());
				Err(e)
			}
		}
	}
}
