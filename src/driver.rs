/*!
Drivers which connect event sources, the canonicalizer and event sinks.

[`canonicalize`] works on the event level and is the place where the release
of the source and sink is guaranteed. [`process`] and [`canonicalize_bytes`]
are the byte-level entry points built on top of it.
*/
use std::io;

use tracing::{debug, warn};

use crate::canonical::Canonicalizer;
use crate::error::Result;
use crate::event::{CanonicalEvent, Event};
use crate::options::Options;
use crate::reader::XmlReader;
use crate::writer::XmlWriter;

/**
# Source for individual XML events

This trait is implemented by the different parser frontends. It is analogous
to the [`std::io::Read`] trait, but for XML document events instead of bytes.
*/
pub trait EventRead {
	type Output;

	/// Read a single event from the source.
	///
	/// If the end of the document has been reached, `None` is returned.
	///
	/// Errors are fatal (and will be returned again by the source on the
	/// next invocation without reading further data).
	fn read(&mut self) -> Result<Option<Self::Output>>;

	/// Read all events which can be produced from the source.
	///
	/// The given `cb` is invoked for each event.
	fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	where
		F: FnMut(Self::Output) -> (),
	{
		loop {
			match self.read()? {
				None => return Ok(()),
				Some(ev) => cb(ev),
			}
		}
	}

	/// Release the resources held by the source.
	///
	/// Called exactly once by [`canonicalize`] when it is done with the
	/// source, no matter whether processing succeeded.
	fn close(&mut self) -> Result<()> {
		Ok(())
	}
}

/**
# Sink for canonical events

This is the output side of [`canonicalize`], analogous to
[`std::io::Write`] for [`CanonicalEvent`]s.
*/
pub trait EventWrite {
	/// Write a single canonical event.
	fn write(&mut self, ev: CanonicalEvent) -> Result<()>;

	/// Flush and release the resources held by the sink.
	///
	/// Called exactly once by [`canonicalize`] when it is done with the
	/// sink, no matter whether processing succeeded.
	fn close(&mut self) -> Result<()> {
		Ok(())
	}
}

impl<T: EventRead + ?Sized> EventRead for &mut T {
	type Output = T::Output;

	fn read(&mut self) -> Result<Option<Self::Output>> {
		(**self).read()
	}

	fn close(&mut self) -> Result<()> {
		(**self).close()
	}
}

impl<T: EventWrite + ?Sized> EventWrite for &mut T {
	fn write(&mut self, ev: CanonicalEvent) -> Result<()> {
		(**self).write(ev)
	}

	fn close(&mut self) -> Result<()> {
		(**self).close()
	}
}

/// Collects canonical events in memory.
impl EventWrite for Vec<CanonicalEvent> {
	fn write(&mut self, ev: CanonicalEvent) -> Result<()> {
		self.push(ev);
		Ok(())
	}
}

/**
# Event source backed by an iterator

Useful to canonicalize event streams which come from somewhere else than
[`XmlReader`], for instance from a DOM walker or from tests.

```
use smev_transform::{canonicalize, CanonicalEvent, Event, IterSource, Options, QName};

let events = vec![
	Event::StartElement(QName::new("urn:x", "a"), Vec::new()),
	Event::EndElement(QName::new("urn:x", "a")),
];
let mut out: Vec<CanonicalEvent> = Vec::new();
canonicalize(IterSource::new(events), &mut out, &Options::default()).unwrap();
assert_eq!(out.len(), 4);
```
*/
pub struct IterSource<I> {
	inner: I,
}

impl<I: Iterator<Item = Event>> IterSource<I> {
	pub fn new<T: IntoIterator<IntoIter = I, Item = Event>>(events: T) -> Self {
		Self {
			inner: events.into_iter(),
		}
	}
}

impl<I: Iterator<Item = Event>> EventRead for IterSource<I> {
	type Output = Event;

	fn read(&mut self) -> Result<Option<Self::Output>> {
		Ok(self.inner.next())
	}
}

fn pump<S, D>(source: &mut S, sink: &mut D, options: &Options) -> Result<usize>
where
	S: EventRead<Output = Event>,
	D: EventWrite,
{
	let mut c14n = Canonicalizer::with_options(options.clone());
	let mut nevents = 0;
	while let Some(ev) = source.read()? {
		c14n.process_event(ev, |cev| {
			nevents += 1;
			sink.write(cev)
		})?;
	}
	debug!(
		events = nevents,
		prefixes = c14n.prefixes_allocated(),
		"canonicalization finished"
	);
	Ok(nevents)
}

/// Canonicalize all events from `source` into `sink`.
///
/// Events are pulled from the source one at a time, canonicalized and
/// written to the sink immediately.
///
/// When processing ends, the sink and then the source are closed, exactly
/// once each, on success and on failure alike. If processing failed, its
/// error is returned and errors from closing are only logged. Otherwise,
/// the first error from closing is returned.
///
/// Output written to the sink before a failure is incomplete and must be
/// discarded.
pub fn canonicalize<S, D>(mut source: S, mut sink: D, options: &Options) -> Result<()>
where
	S: EventRead<Output = Event>,
	D: EventWrite,
{
	debug!(prefix_base = %options.prefix_base, "canonicalization started");
	let result = pump(&mut source, &mut sink, options);
	let sink_closed = sink.close();
	let source_closed = source.close();
	match result {
		Ok(_) => {
			sink_closed?;
			source_closed?;
			Ok(())
		}
		Err(e) => {
			if let Err(close_err) = sink_closed {
				warn!(error = %close_err, "failed to close sink after error");
			}
			if let Err(close_err) = source_closed {
				warn!(error = %close_err, "failed to close source after error");
			}
			debug!(error = %e, "canonicalization failed");
			Err(e)
		}
	}
}

/// Canonicalize the XML document read from `input` into `output`.
///
/// The output is flushed before returning. On error, whatever has been
/// written to `output` is incomplete and must be discarded.
pub fn process<R: io::BufRead, W: io::Write>(input: R, output: W, options: &Options) -> Result<()> {
	canonicalize(XmlReader::new(input), XmlWriter::new(output), options)
}

/// Canonicalize an XML document held in memory.
///
/// Either the complete canonical form is returned, or an error and no
/// output at all.
///
/// ```
/// use smev_transform::{canonicalize_bytes, Options};
///
/// let out = canonicalize_bytes(b"<x:a xmlns:x='urn:x'> <x:b/> </x:a>", &Options::default()).unwrap();
/// assert_eq!(&out[..], &b"<ns1:a xmlns:ns1=\"urn:x\"><ns1:b></ns1:b></ns1:a>"[..]);
/// ```
pub fn canonicalize_bytes(data: &[u8], options: &Options) -> Result<Vec<u8>> {
	let mut out = Vec::with_capacity(data.len());
	process(data, &mut out, options)?;
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::error::{Error, ErrorKind};
	use crate::event::QName;

	#[derive(Default)]
	struct CountingSource {
		events: Vec<Event>,
		fail_read: bool,
		fail_close: bool,
		closed: usize,
	}

	impl EventRead for CountingSource {
		type Output = Event;

		fn read(&mut self) -> Result<Option<Event>> {
			if self.fail_read {
				return Err(Error::parse("read failed"));
			}
			if self.events.is_empty() {
				Ok(None)
			} else {
				Ok(Some(self.events.remove(0)))
			}
		}

		fn close(&mut self) -> Result<()> {
			self.closed += 1;
			if self.fail_close {
				Err(io::Error::new(io::ErrorKind::Other, "source close failed").into())
			} else {
				Ok(())
			}
		}
	}

	#[derive(Default)]
	struct CountingSink {
		events: Vec<CanonicalEvent>,
		fail_write: bool,
		fail_close: bool,
		closed: usize,
	}

	impl EventWrite for CountingSink {
		fn write(&mut self, ev: CanonicalEvent) -> Result<()> {
			if self.fail_write {
				return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed").into());
			}
			self.events.push(ev);
			Ok(())
		}

		fn close(&mut self) -> Result<()> {
			self.closed += 1;
			if self.fail_close {
				Err(io::Error::new(io::ErrorKind::Other, "sink close failed").into())
			} else {
				Ok(())
			}
		}
	}

	fn valid_events() -> Vec<Event> {
		vec![
			Event::StartDocument,
			Event::StartElement(QName::new("urn:x", "a"), Vec::new()),
			Event::EndElement(QName::new("urn:x", "a")),
			Event::EndDocument,
		]
	}

	#[test]
	fn closes_both_once_on_success() {
		let mut src = CountingSource {
			events: valid_events(),
			..Default::default()
		};
		let mut sink = CountingSink::default();
		canonicalize(&mut src, &mut sink, &Options::default()).unwrap();
		assert_eq!(src.closed, 1);
		assert_eq!(sink.closed, 1);
		assert_eq!(sink.events.len(), 6);
	}

	#[test]
	fn closes_both_once_on_validation_failure() {
		let mut src = CountingSource {
			events: vec![Event::StartElement(QName::unqualified("a"), Vec::new())],
			..Default::default()
		};
		let mut sink = CountingSink::default();
		let r = canonicalize(&mut src, &mut sink, &Options::default());
		assert_eq!(r.unwrap_err().kind(), ErrorKind::InputValidation);
		assert_eq!(src.closed, 1);
		assert_eq!(sink.closed, 1);
		assert!(sink.events.is_empty());
	}

	#[test]
	fn closes_both_once_on_read_failure() {
		let mut src = CountingSource {
			fail_read: true,
			..Default::default()
		};
		let mut sink = CountingSink::default();
		match canonicalize(&mut src, &mut sink, &Options::default()) {
			Err(Error::Parse(msg)) => assert_eq!(msg, "read failed"),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(src.closed, 1);
		assert_eq!(sink.closed, 1);
	}

	#[test]
	fn closes_both_once_on_write_failure() {
		let mut src = CountingSource {
			events: valid_events(),
			..Default::default()
		};
		let mut sink = CountingSink {
			fail_write: true,
			..Default::default()
		};
		match canonicalize(&mut src, &mut sink, &Options::default()) {
			Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(src.closed, 1);
		assert_eq!(sink.closed, 1);
	}

	#[test]
	fn processing_error_wins_over_close_errors() {
		let mut src = CountingSource {
			events: vec![Event::StartElement(QName::unqualified("a"), Vec::new())],
			fail_close: true,
			..Default::default()
		};
		let mut sink = CountingSink {
			fail_close: true,
			..Default::default()
		};
		match canonicalize(&mut src, &mut sink, &Options::default()) {
			Err(Error::MissingNamespace { local_name }) => assert_eq!(local_name, "a"),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(src.closed, 1);
		assert_eq!(sink.closed, 1);
	}

	#[test]
	fn close_error_is_reported_on_success() {
		let mut src = CountingSource {
			events: valid_events(),
			..Default::default()
		};
		let mut sink = CountingSink {
			fail_close: true,
			..Default::default()
		};
		match canonicalize(&mut src, &mut sink, &Options::default()) {
			Err(Error::Io(e)) => assert_eq!(e.to_string(), "sink close failed"),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(src.closed, 1);
	}

	#[test]
	fn iter_source_feeds_vec_sink() {
		let mut out: Vec<CanonicalEvent> = Vec::new();
		canonicalize(IterSource::new(valid_events()), &mut out, &Options::default()).unwrap();
		assert_eq!(out.first(), Some(&CanonicalEvent::StartDocument));
		assert_eq!(out.last(), Some(&CanonicalEvent::EndDocument));
	}

	#[test]
	fn process_writes_canonical_bytes() {
		let mut out = Vec::new();
		process(
			&b"<a xmlns='urn:x' b='1'><!-- c --><c>t</c></a>"[..],
			&mut out,
			&Options::default(),
		)
		.unwrap();
		assert_eq!(
			std::str::from_utf8(&out).unwrap(),
			"<ns1:a xmlns:ns1=\"urn:x\" b=\"1\"><ns1:c>t</ns1:c></ns1:a>"
		);
	}

	#[test]
	fn canonicalize_bytes_returns_nothing_on_error() {
		match canonicalize_bytes(b"<a xmlns='urn:x'><b xmlns=''/></a>", &Options::default()) {
			Err(Error::MissingNamespace { local_name }) => assert_eq!(local_name, "b"),
			other => panic!("unexpected result: {:?}", other),
		}
	}
}
