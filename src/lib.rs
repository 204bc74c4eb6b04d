/*!
# Canonicalizing pre-digest transform for XML signatures

This crate implements the transform identified by
`urn://smev-gov-ru/xmldsig/transform`. It rewrites an XML document into a
canonical form before it is digested, so that documents which differ only in
namespace prefix spelling, attribute order or formatting whitespace digest
identically.

## Canonical form

* Namespace prefixes are discarded and replaced by synthesized prefixes
  `ns1`, `ns2`, ... in order of first use. A prefix is declared on the
  outermost element using it and reused by its descendants.
* Attributes are sorted: namespaced attributes first, by namespace name and
  local name, then attributes without namespace, by local name.
* Text consisting only of whitespace is dropped; other text is kept verbatim.
* Comments, processing instructions and the XML declaration are dropped.
* Elements are never written as empty-element tags.
* Elements without namespace are rejected.

## Example

```
use smev_transform::{canonicalize_bytes, Options};

let doc = br#"<?xml version="1.0"?>
<a:Foo xmlns:a="urn:x" xmlns:b="urn:y" val="1" b:id="2">
  <a:Bar/>
</a:Foo>"#;
let out = canonicalize_bytes(doc, &Options::default()).unwrap();
assert_eq!(
	std::str::from_utf8(&out).unwrap(),
	r#"<ns1:Foo xmlns:ns1="urn:x" xmlns:ns2="urn:y" ns2:id="2" val="1"><ns1:Bar></ns1:Bar></ns1:Foo>"#,
);
```

## High-level usage

### Signature pipelines

[`SmevTransform`] implements the [`Transform`] trait, which maps octets to
octets and carries the algorithm URI ([`ALGORITHM_URN`]).

### Streams

[`process`] canonicalizes from an [`std::io::BufRead`] into an
[`std::io::Write`]. With the `async` feature, [`process_async`] does the same
for tokio streams.

### Event level

The [`Canonicalizer`] works on [`Event`]s and produces [`CanonicalEvent`]s.
It can be driven directly, or through [`canonicalize`], which connects any
[`EventRead`] source with any [`EventWrite`] sink and takes care of closing
both.

## Logging

The crate logs through `tracing`. It does not install a subscriber.
*/
pub mod canonical;
pub mod driver;
pub mod error;
pub mod event;
#[cfg(feature = "async")]
mod future;
pub mod options;
pub mod reader;
pub mod transform;
pub mod writer;


#[doc(inline)]
pub use canonical::{compare_attributes, Canonicalizer};
#[doc(inline)]
pub use driver::{canonicalize, canonicalize_bytes, process, EventRead, EventWrite, IterSource};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use event::{namespace_name, Attribute, CanonicalEvent, Event, NamespaceName, QName, RcPtr};
#[cfg(feature = "async")]
#[doc(inline)]
pub use future::process_async;
#[doc(inline)]
pub use options::Options;
#[doc(inline)]
pub use reader::XmlReader;
#[doc(inline)]
pub use transform::{SignatureInput, SmevTransform, Transform, ALGORITHM_URN};
#[doc(inline)]
pub use writer::{EncodeError, Encoder, XmlWriter};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
