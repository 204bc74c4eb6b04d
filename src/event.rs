/*!
# Input and canonical events

[`Event`]s are what a parser front-end (such as [`XmlReader`]) produces and
what the [`Canonicalizer`] consumes. [`CanonicalEvent`]s are what the
canonicalizer produces and what an output sink (such as [`XmlWriter`])
renders to bytes.

   [`XmlReader`]: crate::XmlReader
   [`XmlWriter`]: crate::XmlWriter
   [`Canonicalizer`]: crate::Canonicalizer
*/
use std::fmt;
#[cfg(not(feature = "mt"))]
use std::rc::Rc;
#[cfg(feature = "mt")]
use std::sync::Arc;

use smartstring::alias::String as SmartString;

/// Wrapper pointer around namespace URIs
///
/// In builds with the `mt` feature, this is a [`Arc`]. In non-`mt` builds,
/// this is a [`std::rc::Rc`]
#[cfg(feature = "mt")]
pub type RcPtr<T> = Arc<T>;
/// Wrapper pointer around namespace URIs
///
/// In builds with the `mt` feature, this is a [`std::sync::Arc`].
/// In non-`mt` builds, this is a [`Rc`].
#[cfg(not(feature = "mt"))]
pub type RcPtr<T> = Rc<T>;

/// Shared namespace URI
pub type NamespaceName = RcPtr<str>;

/// Convert a namespace URI into a [`NamespaceName`].
///
/// The empty string denotes "no namespace" and maps to `None`.
pub fn namespace_name(uri: &str) -> Option<NamespaceName> {
	if uri.is_empty() {
		None
	} else {
		Some(RcPtr::from(uri))
	}
}

/// Pair of an optional namespace name (URI) and a local name, used in
/// element and attribute names.
///
/// A present namespace name is never empty: constructors map the empty
/// string to "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
	namespace: Option<NamespaceName>,
	local_name: SmartString,
}

impl QName {
	/// Create a name from a namespace URI and a local name.
	///
	/// An empty `namespace` is treated as "no namespace".
	pub fn new<L: Into<SmartString>>(namespace: &str, local_name: L) -> Self {
		Self::from_parts(namespace_name(namespace), local_name)
	}

	/// Create a name without namespace.
	pub fn unqualified<L: Into<SmartString>>(local_name: L) -> Self {
		Self {
			namespace: None,
			local_name: local_name.into(),
		}
	}

	/// Create a name from an already shared namespace name.
	pub fn from_parts<L: Into<SmartString>>(
		namespace: Option<NamespaceName>,
		local_name: L,
	) -> Self {
		Self {
			namespace: namespace.filter(|ns| !ns.is_empty()),
			local_name: local_name.into(),
		}
	}

	/// The namespace name, if any.
	pub fn namespace(&self) -> Option<&NamespaceName> {
		self.namespace.as_ref()
	}

	/// The local name.
	pub fn local_name(&self) -> &str {
		&self.local_name
	}

	/// Split the name into its namespace name and local name.
	pub fn into_parts(self) -> (Option<NamespaceName>, SmartString) {
		(self.namespace, self.local_name)
	}
}

impl fmt::Display for QName {
	/// Format the name in Clark notation (`{uri}local`).
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.namespace.as_ref() {
			Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
			None => f.write_str(&self.local_name),
		}
	}
}

/// A single attribute of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	/// Namespace name / local name pair of the attribute.
	pub name: QName,
	/// Attribute value, with references expanded.
	pub value: String,
}

impl Attribute {
	pub fn new<V: Into<String>>(name: QName, value: V) -> Self {
		Self {
			name,
			value: value.into(),
		}
	}
}

/**
# Parsed XML document parts

The term *Event* is borrowed from SAX/StAX terminology. Each [`Event`]
refers to a bit of the XML document which has been parsed, in document
order.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	/// Start of the document.
	StartDocument,

	/// End of the document.
	EndDocument,

	/// The start of an XML element.
	StartElement(
		/// The namespace URI / local name pair of the element.
		QName,
		/// Attributes declared on the element, without namespace
		/// declarations.
		Vec<Attribute>,
	),

	/// The end of an XML element.
	EndElement(
		/// The namespace URI / local name pair of the element.
		QName,
	),

	/// Character data, with references expanded.
	///
	/// **Note:** Multiple consecutive `Text` events may be emitted for a
	/// single run of text.
	Text(String),

	/// An attribute reported on its own instead of with its element.
	///
	/// The canonicalizer ignores these; only attributes attached to a
	/// [`Event::StartElement`] are processed.
	Attribute(Attribute),
}

/**
# Canonical XML document parts

Output of the [`Canonicalizer`](crate::Canonicalizer). The events of an
element header arrive as one `StartElement`, followed by the `Namespace`
declarations introduced on that element, followed by its `Attribute`s.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalEvent {
	/// Start of the document.
	StartDocument,

	/// End of the document.
	EndDocument,

	/// The start of an element header.
	StartElement {
		prefix: SmartString,
		namespace: NamespaceName,
		local_name: SmartString,
	},

	/// A namespace declaration on the current element header.
	Namespace {
		prefix: SmartString,
		namespace: NamespaceName,
	},

	/// An attribute on the current element header.
	///
	/// Attributes without namespace carry neither prefix nor namespace.
	Attribute {
		prefix: Option<SmartString>,
		namespace: Option<NamespaceName>,
		local_name: SmartString,
		value: String,
	},

	/// Character data.
	///
	/// An empty text is emitted in front of every `EndElement`; it carries
	/// no content.
	Text(String),

	/// The end of an element.
	EndElement {
		prefix: SmartString,
		namespace: NamespaceName,
		local_name: SmartString,
	},
}
