/*!
# Scope-stack canonicalizer

The [`Canonicalizer`] rewrites a stream of [`Event`]s into a stream of
[`CanonicalEvent`]s such that documents which only differ in prefix
spelling, attribute order or whitespace-only text produce the same output.

Prefixes are not taken from the input. Instead, every namespace name is
bound to a synthesized prefix (`ns1`, `ns2`, ...) on the outermost element
where it is used, and that binding is reused by all descendants until the
element ends.
*/
use std::cmp::Ordering;

use smartstring::alias::String as SmartString;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::event::{Attribute, CanonicalEvent, Event, NamespaceName, QName};
use crate::options::Options;

struct Binding {
	prefix: SmartString,
	namespace: NamespaceName,
}

/// Bindings introduced by one open element.
#[derive(Default)]
struct Scope {
	bindings: Vec<Binding>,
}

/// Look up the prefix bound to `namespace` in any open scope.
///
/// A namespace name is bound at most once along a chain of open elements,
/// so the search order only affects cost.
fn find_prefix<'s>(namespace: &str, scopes: &'s [Scope]) -> Option<&'s SmartString> {
	scopes
		.iter()
		.rev()
		.flat_map(|scope| scope.bindings.iter())
		.find(|binding| &*binding.namespace == namespace)
		.map(|binding| &binding.prefix)
}

/// Whether a text carries no canonical content.
///
/// Everything up to and including U+0020 counts as whitespace here, which
/// matches the trimming rule the canonical form was originally defined
/// with. Notably, non-breaking spaces are significant.
pub(crate) fn is_insignificant(text: &str) -> bool {
	text.chars().all(|ch| ch <= '\u{20}')
}

fn cmp_utf16(a: &str, b: &str) -> Ordering {
	a.encode_utf16().cmp(b.encode_utf16())
}

/// Total order on attribute names used by the canonical form.
///
/// - Namespaced attributes sort before attributes without namespace.
/// - Namespaced attributes are ordered by namespace name, then local name.
/// - Attributes without namespace are ordered by local name.
///
/// Strings are compared by UTF-16 code units.
pub fn compare_attributes(a: &QName, b: &QName) -> Ordering {
	match (a.namespace(), b.namespace()) {
		(None, None) => cmp_utf16(a.local_name(), b.local_name()),
		(Some(ans), Some(bns)) => {
			cmp_utf16(ans, bns).then_with(|| cmp_utf16(a.local_name(), b.local_name()))
		}
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
	}
}

/**
# Namespace-normalizing canonicalizer

The canonicalizer is fed one [`Event`] at a time through
[`process_event`](Self::process_event) and emits the resulting
[`CanonicalEvent`]s through a callback. It keeps one scope per open element
and a prefix counter; both belong to this instance only, so separate
instances can be used concurrently without coordination.

## Example

```
use smev_transform::{Attribute, CanonicalEvent, Canonicalizer, Event, QName};

let mut c14n = Canonicalizer::new();
let mut out = Vec::new();
let events = vec![
	Event::StartElement(
		QName::new("urn:x", "Foo"),
		vec![Attribute::new(QName::unqualified("val"), "1")],
	),
	Event::Text("\n  ".to_string()),
	Event::EndElement(QName::new("urn:x", "Foo")),
];
for ev in events {
	c14n.process_event(ev, |cev| {
		out.push(cev);
		Ok(())
	}).unwrap();
}
match &out[0] {
	CanonicalEvent::StartElement { prefix, .. } => assert_eq!(prefix, "ns1"),
	other => panic!("unexpected event: {:?}", other),
}
// start, namespace declaration, attribute, end marker, end
assert_eq!(out.len(), 5);
```

## Failure

Any error is fatal. Once an error has been returned, the canonicalizer
returns the same error for every further call.
*/
pub struct Canonicalizer {
	options: Options,
	scopes: Vec<Scope>,
	next_prefix: usize,
	poison: Option<Error>,
}

impl Canonicalizer {
	/// Create a canonicalizer producing the default canonical form.
	pub fn new() -> Self {
		Self::with_options(Options::default())
	}

	/// Create a canonicalizer with custom options.
	pub fn with_options(options: Options) -> Self {
		let next_prefix = options.first_prefix_index;
		Self {
			options,
			scopes: Vec::new(),
			next_prefix,
			poison: None,
		}
	}

	/// Number of currently open elements.
	pub fn depth(&self) -> usize {
		self.scopes.len()
	}

	/// Number of prefixes synthesized so far.
	pub fn prefixes_allocated(&self) -> usize {
		self.next_prefix - self.options.first_prefix_index
	}

	fn check_poison(&self) -> Result<()> {
		if let Some(poison) = self.poison.as_ref() {
			return Err(poison.clone());
		}
		Ok(())
	}

	fn allocate_prefix(&mut self) -> Result<SmartString> {
		let index = self.next_prefix;
		// prefixes must never repeat, so the counter may not wrap
		self.next_prefix = index
			.checked_add(1)
			.ok_or(Error::PrefixesExhausted { index })?;
		let mut prefix = self.options.prefix_base.clone();
		prefix.push_str(&index.to_string());
		Ok(prefix)
	}

	/// Return the prefix for `namespace`, binding a fresh one in the
	/// innermost scope if it is not bound yet.
	fn resolve_or_bind(&mut self, namespace: &NamespaceName) -> Result<SmartString> {
		if let Some(prefix) = find_prefix(namespace, &self.scopes) {
			return Ok(prefix.clone());
		}
		let prefix = self.allocate_prefix()?;
		debug!(
			prefix = %prefix,
			namespace = %namespace,
			depth = self.scopes.len(),
			"binding namespace"
		);
		debug_assert!(!self.scopes.is_empty());
		if let Some(scope) = self.scopes.last_mut() {
			scope.bindings.push(Binding {
				prefix: prefix.clone(),
				namespace: namespace.clone(),
			});
		}
		Ok(prefix)
	}

	fn start_element<F>(&mut self, name: QName, mut attributes: Vec<Attribute>, emit: &mut F) -> Result<()>
	where
		F: FnMut(CanonicalEvent) -> Result<()>,
	{
		let (namespace, local_name) = name.into_parts();
		let namespace = match namespace {
			Some(ns) => ns,
			None => {
				return Err(Error::MissingNamespace {
					local_name: local_name.to_string(),
				})
			}
		};

		self.scopes.push(Scope::default());
		let prefix = self.resolve_or_bind(&namespace)?;
		emit(CanonicalEvent::StartElement {
			prefix,
			namespace,
			local_name,
		})?;

		// sort_by is stable, equal names keep their input order
		attributes.sort_by(|a, b| compare_attributes(&a.name, &b.name));
		let mut canonical_attributes = Vec::with_capacity(attributes.len());
		for Attribute { name, value } in attributes {
			let (namespace, local_name) = name.into_parts();
			let prefix = match namespace.as_ref() {
				Some(ns) => Some(self.resolve_or_bind(ns)?),
				None => None,
			};
			canonical_attributes.push(CanonicalEvent::Attribute {
				prefix,
				namespace,
				local_name,
				value,
			});
		}

		if let Some(scope) = self.scopes.last() {
			for binding in scope.bindings.iter() {
				emit(CanonicalEvent::Namespace {
					prefix: binding.prefix.clone(),
					namespace: binding.namespace.clone(),
				})?;
			}
		}
		for attribute in canonical_attributes {
			emit(attribute)?;
		}
		Ok(())
	}

	fn end_element<F>(&mut self, name: QName, emit: &mut F) -> Result<()>
	where
		F: FnMut(CanonicalEvent) -> Result<()>,
	{
		let (namespace, local_name) = name.into_parts();
		let namespace = match namespace {
			Some(ns) => ns,
			None => {
				return Err(Error::MissingNamespace {
					local_name: local_name.to_string(),
				})
			}
		};
		let prefix = match find_prefix(&namespace, &self.scopes) {
			Some(prefix) => prefix.clone(),
			None => {
				return Err(Error::UnboundNamespace {
					namespace: namespace.to_string(),
					local_name: local_name.to_string(),
				})
			}
		};

		emit(CanonicalEvent::Text(String::new()))?;
		emit(CanonicalEvent::EndElement {
			prefix,
			namespace,
			local_name,
		})?;
		self.scopes.pop();
		Ok(())
	}

	fn handle<F>(&mut self, ev: Event, emit: &mut F) -> Result<()>
	where
		F: FnMut(CanonicalEvent) -> Result<()>,
	{
		match ev {
			Event::StartDocument => emit(CanonicalEvent::StartDocument),
			Event::EndDocument => emit(CanonicalEvent::EndDocument),
			Event::StartElement(name, attributes) => self.start_element(name, attributes, emit),
			Event::EndElement(name) => self.end_element(name, emit),
			Event::Text(text) => {
				if is_insignificant(&text) {
					trace!(len = text.len(), "dropping whitespace-only text");
					Ok(())
				} else {
					emit(CanonicalEvent::Text(text))
				}
			}
			Event::Attribute(attr) => {
				trace!(name = %attr.name, "ignoring standalone attribute");
				Ok(())
			}
		}
	}

	/// Process a single event.
	///
	/// The canonical events resulting from `ev` are passed to `emit`, in
	/// order. Errors returned by `emit` are forwarded.
	///
	/// If processing fails, the error is returned and the canonicalizer is
	/// poisoned: it will return the same error on every subsequent call,
	/// without looking at the event.
	pub fn process_event<F>(&mut self, ev: Event, mut emit: F) -> Result<()>
	where
		F: FnMut(CanonicalEvent) -> Result<()>,
	{
		self.check_poison()?;
		trace!(event = ?ev, "canonicalizing");
		match self.handle(ev, &mut emit) {
			Ok(()) => Ok(()),
			Err(e) => {
				self.poison = Some(e.clone());
				Err(e)
			}
		}
	}
}

impl Default for Canonicalizer {
	fn default() -> Self {
		Self::new()
	}
}
