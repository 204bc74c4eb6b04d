/*!
# Transform configuration
*/
use smartstring::alias::String as SmartString;

/// Options controlling the canonical form.
///
/// The defaults produce the canonical form expected by verifiers of the
/// `urn://smev-gov-ru/xmldsig/transform` algorithm. Changing them yields a
/// form which is still deterministic, but not interoperable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// Stem of synthesized namespace prefixes.
	///
	/// Prefixes are formed by appending the value of the prefix counter to
	/// this stem. The stem must be a valid XML `NCName` start.
	pub prefix_base: SmartString,

	/// Initial value of the prefix counter.
	pub first_prefix_index: usize,
}

impl Options {
	/// Set the [`Options::prefix_base`] value.
	///
	/// # Example
	///
	/// ```
	/// use smev_transform::{Canonicalizer, Options};
	/// let c14n = Canonicalizer::with_options(Options::default().prefix_base("p"));
	/// ```
	pub fn prefix_base<T: Into<SmartString>>(mut self, v: T) -> Options {
		self.prefix_base = v.into();
		self
	}

	/// Set the [`Options::first_prefix_index`] value.
	pub fn first_prefix_index(mut self, v: usize) -> Options {
		self.first_prefix_index = v;
		self
	}
}

impl Default for Options {
	fn default() -> Self {
		Self {
			prefix_base: "ns".into(),
			first_prefix_index: 1,
		}
	}
}
