/*!
# Strongly-typed strings for XML names

This module defines string- and str-like types which carry the guarantee that
their content conforms to a production of the XML 1.0 grammar. The
[`Encoder`](crate::sink::encoder::Encoder) converts every name it receives
into one of these before writing it, which is where invalid names are caught.

## Type Overview

- [`Name`] and [`NameStr`] represent the `Name` production and are used for
  element and attribute names as they appear in markup (prefix included).
- [`NCName`] and [`NCNameStr`] represent the `Name` production but without a
  colon inside; they are used for namespace prefixes and for local names
  which get qualified with a prefix.

Owned values are constructed through [`std::convert::TryFrom`] from `&str`,
[`String`] and [`smartstring::alias::String`]. `&NameStr` and `&NCNameStr`
are obtained from `&str` the same way.
*/

use std::borrow::{Borrow, ToOwned};
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::ops::Deref;

use smartstring::alias::String as SmartString;

use crate::validation::{validate_name, validate_ncname, ValidationError};

macro_rules! name_string_type {
	(
		$(#[$outer:meta])*
		pub struct $name:ident(SmartString) use $check:ident => $borrowed:ident;
	) => {
		$(#[$outer])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
		#[repr(transparent)]
		pub struct $name(SmartString);

		impl $name {
			/// Extract the inner string and return it.
			pub fn into_inner(self) -> SmartString {
				self.0
			}

			/// Obtain a reference to the inner string slice.
			pub fn as_str(&self) -> &str {
				self.0.as_str()
			}

			/// Construct without checking the content.
			///
			/// # Safety
			///
			/// The caller is responsible for ensuring that `s` conforms to
			/// the production enforced by this type.
			pub unsafe fn from_string_unchecked<T: Into<SmartString>>(s: T) -> Self {
				Self(s.into())
			}
		}

		impl Deref for $name {
			type Target = $borrowed;

			fn deref(&self) -> &Self::Target {
				// SAFETY: both halves of the pair are checked by the same
				// function.
				unsafe { $borrowed::from_str_unchecked(&self.0) }
			}
		}

		impl Borrow<$borrowed> for $name {
			fn borrow(&self) -> &$borrowed {
				self
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				self.0.as_str() == other
			}
		}

		impl PartialEq<&str> for $name {
			fn eq(&self, other: &&str) -> bool {
				self.0.as_str() == *other
			}
		}

		impl From<$name> for String {
			fn from(other: $name) -> Self {
				other.0.into()
			}
		}

		impl TryFrom<SmartString> for $name {
			type Error = ValidationError;

			fn try_from(other: SmartString) -> Result<Self, Self::Error> {
				$check(&other)?;
				Ok($name(other))
			}
		}

		impl TryFrom<String> for $name {
			type Error = ValidationError;

			fn try_from(other: String) -> Result<Self, Self::Error> {
				$check(&other)?;
				Ok($name(other.into()))
			}
		}

		impl TryFrom<&str> for $name {
			type Error = ValidationError;

			fn try_from(other: &str) -> Result<Self, Self::Error> {
				$check(other)?;
				Ok($name(other.into()))
			}
		}

		impl fmt::Display for $name {
			fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
				f.write_str(&self.0)
			}
		}
	};
}

macro_rules! name_str_type {
	(
		$(#[$outer:meta])*
		pub struct $name:ident(str) use $check:ident => $owned:ident;
	) => {
		$(#[$outer])*
		#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
		#[repr(transparent)]
		pub struct $name(str);

		impl $name {
			/// Check `s` and return it as a typed slice.
			pub fn from_str(s: &str) -> Result<&Self, ValidationError> {
				s.try_into()
			}

			/// Construct without checking the content.
			///
			/// # Safety
			///
			/// The caller is responsible for ensuring that `s` conforms to
			/// the production enforced by this type.
			pub unsafe fn from_str_unchecked(s: &str) -> &Self {
				// SAFETY: repr(transparent) over str
				&*(s as *const str as *const $name)
			}

			/// Obtain the plain string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				&self.0 == other
			}
		}

		impl ToOwned for $name {
			type Owned = $owned;

			fn to_owned(&self) -> Self::Owned {
				// SAFETY: the borrowed half was checked with the same
				// function.
				unsafe { $owned::from_string_unchecked(&self.0) }
			}
		}

		impl<'x> TryFrom<&'x str> for &'x $name {
			type Error = ValidationError;

			fn try_from(other: &'x str) -> Result<Self, Self::Error> {
				$check(other)?;
				// SAFETY: the content check is executed right above.
				Ok(unsafe { $name::from_str_unchecked(other) })
			}
		}

		impl fmt::Display for $name {
			fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
				f.write_str(&self.0)
			}
		}
	};
}

name_string_type! {
	/// String which conforms to the Name production of XML 1.0.
	///
	/// # Formal definition
	///
	/// ```text
	/// [4]  NameStartChar ::= ":" | [A-Z] | "_" | [a-z] | [#xC0-#xD6]
	///                        | [#xD8-#xF6] | [#xF8-#x2FF] | [#x370-#x37D]
	///                        | [#x37F-#x1FFF] | [#x200C-#x200D]
	///                        | [#x2070-#x218F] | [#x2C00-#x2FEF]
	///                        | [#x3001-#xD7FF] | [#xF900-#xFDCF]
	///                        | [#xFDF0-#xFFFD] | [#x10000-#xEFFFF]
	/// [4a] NameChar      ::= NameStartChar | "-" | "." | [0-9] | #xB7
	///                        | [#x0300-#x036F] | [#x203F-#x2040]
	/// [5]  Name          ::= NameStartChar (NameChar)*
	/// ```
	pub struct Name(SmartString) use validate_name => NameStr;
}

name_str_type! {
	/// str which conforms to the Name production of XML 1.0.
	///
	/// See [`Name`] for the formal definition.
	pub struct NameStr(str) use validate_name => Name;
}

name_string_type! {
	/// String which conforms to the NCName production of Namespaces in XML
	/// 1.0, i.e. a [`Name`] without any colon.
	pub struct NCName(SmartString) use validate_ncname => NCNameStr;
}

name_str_type! {
	/// str which conforms to the NCName production of Namespaces in XML 1.0.
	pub struct NCNameStr(str) use validate_ncname => NCName;
}

impl NCNameStr {
	/// Access the string as [`NameStr`].
	///
	/// This operation is O(1), as Names are a strict superset of NCNames.
	pub fn as_namestr(&self) -> &NameStr {
		// SAFETY: NCName is a strict subset of Name
		unsafe { NameStr::from_str_unchecked(&self.0) }
	}

	/// Compose `self` as prefix and `suffix` as local name into one
	/// [`Name`], separated by a colon.
	///
	/// # Example
	///
	/// ```
	/// # use std::convert::TryInto;
	/// # use nswriter::strings::NCNameStr;
	/// let prefix: &NCNameStr = "foo".try_into().unwrap();
	/// let local: &NCNameStr = "sku".try_into().unwrap();
	/// assert_eq!(prefix.with_suffix(local), "foo:sku");
	/// ```
	pub fn with_suffix(&self, suffix: &NCNameStr) -> Name {
		let mut s = SmartString::new();
		s.push_str(&self.0);
		s.push(':');
		s.push_str(&suffix.0);
		// SAFETY: an NCName contains no colon; two NCNames joined by one
		// colon form a Name.
		unsafe { Name::from_string_unchecked(s) }
	}
}

impl From<NCName> for Name {
	fn from(other: NCName) -> Self {
		// SAFETY: NCName is a strict subset of Name
		unsafe { Name::from_string_unchecked(other.0) }
	}
}
