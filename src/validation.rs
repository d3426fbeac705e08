/*!
# Validator functions for XML-related strings

Character classes from XML 1.0 § 2.2 and § 2.3 and the checks built on top of
them. The [`Encoder`](crate::sink::encoder::Encoder) runs these before any
byte of an item is written, so a rejected item leaves no partial output.
*/
use std::fmt;

/**
Error condition from validating an XML string.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
	/// A Name or NCName was empty.
	EmptyName,
	/// An invalid character was encountered.
	///
	/// This variant contains the character as data.
	InvalidChar(char),
}

impl fmt::Display for ValidationError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::EmptyName => f.write_str("Name and NCName must not be empty"),
			Self::InvalidChar(c) => write!(f, "character U+{:04x} is not allowed", *c as u32),
		}
	}
}

impl std::error::Error for ValidationError {}

/// Valid first characters for an XML Name (XML 1.0 § 2.3 \[4\])
pub fn is_name_start_char(c: char) -> bool {
	matches!(c,
		':' | 'A'..='Z' | '_' | 'a'..='z'
		| '\u{c0}'..='\u{d6}'
		| '\u{d8}'..='\u{f6}'
		| '\u{f8}'..='\u{2ff}'
		| '\u{370}'..='\u{37d}'
		| '\u{37f}'..='\u{1fff}'
		| '\u{200c}'..='\u{200d}'
		| '\u{2070}'..='\u{218f}'
		| '\u{2c00}'..='\u{2fef}'
		| '\u{3001}'..='\u{d7ff}'
		| '\u{f900}'..='\u{fdcf}'
		| '\u{fdf0}'..='\u{fffd}'
		| '\u{10000}'..='\u{effff}'
	)
}

/// Valid non-first characters for an XML Name (XML 1.0 § 2.3 \[4a\])
pub fn is_name_char(c: char) -> bool {
	is_name_start_char(c)
		|| matches!(c,
			'-' | '.' | '0'..='9' | '\u{b7}'
			| '\u{300}'..='\u{36f}'
			| '\u{203f}'..='\u{2040}'
		)
}

/// Valid codepoints for character data (XML 1.0 § 2.2)
///
/// Surrogates cannot occur in a Rust `char`, so only the control characters
/// and the two noncharacters at the end of the BMP need excluding.
pub fn is_xml_char(c: char) -> bool {
	matches!(c,
		'\x09' | '\x0a' | '\x0d'
		| '\u{20}'..='\u{d7ff}'
		| '\u{e000}'..='\u{fffd}'
		| '\u{10000}'..='\u{10ffff}'
	)
}

fn validate_name_with(s: &str, allow_colon: bool) -> Result<(), ValidationError> {
	let mut chars = s.chars();
	match chars.next() {
		// must have at least one char
		None => return Err(ValidationError::EmptyName),
		Some(c) => {
			if !is_name_start_char(c) || (!allow_colon && c == ':') {
				return Err(ValidationError::InvalidChar(c));
			}
		}
	}
	for ch in chars {
		if !is_name_char(ch) || (!allow_colon && ch == ':') {
			return Err(ValidationError::InvalidChar(ch));
		}
	}
	Ok(())
}

/**
Check whether a str is a valid XML 1.0 Name

# Example

```rust
use nswriter::validation::{validate_name, ValidationError};

assert!(validate_name("foobar").is_ok());
assert!(validate_name("xsi:schemaLocation").is_ok());
assert_eq!(validate_name("foo bar"), Err(ValidationError::InvalidChar(' ')));
assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
```
*/
pub fn validate_name(s: &str) -> Result<(), ValidationError> {
	validate_name_with(s, true)
}

/**
Check whether a str is a valid XML 1.0 Name, without colons.

# Example

```rust
use nswriter::validation::{validate_ncname, ValidationError};

assert!(validate_ncname("foobar").is_ok());
assert_eq!(validate_ncname("foo:bar"), Err(ValidationError::InvalidChar(':')));
assert_eq!(validate_ncname(""), Err(ValidationError::EmptyName));
```
*/
pub fn validate_ncname(s: &str) -> Result<(), ValidationError> {
	validate_name_with(s, false)
}

/**
Check whether a str consists only of XML 1.0 Chars

# Example

```rust
use nswriter::validation::{validate_cdata, ValidationError};

assert!(validate_cdata("foo bar baz <fnord!>").is_ok());
assert_eq!(validate_cdata("\x01"), Err(ValidationError::InvalidChar('\x01')));
```
*/
pub fn validate_cdata(s: &str) -> Result<(), ValidationError> {
	match s.chars().find(|ch| !is_xml_char(*ch)) {
		Some(ch) => Err(ValidationError::InvalidChar(ch)),
		None => Ok(()),
	}
}
