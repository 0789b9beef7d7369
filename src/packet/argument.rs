//! Typed message arguments.

use std::fmt;

use super::{blob_size, string_size};
use crate::core::{
    TAG_ARRAY_CLOSE, TAG_ARRAY_OPEN, TAG_BLOB, TAG_CHAR, TAG_FALSE, TAG_FLOAT32, TAG_FLOAT64,
    TAG_INT32, TAG_INT64, TAG_STRING, TAG_SYMBOL, TAG_TRUE,
};

/// A single OSC argument.
///
/// The variant chosen by the caller determines the type tag written to the
/// wire; there is no runtime type inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// `i` - 32-bit integer.
    Int(i32),
    /// `f` - 32-bit float.
    Float(f32),
    /// `s` - OSC-string.
    String(String),
    /// `S` - alternate string type, for hosts that separate symbols from strings.
    Symbol(String),
    /// `h` - 64-bit integer.
    Long(i64),
    /// `d` - 64-bit float.
    Double(f64),
    /// `b` - length-prefixed byte payload.
    Blob(Vec<u8>),
    /// `c` - ASCII character sent in a 32-bit slot. Other code points are
    /// rejected by the encoder.
    Char(char),
    /// `T` / `F` - carried entirely in the type tag.
    Bool(bool),
    /// `[...]` - ordered elements of any supported kind.
    Array(Vec<Argument>),
}

impl Argument {
    /// Append this argument's type tag(s) to `tags`.
    ///
    /// Arrays write their brackets and one tag per element.
    pub fn write_type_tag(&self, tags: &mut String) {
        match self {
            Argument::Int(_) => tags.push(TAG_INT32),
            Argument::Float(_) => tags.push(TAG_FLOAT32),
            Argument::String(_) => tags.push(TAG_STRING),
            Argument::Symbol(_) => tags.push(TAG_SYMBOL),
            Argument::Long(_) => tags.push(TAG_INT64),
            Argument::Double(_) => tags.push(TAG_FLOAT64),
            Argument::Blob(_) => tags.push(TAG_BLOB),
            Argument::Char(_) => tags.push(TAG_CHAR),
            Argument::Bool(true) => tags.push(TAG_TRUE),
            Argument::Bool(false) => tags.push(TAG_FALSE),
            Argument::Array(elements) => {
                tags.push(TAG_ARRAY_OPEN);
                for element in elements {
                    element.write_type_tag(tags);
                }
                tags.push(TAG_ARRAY_CLOSE);
            }
        }
    }

    /// Type tag string for this argument alone (without the leading comma).
    pub fn type_tag(&self) -> String {
        let mut tags = String::new();
        self.write_type_tag(&mut tags);
        tags
    }

    /// Number of payload bytes this argument occupies on the wire.
    pub fn wire_size(&self) -> usize {
        match self {
            Argument::Int(_) | Argument::Float(_) | Argument::Char(_) => 4,
            Argument::Long(_) | Argument::Double(_) => 8,
            Argument::String(s) | Argument::Symbol(s) => string_size(s),
            Argument::Blob(bytes) => blob_size(bytes),
            Argument::Bool(_) => 0,
            Argument::Array(elements) => elements.iter().map(Argument::wire_size).sum(),
        }
    }

    /// Array nesting depth: 0 for scalars, 1 for a flat array.
    pub fn nesting_depth(&self) -> usize {
        match self {
            Argument::Array(elements) => {
                1 + elements.iter().map(Argument::nesting_depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// First `Char` that cannot be encoded, searching arrays depth-first.
    pub fn non_ascii_char(&self) -> Option<char> {
        match self {
            Argument::Char(c) if !c.is_ascii() => Some(*c),
            Argument::Array(elements) => elements.iter().find_map(Argument::non_ascii_char),
            _ => None,
        }
    }

    /// Get the value as an `i32`, if this is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Argument::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an `f32`, if this is a `Float`.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Argument::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice, for `String` and `Symbol`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(s) | Argument::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a `bool`, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the elements, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[Argument]> {
        match self {
            Argument::Array(elements) => Some(elements),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(v) => write!(f, "{v}"),
            Argument::Float(v) => write!(f, "{v}"),
            Argument::String(s) | Argument::Symbol(s) => write!(f, "{s:?}"),
            Argument::Long(v) => write!(f, "{v}"),
            Argument::Double(v) => write!(f, "{v}"),
            Argument::Blob(bytes) => write!(f, "<blob {} bytes>", bytes.len()),
            Argument::Char(c) => write!(f, "{c:?}"),
            Argument::Bool(v) => write!(f, "{v}"),
            Argument::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i32> for Argument {
    fn from(v: i32) -> Self {
        Argument::Int(v)
    }
}

impl From<f32> for Argument {
    fn from(v: f32) -> Self {
        Argument::Float(v)
    }
}

impl From<i64> for Argument {
    fn from(v: i64) -> Self {
        Argument::Long(v)
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Argument::Double(v)
    }
}

impl From<bool> for Argument {
    fn from(v: bool) -> Self {
        Argument::Bool(v)
    }
}

impl From<char> for Argument {
    fn from(v: char) -> Self {
        Argument::Char(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Argument::String(v.to_owned())
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Argument::String(v)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(v: Vec<u8>) -> Self {
        Argument::Blob(v)
    }
}

impl From<&[u8]> for Argument {
    fn from(v: &[u8]) -> Self {
        Argument::Blob(v.to_vec())
    }
}

impl From<Vec<Argument>> for Argument {
    fn from(v: Vec<Argument>) -> Self {
        Argument::Array(v)
    }
}
