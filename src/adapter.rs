//! TypeAdapter: the per-kind contract the engine is monomorphized over.
//!
//! The kind set is closed: `int32`, `int64`, `float32`, `float64` and `str`.
//! Each kind has one `KindAdapter` implementation; the engine never branches
//! on kind. Adding a kind means adding an adapter and a `Kind` variant.
//!
//! Conversion between the engine and whatever embeds it goes through
//! [`Value`], a kind-tagged raw value. Conversion in is width-checked and
//! fails with [`Error::Range`] or [`Error::Type`] before anything is stored.

use crate::error::{Error, Result};
use crate::hasher::ByteHasher;
use core::fmt::{self, Write as _};
use core::str::FromStr;

/// Primitive kind usable as a key or value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Int32,
    Int64,
    Float32,
    Float64,
    Str,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::Int32,
        Kind::Int64,
        Kind::Float32,
        Kind::Float64,
        Kind::Str,
    ];

    /// Name used in the textual form of a map.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Str => "str",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int32" => Ok(Kind::Int32),
            "int64" => Ok(Kind::Int64),
            "float32" => Ok(Kind::Float32),
            "float64" => Ok(Kind::Float64),
            "str" | "string" => Ok(Kind::Str),
            other => Err(Error::UnsupportedKind(other.to_string())),
        }
    }
}

/// Kind-tagged raw value crossing the engine boundary.
///
/// Integers are carried as `i128` so values outside every supported width
/// can still be represented, and rejected, on the way in.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i128),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Value {
    /// Short name of the value's family, used in type errors.
    pub fn family(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bytes(_) => "str",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bytes(b) => write_quoted(b, f),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant($conv(v))
            }
        })*
    };
}

value_from! {
    i32 => Int(i128::from),
    i64 => Int(i128::from),
    u32 => Int(i128::from),
    u64 => Int(i128::from),
    i128 => Int(core::convert::identity),
    f32 => Float(f64::from),
    f64 => Float(core::convert::identity),
    &str => Bytes(|s: &str| s.as_bytes().to_vec()),
    String => Bytes(String::into_bytes),
    &[u8] => Bytes(<[u8]>::to_vec),
    Vec<u8> => Bytes(core::convert::identity),
}

/// Write `bytes` as quoted text. Single quotes are used unless the text
/// holds a single quote and no double quote. Backslashes, the chosen quote
/// and non-printable characters are escaped (`\n`, `\x00`, `\u2028`).
/// Invalid UTF-8 is rendered lossily.
pub(crate) fn write_quoted(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = String::from_utf8_lossy(bytes);
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if c.is_control() && (c as u32) <= 0xff => write!(f, "\\x{:02x}", c as u32)?,
            '\u{2028}' | '\u{2029}' => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Per-kind storage contract.
///
/// - `view` + `Clone` are the read/copy side: a stored item is borrowed as
///   its `View` for lookups and cloned for copies.
/// - `write_copy` builds the owned stored form from a view.
/// - `equals` and `hash` operate on views and must agree: equal views hash
///   the same.
/// - `convert` / `read_copy` are conversion in and out through [`Value`].
pub trait KindAdapter: Clone {
    /// Borrowed form used for lookups (`[u8]` for strings).
    type View: ?Sized;

    const KIND: Kind;

    fn view(&self) -> &Self::View;

    fn write_copy(view: &Self::View) -> Self;

    fn equals(a: &Self::View, b: &Self::View) -> bool;

    fn hash<S: ByteHasher + ?Sized>(view: &Self::View, hasher: &S) -> u64;

    /// Width-checked conversion in.
    fn convert(value: &Value) -> Result<Self>;

    /// Run `f` on the view of a converted value. Adapters with borrowed
    /// views override this to skip the owned copy.
    fn with_view<R>(value: &Value, f: impl FnOnce(&Self::View) -> R) -> Result<R> {
        let owned = Self::convert(value)?;
        Ok(f(owned.view()))
    }

    /// Conversion out.
    fn read_copy(&self) -> Value;

    /// Textual form used by `Display`: decimal integers, shortest
    /// round-trip floats, quoted strings.
    fn fmt_view(view: &Self::View, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Renders a view through its adapter.
pub(crate) struct Repr<'a, A: KindAdapter>(pub &'a A::View);

impl<A: KindAdapter> fmt::Display for Repr<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        A::fmt_view(self.0, f)
    }
}

impl<A: KindAdapter> fmt::Debug for Repr<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        A::fmt_view(self.0, f)
    }
}

fn type_error(expected: Kind, value: &Value) -> Error {
    Error::Type {
        expected,
        found: value.family(),
    }
}

macro_rules! int_adapter {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(impl KindAdapter for $t {
            type View = $t;
            const KIND: Kind = Kind::$kind;

            #[inline]
            fn view(&self) -> &$t {
                self
            }

            #[inline]
            fn write_copy(view: &$t) -> Self {
                *view
            }

            #[inline]
            fn equals(a: &$t, b: &$t) -> bool {
                a == b
            }

            #[inline]
            fn hash<S: ByteHasher + ?Sized>(view: &$t, hasher: &S) -> u64 {
                hasher.hash_bytes(&view.to_le_bytes())
            }

            fn convert(value: &Value) -> Result<Self> {
                match value {
                    Value::Int(i) => <$t>::try_from(*i).map_err(|_| Error::Range {
                        kind: Kind::$kind,
                        value: i.to_string(),
                    }),
                    other => Err(type_error(Kind::$kind, other)),
                }
            }

            fn read_copy(&self) -> Value {
                Value::Int(i128::from(*self))
            }

            fn fmt_view(view: &$t, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{view}")
            }
        })*
    };
}

int_adapter! {
    i32 => Int32,
    i64 => Int64,
}

/// Float kinds compare and hash by bit pattern with `-0.0` folded onto
/// `0.0`, so NaN keys stay retrievable and equal values hash the same.
macro_rules! float_adapter {
    ($($t:ty => $kind:ident, $narrow:expr);* $(;)?) => {
        $(impl KindAdapter for $t {
            type View = $t;
            const KIND: Kind = Kind::$kind;

            #[inline]
            fn view(&self) -> &$t {
                self
            }

            #[inline]
            fn write_copy(view: &$t) -> Self {
                *view
            }

            #[inline]
            fn equals(a: &$t, b: &$t) -> bool {
                let canon = |x: $t| if x == 0.0 { 0 } else { x.to_bits() };
                canon(*a) == canon(*b)
            }

            #[inline]
            fn hash<S: ByteHasher + ?Sized>(view: &$t, hasher: &S) -> u64 {
                let bits = if *view == 0.0 { 0 } else { view.to_bits() };
                hasher.hash_bytes(&bits.to_le_bytes())
            }

            fn convert(value: &Value) -> Result<Self> {
                let wide = match value {
                    Value::Float(x) => *x,
                    Value::Int(i) => *i as f64,
                    other => return Err(type_error(Kind::$kind, other)),
                };
                let narrow: fn(f64) -> Option<$t> = $narrow;
                narrow(wide).ok_or_else(|| Error::Range {
                    kind: Kind::$kind,
                    value: format!("{wide:?}"),
                })
            }

            fn read_copy(&self) -> Value {
                Value::Float(f64::from(*self))
            }

            fn fmt_view(view: &$t, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{view:?}")
            }
        })*
    };
}

float_adapter! {
    f32 => Float32, |x| (!x.is_finite() || x.abs() <= f64::from(f32::MAX)).then_some(x as f32);
    f64 => Float64, Some;
}

/// Owned byte string with explicit length; embedded zero bytes are allowed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteString(Box<[u8]>);

impl ByteString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0.into_vec()
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(&self.0, f)
    }
}

impl From<&[u8]> for ByteString {
    fn from(b: &[u8]) -> Self {
        ByteString(b.into())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(b: Vec<u8>) -> Self {
        ByteString(b.into_boxed_slice())
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        ByteString(s.as_bytes().into())
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        ByteString(s.into_bytes().into_boxed_slice())
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl KindAdapter for ByteString {
    type View = [u8];
    const KIND: Kind = Kind::Str;

    #[inline]
    fn view(&self) -> &[u8] {
        &self.0
    }

    fn write_copy(view: &[u8]) -> Self {
        ByteString(view.into())
    }

    #[inline]
    fn equals(a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    #[inline]
    fn hash<S: ByteHasher + ?Sized>(view: &[u8], hasher: &S) -> u64 {
        hasher.hash_bytes(view)
    }

    fn convert(value: &Value) -> Result<Self> {
        Self::with_view(value, Self::write_copy)
    }

    fn with_view<R>(value: &Value, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        match value {
            Value::Bytes(b) => Ok(f(b.as_slice())),
            other => Err(type_error(Kind::Str, other)),
        }
    }

    fn read_copy(&self) -> Value {
        Value::Bytes(self.0.to_vec())
    }

    fn fmt_view(view: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(view, f)
    }
}
