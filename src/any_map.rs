//! AnyMap: a map whose key and value kinds are chosen at runtime.
//!
//! Every kind pair gets its own monomorphized `PocketMap` as one enum
//! variant, generated by `any_map!` below; the enum is the factory's return
//! type. All operations go through the `ErasedMap` trait, implemented once
//! for every `PocketMap<K, V, S>`, so dispatch costs one match per call and
//! the engine itself is never kind-aware.
//!
//! Values cross this boundary as [`Value`]s. Keys and values are converted
//! (and range-checked) before the map is touched, so a failed call leaves
//! the map as it was for that key.

use crate::adapter::{ByteString, Kind, KindAdapter, Value};
use crate::error::{Error, Result};
use crate::hasher::ByteHasher;
use crate::pocket_map::{Cursor, PocketMap};
use core::fmt;

type Items<'a> = Box<dyn Iterator<Item = (Value, Value)> + 'a>;

/// Object-safe, `Value`-typed view of a `PocketMap`.
trait ErasedMap {
    fn key_kind(&self) -> Kind;
    fn value_kind(&self) -> Kind;
    fn len(&self) -> usize;
    fn generation(&self) -> u64;
    fn contains(&self, key: &Value) -> Result<bool>;
    fn lookup(&self, key: &Value) -> Result<Option<Value>>;
    fn insert(&mut self, key: &Value, value: &Value) -> Result<Option<Value>>;
    fn remove(&mut self, key: &Value) -> Result<Option<Value>>;
    fn pop_last(&mut self) -> Result<(Value, Value)>;
    fn setdefault(&mut self, key: &Value, default: &Value) -> Result<Value>;
    fn clear(&mut self);
    fn items(&self) -> Items<'_>;
    fn cursor(&self) -> Cursor;
    fn advance(&self, cursor: &mut Cursor) -> Result<Option<(Value, Value)>>;
    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<K, V, S> ErasedMap for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    fn key_kind(&self) -> Kind {
        K::KIND
    }

    fn value_kind(&self) -> Kind {
        V::KIND
    }

    fn len(&self) -> usize {
        PocketMap::len(self)
    }

    fn generation(&self) -> u64 {
        PocketMap::generation(self)
    }

    fn contains(&self, key: &Value) -> Result<bool> {
        K::with_view(key, |k| self.contains_key(k))
    }

    fn lookup(&self, key: &Value) -> Result<Option<Value>> {
        K::with_view(key, |k| self.get(k).map(V::read_copy))
    }

    fn insert(&mut self, key: &Value, value: &Value) -> Result<Option<Value>> {
        let k = K::convert(key)?;
        let v = V::convert(value)?;
        Ok(PocketMap::insert(self, k, v).map(|old| old.read_copy()))
    }

    fn remove(&mut self, key: &Value) -> Result<Option<Value>> {
        K::with_view(key, |k| PocketMap::remove(self, k).map(|v| v.read_copy()))
    }

    fn pop_last(&mut self) -> Result<(Value, Value)> {
        let (k, v) = PocketMap::pop_last(self)?;
        Ok((k.read_copy(), v.read_copy()))
    }

    fn setdefault(&mut self, key: &Value, default: &Value) -> Result<Value> {
        let k = K::convert(key)?;
        let d = V::convert(default)?;
        Ok(PocketMap::setdefault(self, k, d).read_copy())
    }

    fn clear(&mut self) {
        PocketMap::clear(self)
    }

    fn items(&self) -> Items<'_> {
        Box::new(self.iter().map(|(k, v)| (k.read_copy(), v.read_copy())))
    }

    fn cursor(&self) -> Cursor {
        PocketMap::cursor(self)
    }

    fn advance(&self, cursor: &mut Cursor) -> Result<Option<(Value, Value)>> {
        Ok(PocketMap::advance(self, cursor)?.map(|(k, v)| (k.read_copy(), v.read_copy())))
    }

    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }

    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

macro_rules! any_map {
    ($($variant:ident => ($kk:ident: $kt:ty, $vk:ident: $vt:ty)),* $(,)?) => {
        /// Map over a runtime-selected `(key kind, value kind)` pair.
        #[derive(Clone)]
        pub enum AnyMap {
            $($variant(PocketMap<$kt, $vt>),)*
        }

        impl AnyMap {
            /// Construct an empty map for the kind pair.
            ///
            /// Fails with [`Error::UnsupportedKind`] if no adapter pair exists.
            #[allow(unreachable_patterns)]
            pub fn create(key: Kind, value: Kind) -> Result<Self> {
                match (key, value) {
                    $((Kind::$kk, Kind::$vk) => Ok(AnyMap::$variant(PocketMap::new())),)*
                    (k, v) => Err(Error::UnsupportedKind(format!("{k}, {v}"))),
                }
            }

            fn erased(&self) -> &dyn ErasedMap {
                match self {
                    $(AnyMap::$variant(m) => m,)*
                }
            }

            fn erased_mut(&mut self) -> &mut dyn ErasedMap {
                match self {
                    $(AnyMap::$variant(m) => m,)*
                }
            }
        }

        /// Equal when both sides have the same kind pair and equal mappings.
        impl PartialEq for AnyMap {
            fn eq(&self, other: &Self) -> bool {
                match (self, other) {
                    $((AnyMap::$variant(a), AnyMap::$variant(b)) => a == b,)*
                    _ => false,
                }
            }
        }

        $(impl From<PocketMap<$kt, $vt>> for AnyMap {
            fn from(m: PocketMap<$kt, $vt>) -> Self {
                AnyMap::$variant(m)
            }
        })*
    };
}

any_map! {
    Int32Int32 => (Int32: i32, Int32: i32),
    Int32Int64 => (Int32: i32, Int64: i64),
    Int32Float32 => (Int32: i32, Float32: f32),
    Int32Float64 => (Int32: i32, Float64: f64),
    Int32Str => (Int32: i32, Str: ByteString),
    Int64Int32 => (Int64: i64, Int32: i32),
    Int64Int64 => (Int64: i64, Int64: i64),
    Int64Float32 => (Int64: i64, Float32: f32),
    Int64Float64 => (Int64: i64, Float64: f64),
    Int64Str => (Int64: i64, Str: ByteString),
    Float32Int32 => (Float32: f32, Int32: i32),
    Float32Int64 => (Float32: f32, Int64: i64),
    Float32Float32 => (Float32: f32, Float32: f32),
    Float32Float64 => (Float32: f32, Float64: f64),
    Float32Str => (Float32: f32, Str: ByteString),
    Float64Int32 => (Float64: f64, Int32: i32),
    Float64Int64 => (Float64: f64, Int64: i64),
    Float64Float32 => (Float64: f64, Float32: f32),
    Float64Float64 => (Float64: f64, Float64: f64),
    Float64Str => (Float64: f64, Str: ByteString),
    StrInt32 => (Str: ByteString, Int32: i32),
    StrInt64 => (Str: ByteString, Int64: i64),
    StrFloat32 => (Str: ByteString, Float32: f32),
    StrFloat64 => (Str: ByteString, Float64: f64),
    StrStr => (Str: ByteString, Str: ByteString),
}

impl AnyMap {
    /// Construct from kind names such as `"str"` and `"int64"`.
    pub fn from_names(key: &str, value: &str) -> Result<Self> {
        Self::create(key.parse()?, value.parse()?)
    }

    pub fn key_kind(&self) -> Kind {
        self.erased().key_kind()
    }

    pub fn value_kind(&self) -> Kind {
        self.erased().value_kind()
    }

    pub fn len(&self) -> usize {
        self.erased().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.erased().generation()
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool> {
        self.erased().contains(key)
    }

    /// Value for `key`; `KeyNotFound` when absent.
    pub fn get(&self, key: &Value) -> Result<Value> {
        self.erased()
            .lookup(key)?
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Value for `key`, or `default` when absent. The key must still convert.
    pub fn get_or(&self, key: &Value, default: Value) -> Result<Value> {
        Ok(self.erased().lookup(key)?.unwrap_or(default))
    }

    /// Insert or overwrite, returning the previous value.
    ///
    /// Both sides are converted before the map is touched; a range or type
    /// error leaves the map unchanged.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
        self.erased_mut().insert(&key.into(), &value.into())
    }

    /// Delete `key`; `KeyNotFound` when absent.
    pub fn remove(&mut self, key: &Value) -> Result<()> {
        self.pop(key).map(drop)
    }

    /// Remove `key` and return its value; `KeyNotFound` when absent.
    pub fn pop(&mut self, key: &Value) -> Result<Value> {
        self.erased_mut()
            .remove(key)?
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    pub fn pop_or(&mut self, key: &Value, default: Value) -> Result<Value> {
        Ok(self.erased_mut().remove(key)?.unwrap_or(default))
    }

    /// Remove the most recently inserted surviving pair; `EmptyMap` when
    /// there is none.
    pub fn pop_last(&mut self) -> Result<(Value, Value)> {
        self.erased_mut().pop_last()
    }

    pub fn setdefault(&mut self, key: impl Into<Value>, default: impl Into<Value>) -> Result<Value> {
        self.erased_mut().setdefault(&key.into(), &default.into())
    }

    pub fn clear(&mut self) {
        self.erased_mut().clear()
    }

    /// Merge `pairs` in order.
    ///
    /// Stops at the first pair that fails to convert. Pairs before it stay
    /// applied; the failing key is left untouched.
    pub fn update<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let map = self.erased_mut();
        for (k, v) in pairs {
            map.insert(&k, &v)?;
        }
        Ok(())
    }

    /// Merge another map of possibly different kinds, in its iteration order.
    pub fn update_from(&mut self, other: &AnyMap) -> Result<()> {
        let map = self.erased_mut();
        for (k, v) in other.items() {
            map.insert(&k, &v)?;
        }
        Ok(())
    }

    /// Copied `(key, value)` pairs in insertion order.
    pub fn items(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.erased().items()
    }

    pub fn keys(&self) -> impl Iterator<Item = Value> + '_ {
        self.items().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.items().map(|(_, v)| v)
    }

    /// See [`PocketMap::cursor`].
    pub fn cursor(&self) -> Cursor {
        self.erased().cursor()
    }

    pub fn advance(&self, cursor: &mut Cursor) -> Result<Option<(Value, Value)>> {
        self.erased().advance(cursor)
    }
}

impl fmt::Display for AnyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.erased().fmt_display(f)
    }
}

impl fmt::Debug for AnyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.erased().fmt_debug(f)
    }
}
