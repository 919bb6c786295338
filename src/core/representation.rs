//! Purpose: Codec and provider contracts plus the shared delimited-sequence machine.
//! Exports: `Representation`, `RepresentationProvider`, `SharedRepresentation`,
//! `Delimited`, `Sequence`, `ARRAY`, `OBJECT`.
//! Role: Every composite codec (list, map, structure) reads and writes through `Delimited`.
//! Invariants: A representation codes exactly one fully parameterized type.
//! Invariants: Representations are immutable once published and safe to share across threads.
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Representations;
use crate::core::token::{JsonReader, JsonWriter};
use crate::core::types::{RawType, TypeRef};
use crate::core::value::Value;

/// Bidirectional codec for one fully parameterized type.
pub trait Representation: Send + Sync + fmt::Debug {
    fn type_ref(&self) -> &TypeRef;

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error>;

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error>;

    /// Fails when this codec, or one it composes, was published by a structure
    /// construction that was later rolled back. Providers call it before handing
    /// out a cached instance.
    fn ensure_ready(&self) -> Result<(), Error> {
        Ok(())
    }
}

pub type SharedRepresentation = Arc<dyn Representation>;

/// Factory and cache for every parameterization of one raw type.
///
/// Implementations construct at most one representation per distinct parameter
/// list and hand back that same instance on every later request.
pub trait RepresentationProvider: Send + Sync {
    fn raw_type(&self) -> RawType;

    fn representation_for(
        &self,
        registry: &Representations,
        params: &[TypeRef],
    ) -> Result<SharedRepresentation, Error>;
}

pub(crate) fn arity_error(raw: &RawType, expected: usize, params: &[TypeRef]) -> Error {
    let found = params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Error::new(ErrorKind::Configuration).with_message(format!(
        "{raw} takes {expected} type parameter(s), found {} [{found}]",
        params.len()
    ))
}

pub(crate) fn type_mismatch(expected: &TypeRef, found: &Value) -> Error {
    Error::new(ErrorKind::Semantic).with_message(format!(
        "expected {expected} value, found {}",
        found.kind_name()
    ))
}

/// Removes `stale` from a provider cache unless another thread already replaced it.
pub(crate) fn evict<K>(
    cache: &Mutex<HashMap<K, SharedRepresentation>>,
    key: &K,
    stale: &SharedRepresentation,
) where
    K: Eq + Hash,
{
    let mut cache = cache.lock();
    if cache.get(key).is_some_and(|current| Arc::ptr_eq(current, stale)) {
        cache.remove(key);
    }
}

/// Open/close/separator characters of a JSON container.
#[derive(Clone, Copy, Debug)]
pub struct Delimited {
    open: char,
    close: char,
    separator: char,
}

pub const ARRAY: Delimited = Delimited {
    open: '[',
    close: ']',
    separator: ',',
};

pub const OBJECT: Delimited = Delimited {
    open: '{',
    close: '}',
    separator: ',',
};

impl Delimited {
    /// Consumes the opening delimiter, then calls `unit` once per element until
    /// the closing delimiter, consuming separators between elements.
    pub fn read_each<'a, F>(&self, reader: &mut JsonReader<'a>, mut unit: F) -> Result<(), Error>
    where
        F: FnMut(&mut JsonReader<'a>) -> Result<(), Error>,
    {
        reader.skip_white_space().consume(self.open)?;
        reader.enter()?;
        let mut first = true;
        loop {
            if reader.skip_white_space().cur_char() == Some(self.close) {
                break;
            }
            if !first {
                reader.consume(self.separator)?;
            }
            unit(reader)?;
            first = false;
        }
        reader.consume(self.close)?;
        reader.leave();
        Ok(())
    }

    pub fn begin(&self, writer: &mut JsonWriter) -> Sequence {
        writer.append(self.open);
        Sequence {
            first: true,
            separator: self.separator,
            close: self.close,
        }
    }
}

/// Write side of `Delimited`; separators go before every emitted item but the first.
#[derive(Debug)]
pub struct Sequence {
    first: bool,
    separator: char,
    close: char,
}

impl Sequence {
    pub fn item(&mut self, writer: &mut JsonWriter) {
        if !self.first {
            writer.append(self.separator);
        }
        self.first = false;
    }

    pub fn is_first(&self) -> bool {
        self.first
    }

    pub fn end(self, writer: &mut JsonWriter) {
        writer.append(self.close);
    }
}

#[cfg(test)]
mod tests {
    use super::{ARRAY, OBJECT};
    use crate::core::error::ErrorKind;
    use crate::core::token::{JsonReader, JsonWriter};

    fn read_longs(input: &str) -> Result<Vec<i64>, crate::core::error::Error> {
        let mut reader = JsonReader::new(input);
        let mut out = Vec::new();
        ARRAY.read_each(&mut reader, |reader| {
            out.push(reader.read_number()?.as_i64_exact()?);
            Ok(())
        })?;
        reader.expect_end()?;
        Ok(out)
    }

    #[test]
    fn reads_empty_and_populated_sequences() {
        assert_eq!(read_longs("[]").expect("empty"), Vec::<i64>::new());
        assert_eq!(read_longs(" [ 1 , 2,3 ] ").expect("values"), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_missing_and_trailing_separators() {
        for input in ["[1 2]", "[1,]", "[,1]", "[1", "1]"] {
            let err = read_longs(input).expect_err(input);
            assert_eq!(err.kind(), ErrorKind::Protocol, "{input}");
        }
    }

    #[test]
    fn sequence_separates_only_emitted_items() {
        let mut writer = JsonWriter::new();
        let mut seq = OBJECT.begin(&mut writer);
        assert!(seq.is_first());
        seq.item(&mut writer);
        writer.write_long(1);
        seq.item(&mut writer);
        writer.write_long(2);
        seq.end(&mut writer);
        assert_eq!(writer.as_str(), "{1,2}");
    }
}
