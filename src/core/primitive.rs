//! Purpose: Leaf codecs for Boolean, Double, Long, String, and Date.
//! Exports: `PrimitiveProvider` and the five leaf representations.
//! Role: Terminal cases of recursive resolution; one shared instance per provider.
//! Invariants: Primitive providers accept no type parameters.
//! Invariants: Long/Date decoding never truncates a fractional number.
//! Notes: Date travels as epoch milliseconds on the Long token kind.
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Representations;
use crate::core::representation::{
    Representation, RepresentationProvider, SharedRepresentation, type_mismatch,
};
use crate::core::token::{JsonReader, JsonWriter};
use crate::core::types::{RawType, TypeRef};
use crate::core::value::{Value, date_from_millis, date_to_millis};

pub struct PrimitiveProvider {
    raw: RawType,
    representation: SharedRepresentation,
}

impl PrimitiveProvider {
    pub fn boolean() -> Self {
        Self::new(RawType::Boolean, Arc::new(BooleanRepresentation::default()))
    }

    pub fn double() -> Self {
        Self::new(RawType::Double, Arc::new(DoubleRepresentation::default()))
    }

    pub fn long() -> Self {
        Self::new(RawType::Long, Arc::new(LongRepresentation::default()))
    }

    pub fn string() -> Self {
        Self::new(RawType::String, Arc::new(StringRepresentation::default()))
    }

    pub fn date() -> Self {
        Self::new(RawType::Date, Arc::new(DateRepresentation::default()))
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::boolean(),
            Self::double(),
            Self::long(),
            Self::string(),
            Self::date(),
        ]
    }

    fn new(raw: RawType, representation: SharedRepresentation) -> Self {
        Self {
            raw,
            representation,
        }
    }
}

impl RepresentationProvider for PrimitiveProvider {
    fn raw_type(&self) -> RawType {
        self.raw.clone()
    }

    fn representation_for(
        &self,
        _registry: &Representations,
        params: &[TypeRef],
    ) -> Result<SharedRepresentation, Error> {
        if !params.is_empty() {
            return Err(Error::new(ErrorKind::Configuration)
                .with_message(format!("{} takes no type parameters", self.raw)));
        }
        Ok(Arc::clone(&self.representation))
    }
}

#[derive(Debug)]
pub struct BooleanRepresentation {
    ty: TypeRef,
}

impl Default for BooleanRepresentation {
    fn default() -> Self {
        Self {
            ty: TypeRef::boolean(),
        }
    }
}

impl Representation for BooleanRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        reader.read_boolean().map(Value::Boolean)
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::Boolean(flag) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        writer.write_boolean(*flag);
        Ok(())
    }
}

#[derive(Debug)]
pub struct DoubleRepresentation {
    ty: TypeRef,
}

impl Default for DoubleRepresentation {
    fn default() -> Self {
        Self {
            ty: TypeRef::double(),
        }
    }
}

impl Representation for DoubleRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        reader.read_number()?.as_f64().map(Value::Double)
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::Double(number) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        writer.write_double(*number)
    }
}

#[derive(Debug)]
pub struct LongRepresentation {
    ty: TypeRef,
}

impl Default for LongRepresentation {
    fn default() -> Self {
        Self {
            ty: TypeRef::long(),
        }
    }
}

impl Representation for LongRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        reader.read_number()?.as_i64_exact().map(Value::Long)
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::Long(number) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        writer.write_long(*number);
        Ok(())
    }
}

#[derive(Debug)]
pub struct StringRepresentation {
    ty: TypeRef,
}

impl Default for StringRepresentation {
    fn default() -> Self {
        Self {
            ty: TypeRef::string(),
        }
    }
}

impl Representation for StringRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        reader.read_string().map(Value::String)
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::String(text) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        writer.write_string(text)
    }
}

#[derive(Debug)]
pub struct DateRepresentation {
    ty: TypeRef,
}

impl Default for DateRepresentation {
    fn default() -> Self {
        Self {
            ty: TypeRef::date(),
        }
    }
}

impl Representation for DateRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        let number = reader.read_number()?;
        let millis = number.as_i64_exact()?;
        date_from_millis(millis).map(Value::Date)
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::Date(date) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        writer.write_long(date_to_millis(date));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PrimitiveProvider;
    use crate::core::error::ErrorKind;
    use crate::core::registry::Representations;
    use crate::core::representation::RepresentationProvider;
    use crate::core::token::{JsonReader, JsonWriter};
    use crate::core::types::TypeRef;
    use crate::core::value::{Value, date_from_millis};

    #[test]
    fn provider_returns_one_instance_and_rejects_params() {
        let registry = Representations::new();
        let provider = PrimitiveProvider::long();
        let first = provider.representation_for(&registry, &[]).expect("long");
        let second = provider.representation_for(&registry, &[]).expect("long");
        assert!(Arc::ptr_eq(&first, &second));

        let err = provider
            .representation_for(&registry, &[TypeRef::string()])
            .err()
            .expect("params rejected");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn long_rejects_fractional_input() {
        let registry = Representations::new();
        let long = registry.for_type(&TypeRef::long()).expect("long");
        let err = long
            .read(&mut JsonReader::new("1.5"))
            .expect_err("fractional");
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(
            long.read(&mut JsonReader::new("12")).expect("integral"),
            Value::Long(12)
        );
    }

    #[test]
    fn long_and_date_keep_every_digit() {
        let registry = Representations::new();
        let err = registry
            .decode_str(&TypeRef::long(), "1.0000000000000001")
            .expect_err("hidden fraction");
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(
            registry
                .decode_str(&TypeRef::long(), "9007199254740993.0")
                .expect("exact"),
            Value::Long(9_007_199_254_740_993)
        );
        let err = registry
            .decode_str(&TypeRef::date(), "86400000.0000000001")
            .expect_err("fractional millis");
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(
            registry
                .decode_str(&TypeRef::date(), "8.64e7")
                .expect("scaled millis"),
            Value::Date(date_from_millis(86_400_000).expect("date"))
        );
    }

    #[test]
    fn date_uses_epoch_millis() {
        let registry = Representations::new();
        let date = registry.for_type(&TypeRef::date()).expect("date");
        let value = Value::Date(date_from_millis(86_400_000).expect("date"));
        let mut writer = JsonWriter::new();
        date.write(&value, &mut writer).expect("write");
        assert_eq!(writer.as_str(), "86400000");
        let decoded = date
            .read(&mut JsonReader::new(writer.as_str()))
            .expect("read");
        assert_eq!(decoded, value);
    }

    #[test]
    fn write_rejects_wrong_kind() {
        let registry = Representations::new();
        let boolean = registry.for_type(&TypeRef::boolean()).expect("boolean");
        let err = boolean
            .write(&Value::from("yes"), &mut JsonWriter::new())
            .expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn double_and_string_use_native_literals() {
        let registry = Representations::new();
        let double = registry.for_type(&TypeRef::double()).expect("double");
        let string = registry.for_type(&TypeRef::string()).expect("string");
        let mut writer = JsonWriter::new();
        double.write(&Value::Double(2.5), &mut writer).expect("double");
        writer.append(',');
        string
            .write(&Value::from("é\n"), &mut writer)
            .expect("string");
        assert_eq!(writer.as_str(), "2.5,\"é\\n\"");
    }
}
