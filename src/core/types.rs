//! Purpose: Explicit type keys used to resolve representations.
//! Exports: `RawType`, `TypeRef`.
//! Role: Replaces erased generic types with a tagged raw type plus argument list.
//! Invariants: `Display` output parses back to an equal `TypeRef`.
//! Invariants: Arity is not checked here; providers validate their own arguments.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RawType {
    Boolean,
    Double,
    Long,
    String,
    Date,
    List,
    Map,
    Structure,
    /// A class registered in the registry's catalog.
    Named(Arc<str>),
}

impl RawType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Boolean" => RawType::Boolean,
            "Double" => RawType::Double,
            "Long" => RawType::Long,
            "String" => RawType::String,
            "Date" => RawType::Date,
            "List" => RawType::List,
            "Map" => RawType::Map,
            "Structure" => RawType::Structure,
            other => RawType::Named(Arc::from(other)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RawType::Boolean => "Boolean",
            RawType::Double => "Double",
            RawType::Long => "Long",
            RawType::String => "String",
            RawType::Date => "Date",
            RawType::List => "List",
            RawType::Map => "Map",
            RawType::Structure => "Structure",
            RawType::Named(name) => name,
        }
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A possibly parameterized type, e.g. `Map<String, List<Long>>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    raw: RawType,
    args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn new(raw: RawType, args: Vec<TypeRef>) -> Self {
        Self { raw, args }
    }

    pub fn boolean() -> Self {
        Self::new(RawType::Boolean, Vec::new())
    }

    pub fn double() -> Self {
        Self::new(RawType::Double, Vec::new())
    }

    pub fn long() -> Self {
        Self::new(RawType::Long, Vec::new())
    }

    pub fn string() -> Self {
        Self::new(RawType::String, Vec::new())
    }

    pub fn date() -> Self {
        Self::new(RawType::Date, Vec::new())
    }

    pub fn list(element: TypeRef) -> Self {
        Self::new(RawType::List, vec![element])
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::new(RawType::Map, vec![key, value])
    }

    pub fn named(name: &str) -> Self {
        Self::new(RawType::Named(Arc::from(name)), Vec::new())
    }

    pub fn raw(&self) -> &RawType {
        &self.raw
    }

    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    pub fn class_name(&self) -> Option<&str> {
        match &self.raw {
            RawType::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw.name())?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(">")
    }
}

impl FromStr for TypeRef {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input, pos: 0 };
        let parsed = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(parsed)
    }
}

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn parse_type(&mut self) -> Result<TypeRef, Error> {
        self.skip_ws();
        let name = self.identifier()?;
        let raw = RawType::from_name(name);
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                self.skip_ws();
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
        }
        Ok(TypeRef::new(raw, args))
    }

    fn identifier(&mut self) -> Result<&'a str, Error> {
        let rest: &'a str = &self.input[self.pos..];
        let len = rest
            .char_indices()
            .take_while(|(idx, ch)| {
                ch.is_alphabetic() || *ch == '_' || (*idx > 0 && (ch.is_ascii_digit() || *ch == '.'))
            })
            .map(|(_, ch)| ch.len_utf8())
            .sum::<usize>();
        if len == 0 {
            return Err(self.error("expected type name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.input[self.pos..].starts_with(expected) {
            self.pos += expected.len_utf8();
            return true;
        }
        false
    }

    fn skip_ws(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, message: &str) -> Error {
        Error::new(ErrorKind::Configuration)
            .with_message(format!("invalid type expression '{}': {message}", self.input))
            .with_offset(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::{RawType, TypeRef};
    use crate::core::error::ErrorKind;

    #[test]
    fn parses_nested_expressions() {
        let parsed: TypeRef = "Map<String, List<List<Long>>>".parse().expect("parse");
        assert_eq!(
            parsed,
            TypeRef::map(
                TypeRef::string(),
                TypeRef::list(TypeRef::list(TypeRef::long()))
            )
        );
    }

    #[test]
    fn display_round_trips() {
        let original = TypeRef::map(TypeRef::named("app.Person"), TypeRef::list(TypeRef::date()));
        let text = original.to_string();
        assert_eq!(text, "Map<app.Person, List<Date>>");
        assert_eq!(text.parse::<TypeRef>().expect("parse"), original);
    }

    #[test]
    fn unknown_names_become_named_types() {
        let parsed: TypeRef = "Person".parse().expect("parse");
        assert_eq!(parsed.raw(), &RawType::Named("Person".into()));
        assert_eq!(parsed.class_name(), Some("Person"));
    }

    #[test]
    fn arity_is_left_to_providers() {
        let parsed: TypeRef = "List<String, Long>".parse().expect("parse");
        assert_eq!(parsed.args().len(), 2);
    }

    #[test]
    fn malformed_expressions_are_configuration_errors() {
        for input in ["", "List<", "List<String", "Map<String,>", "List<Long> x", "<Long>"] {
            let err = input.parse::<TypeRef>().expect_err(input);
            assert_eq!(err.kind(), ErrorKind::Configuration, "{input}");
        }
    }
}
