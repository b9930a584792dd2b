//! Type references as seen through the host compiler's symbol API.
//!
//! A [`TypeRef`] is a fully-qualified, possibly generic type such as
//! `java.util.Set<app.Plugin>`. Common simple names of framework and
//! collection types are canonicalised to their fully-qualified form when a
//! reference is built, so `Set<Foo>` and `java.util.Set<Foo>` denote the same
//! key.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fully-qualified names of types the compiler treats specially.
pub mod names {
    pub const SET: &str = "java.util.Set";
    pub const MAP: &str = "java.util.Map";
    pub const OPTIONAL: &str = "java.util.Optional";
    pub const PROVIDER: &str = "javax.inject.Provider";
    pub const JAKARTA_PROVIDER: &str = "jakarta.inject.Provider";
    pub const LAZY: &str = "dagger.Lazy";
    pub const MEMBERS_INJECTOR: &str = "dagger.MembersInjector";
}

/// Simple names accepted in place of the fully-qualified framework names.
const ALIASES: &[(&str, &str)] = &[
    ("Set", names::SET),
    ("Map", names::MAP),
    ("Optional", names::OPTIONAL),
    ("Provider", names::PROVIDER),
    ("Lazy", names::LAZY),
    ("MembersInjector", names::MEMBERS_INJECTOR),
];

/// Error produced when a type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("empty type name")]
    Empty,
    #[error("unexpected character '{ch}' at offset {offset} in '{input}'")]
    UnexpectedChar {
        ch: char,
        offset: usize,
        input: String,
    },
    #[error("unexpected end of type '{0}'")]
    UnexpectedEnd(String),
}

/// A (possibly generic) type reference.
///
/// # Examples
///
/// ```
/// # use dagger_model::foundation::TypeRef;
/// let ty = TypeRef::parse("Set<app.Plugin>").unwrap();
/// assert!(ty.is_set());
/// assert_eq!(ty.to_string(), "java.util.Set<app.Plugin>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    name: String,
    args: Vec<TypeRef>,
}

impl TypeRef {
    /// Non-generic type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::generic(name, Vec::new())
    }

    /// Generic type with the given arguments.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: canonical_name(name.into()),
            args,
        }
    }

    /// Parses a type from its source form, e.g. `Map<String, Provider<Foo>>`.
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = TypeParser {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos < parser.bytes.len() {
            return Err(parser.unexpected());
        }
        Ok(ty)
    }

    pub fn set_of(element: TypeRef) -> Self {
        Self::generic(names::SET, vec![element])
    }

    pub fn map_of(key: TypeRef, value: TypeRef) -> Self {
        Self::generic(names::MAP, vec![key, value])
    }

    pub fn optional_of(value: TypeRef) -> Self {
        Self::generic(names::OPTIONAL, vec![value])
    }

    pub fn provider_of(value: TypeRef) -> Self {
        Self::generic(names::PROVIDER, vec![value])
    }

    pub fn members_injector_of(target: TypeRef) -> Self {
        Self::generic(names::MEMBERS_INJECTOR, vec![target])
    }

    /// Fully-qualified erased name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    /// Name after the last `.`.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// The only type argument, if this type has exactly one.
    pub fn single_arg(&self) -> Option<&TypeRef> {
        match self.args.as_slice() {
            [arg] => Some(arg),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.name == names::SET && self.args.len() == 1
    }

    pub fn is_map(&self) -> bool {
        self.name == names::MAP && self.args.len() == 2
    }

    pub fn is_optional(&self) -> bool {
        self.name == names::OPTIONAL && self.args.len() == 1
    }

    pub fn is_provider(&self) -> bool {
        (self.name == names::PROVIDER || self.name == names::JAKARTA_PROVIDER)
            && self.args.len() == 1
    }

    pub fn is_lazy(&self) -> bool {
        self.name == names::LAZY && self.args.len() == 1
    }

    pub fn is_members_injector(&self) -> bool {
        self.name == names::MEMBERS_INJECTOR && self.args.len() == 1
    }

    /// Whether this is a type defined by the framework itself
    /// (`Provider`, `Lazy`, `MembersInjector`).
    pub fn is_framework_type(&self) -> bool {
        self.is_provider() || self.is_lazy() || self.is_members_injector()
    }

    /// Identifier-safe rendering of the simple names, used for generated names.
    pub fn mangled(&self) -> String {
        let mut out = self.simple_name().to_string();
        for arg in &self.args {
            out.push_str("Of");
            out.push_str(&arg.mangled());
        }
        out
    }
}

fn canonical_name(name: String) -> String {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, fq)| (*fq).to_string())
        .unwrap_or(name)
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

struct TypeParser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl TypeParser<'_> {
    fn parse_type(&mut self) -> Result<TypeRef, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        if start == self.pos {
            return if self.pos >= self.bytes.len() {
                if self.input.trim().is_empty() {
                    Err(TypeParseError::Empty)
                } else {
                    Err(TypeParseError::UnexpectedEnd(self.input.to_string()))
                }
            } else {
                Err(self.unexpected())
            };
        }
        let name = self.input[start..self.pos].to_string();

        self.skip_ws();
        let mut args = Vec::new();
        if self.peek() == Some(b'<') {
            self.pos += 1;
            loop {
                args.push(self.parse_type()?);
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b'>') => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => return Err(self.unexpected()),
                    None => return Err(TypeParseError::UnexpectedEnd(self.input.to_string())),
                }
            }
        }
        Ok(TypeRef::generic(name, args))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> TypeParseError {
        let ch = self.input[self.pos..].chars().next().unwrap_or('?');
        TypeParseError::UnexpectedChar {
            ch,
            offset: self.pos,
            input: self.input.to_string(),
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$' | b'?' | b'[' | b']')
}
