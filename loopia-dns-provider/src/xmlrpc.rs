//! Minimal XML-RPC codec
//!
//! Requests are written with `quick_xml::Writer`; responses are read into a small
//! element tree first and interpreted afterwards, so the untyped wire format never
//! leaves this module. Typed extraction goes through [`FromValue`].

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<int>`, `<i4>` or `<i8>`.
    Int(i64),
    /// `<boolean>`.
    Bool(bool),
    /// `<double>`.
    Double(f64),
    /// `<string>` or an untyped `<value>`.
    String(String),
    /// `<dateTime.iso8601>`, kept verbatim.
    DateTime(String),
    /// `<base64>`, kept verbatim.
    Base64(String),
    /// `<array>`.
    Array(Vec<Value>),
    /// `<struct>`.
    Struct(BTreeMap<String, Value>),
    /// `<nil/>`.
    Nil,
}

impl Value {
    /// Wire name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Bool(_) => "boolean",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::DateTime(_) => "dateTime.iso8601",
            Self::Base64(_) => "base64",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
            Self::Nil => "nil",
        }
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Struct(value)
    }
}

/// Errors raised while encoding or decoding XML-RPC documents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XmlRpcError {
    /// The body is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(String),

    /// The XML is well-formed but not a valid XML-RPC document.
    #[error("unexpected document structure: {0}")]
    Structure(String),

    /// A scalar element holds text that does not parse as its declared type.
    #[error("invalid {kind} value: '{value}'")]
    InvalidScalar {
        /// Declared scalar type.
        kind: &'static str,
        /// Offending text.
        value: String,
    },

    /// The server answered with a `<fault>`.
    #[error("fault {code}: {message}")]
    Fault {
        /// `faultCode` member.
        code: i64,
        /// `faultString` member.
        message: String,
    },

    /// A value has a different type than the caller asked for.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested type.
        expected: &'static str,
        /// Actual wire type.
        found: &'static str,
    },

    /// A struct lacks a required member.
    #[error("missing struct member '{0}'")]
    MissingMember(String),

    /// Writing the request failed.
    #[error("encode error: {0}")]
    Encode(String),
}

// ============ Encoding ============

/// Encode a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, XmlRpcError> {
    let mut writer = Writer::new(Vec::new());
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;
    open(&mut writer, "methodCall")?;
    open(&mut writer, "methodName")?;
    write(&mut writer, Event::Text(BytesText::new(method)))?;
    close(&mut writer, "methodName")?;
    open(&mut writer, "params")?;
    for param in params {
        open(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        close(&mut writer, "param")?;
    }
    close(&mut writer, "params")?;
    close(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner()).map_err(|e| XmlRpcError::Encode(e.to_string()))
}

fn write_value(writer: &mut Writer<Vec<u8>>, value: &Value) -> Result<(), XmlRpcError> {
    open(writer, "value")?;
    match value {
        Value::Int(i) => scalar(writer, "int", &i.to_string())?,
        Value::Bool(b) => scalar(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::Double(d) => scalar(writer, "double", &d.to_string())?,
        Value::String(s) => scalar(writer, "string", s)?,
        Value::DateTime(s) => scalar(writer, "dateTime.iso8601", s)?,
        Value::Base64(s) => scalar(writer, "base64", s)?,
        Value::Array(items) => {
            open(writer, "array")?;
            open(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            close(writer, "data")?;
            close(writer, "array")?;
        }
        Value::Struct(members) => {
            open(writer, "struct")?;
            for (name, member) in members {
                open(writer, "member")?;
                scalar(writer, "name", name)?;
                write_value(writer, member)?;
                close(writer, "member")?;
            }
            close(writer, "struct")?;
        }
        Value::Nil => write(writer, Event::Empty(BytesStart::new("nil")))?,
    }
    close(writer, "value")
}

fn scalar(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<(), XmlRpcError> {
    open(writer, tag)?;
    write(writer, Event::Text(BytesText::new(text)))?;
    close(writer, tag)
}

fn open(writer: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), XmlRpcError> {
    write(writer, Event::Start(BytesStart::new(tag)))
}

fn close(writer: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), XmlRpcError> {
    write(writer, Event::End(BytesEnd::new(tag)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlRpcError> {
    writer
        .write_event(event)
        .map_err(|e| XmlRpcError::Encode(e.to_string()))
}

// ============ Decoding ============

/// Element of the parsed response tree.
#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    fn child(&self, name: &str) -> Result<&Element, XmlRpcError> {
        self.elements().find(|e| e.name == name).ok_or_else(|| {
            XmlRpcError::Structure(format!("<{}> has no <{name}> child", self.name))
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

/// Parse the document into an element tree rooted at its first element.
fn parse_document(xml: &str) -> Result<Element, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlRpcError::Xml(e.to_string()))?;
        match event {
            Event::Start(e) => {
                stack.push(Element::new(
                    String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ));
            }
            Event::Empty(e) => {
                let element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlRpcError::Xml("unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => return Ok(element),
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| XmlRpcError::Xml(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.into_owned()));
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8(c.into_inner().into_owned())
                    .map_err(|e| XmlRpcError::Xml(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => {
                return Err(XmlRpcError::Structure(
                    "document ended before the root element was closed".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Decode a `methodResponse` document.
///
/// A `<fault>` response is returned as [`XmlRpcError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, XmlRpcError> {
    let root = parse_document(xml)?;
    if root.name != "methodResponse" {
        return Err(XmlRpcError::Structure(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.elements().find(|e| e.name == "fault") {
        let Value::Struct(mut members) = parse_value(fault.child("value")?)? else {
            return Err(XmlRpcError::Structure(
                "fault value is not a struct".to_string(),
            ));
        };
        return Err(XmlRpcError::Fault {
            code: take_member(&mut members, "faultCode")?,
            message: take_member(&mut members, "faultString")?,
        });
    }

    let param = root.child("params")?.child("param")?;
    parse_value(param.child("value")?)
}

fn parse_value(value: &Element) -> Result<Value, XmlRpcError> {
    let Some(inner) = value.elements().next() else {
        // untyped <value> is a string
        return Ok(Value::String(value.text()));
    };

    match inner.name.as_str() {
        "int" | "i4" | "i8" => {
            let text = inner.text();
            text.trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| XmlRpcError::InvalidScalar {
                    kind: "int",
                    value: text,
                })
        }
        "boolean" => match inner.text().trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(XmlRpcError::InvalidScalar {
                kind: "boolean",
                value: other.to_string(),
            }),
        },
        "double" => {
            let text = inner.text();
            text.trim()
                .parse()
                .map(Value::Double)
                .map_err(|_| XmlRpcError::InvalidScalar {
                    kind: "double",
                    value: text,
                })
        }
        "string" => Ok(Value::String(inner.text())),
        "dateTime.iso8601" => Ok(Value::DateTime(inner.text().trim().to_string())),
        "base64" => Ok(Value::Base64(inner.text().trim().to_string())),
        "nil" => Ok(Value::Nil),
        "array" => inner
            .child("data")?
            .elements()
            .filter(|e| e.name == "value")
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "struct" => {
            let mut members = BTreeMap::new();
            for member in inner.elements().filter(|e| e.name == "member") {
                let name = member.child("name")?.text();
                members.insert(name, parse_value(member.child("value")?)?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(XmlRpcError::Structure(format!(
            "unknown value type <{other}>"
        ))),
    }
}

// ============ Typed extraction ============

/// Conversion from a decoded [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Convert, failing with [`XmlRpcError::TypeMismatch`] on the wrong wire type.
    fn from_value(value: Value) -> Result<Self, XmlRpcError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, XmlRpcError> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, XmlRpcError> {
        match value {
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => Ok(s),
            other => Err(XmlRpcError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, XmlRpcError> {
        match value {
            Value::Int(i) => Ok(i),
            Value::String(s) => s.trim().parse().map_err(|_| XmlRpcError::InvalidScalar {
                kind: "int",
                value: s,
            }),
            other => Err(XmlRpcError::TypeMismatch {
                expected: "int",
                found: other.type_name(),
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, XmlRpcError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(XmlRpcError::TypeMismatch {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, XmlRpcError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(XmlRpcError::TypeMismatch {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }
}

/// Remove a required member from a decoded struct and convert it.
pub fn take_member<T: FromValue>(
    members: &mut BTreeMap<String, Value>,
    name: &str,
) -> Result<T, XmlRpcError> {
    members
        .remove(name)
        .ok_or_else(|| XmlRpcError::MissingMember(name.to_string()))
        .and_then(T::from_value)
}
