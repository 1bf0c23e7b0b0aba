//! XML to nested-mapping conversion.
//!
//! Produces the same [`Value`] shape a JSON body would:
//!
//! - the document becomes `{root_name: root_value}`
//! - attributes become keys prefixed with `@`
//! - an element with only text becomes that string; with attributes or
//!   children as well, the text goes under `#text`
//! - an empty element becomes `null`
//! - repeated child names collect into an array in document order

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::fmt::Display;

use crate::client::ClientError;

/// Parse an XML document into a [`Value`]
pub fn xml_to_value(xml: &str) -> Result<Value, ClientError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = Map::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&text.unescape().map_err(parse_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(element) = stack.last_mut() {
                    element
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(parse_error("unexpected end of document"));
    }
    if root.is_empty() {
        return Err(parse_error("document has no root element"));
    }

    Ok(Value::Object(root))
}

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ClientError> {
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(parse_error)?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value().map_err(parse_error)?;
            fields.insert(key, Value::String(value.into_owned()));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Map<String, Value>,
    element: Element,
) -> Result<(), ClientError> {
    let (name, value) = element.close();
    match stack.last_mut() {
        Some(parent) => insert_child(&mut parent.fields, name, value),
        None if root.is_empty() => {
            root.insert(name, value);
        }
        None => return Err(parse_error("multiple root elements")),
    }
    Ok(())
}

fn insert_child(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

fn parse_error(err: impl Display) -> ClientError {
    ClientError::Parse(format!("XML: {}", err))
}
