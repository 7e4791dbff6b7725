// XML response normalization
use indexmap::IndexMap;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fmt::Display;

use crate::error::{CheddarError, Result};
use crate::node::{parse_numeric, Node};

// Tags whose value is always a sequence of their singular-named children.
// A new collection-typed resource must be added here.
pub const COLLECTION_TAGS: [&str; 8] = [
    "plans",
    "customers",
    "items",
    "charges",
    "invoices",
    "subscriptions",
    "transactions",
    "promotions",
];

// Key for text that sits next to attributes or child elements
pub const TEXT_KEY: &str = "_";

/// A parsed response: the root tag name and the root element's value.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: String,
    pub content: Node,
}

impl Document {
    pub fn is_error(&self) -> bool {
        self.root == "error"
    }
}

// Singular child name for a collection tag, e.g. "customers" -> "customer"
pub fn collection_child(tag: &str) -> Option<&str> {
    if COLLECTION_TAGS.contains(&tag) {
        tag.strip_suffix('s')
    } else {
        None
    }
}

// Element under construction
struct Frame {
    name: String,
    fields: IndexMap<String, Vec<Node>>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart) -> Result<Self> {
        let name = utf8(start.name().as_ref())?.to_string();
        let mut fields: IndexMap<String, Vec<Node>> = IndexMap::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| malformed(format!("bad attribute on <{name}>: {e}")))?;
            let key = utf8(attribute.key.as_ref())?.to_string();
            let value = attribute
                .unescape_value()
                .map_err(|e| malformed(format!("bad attribute value on <{name}>: {e}")))?;
            fields
                .entry(key)
                .or_default()
                .push(Node::Text(value.into_owned()));
        }

        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    // Applies the coercion rules and returns (tag name, value)
    fn finish(mut self) -> (String, Node) {
        let text = self.text.trim();
        let child = collection_child(&self.name);

        let value = if self.fields.is_empty() {
            if text.is_empty() {
                // A collection with no children is still a sequence
                match child {
                    Some(_) => Node::List(Vec::new()),
                    None => Node::Null,
                }
            } else if let Some(number) = parse_numeric(text) {
                number
            } else if child.is_some() {
                Node::List(Vec::new())
            } else {
                Node::Text(text.to_string())
            }
        } else if let Some(child) = child {
            Node::List(self.fields.shift_remove(child).unwrap_or_default())
        } else {
            let mut map: IndexMap<String, Node> = self
                .fields
                .into_iter()
                .map(|(key, values)| (key, collapse(values)))
                .collect();
            if !text.is_empty() {
                map.insert(TEXT_KEY.to_string(), Node::Text(text.to_string()));
            }
            Node::Map(map)
        };

        (self.name, value)
    }
}

// One occurrence stays a plain value, repeats become a list
fn collapse(mut values: Vec<Node>) -> Node {
    if values.len() == 1 {
        values.pop().unwrap_or(Node::Null)
    } else {
        Node::List(values)
    }
}

fn malformed(message: impl Into<String>) -> CheddarError {
    CheddarError::MalformedDocument(message.into())
}

fn malformed_at(position: u64, error: impl Display) -> CheddarError {
    malformed(format!("error at position {position}: {error}"))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| malformed(format!("invalid UTF-8: {e}")))
}

fn push_text(stack: &mut [Frame], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(malformed("text outside of the root element")),
    }
}

fn close(frame: Frame, stack: &mut [Frame], document: &mut Option<Document>) {
    let (name, value) = frame.finish();
    match stack.last_mut() {
        Some(parent) => parent.fields.entry(name).or_default().push(value),
        None => {
            *document = Some(Document {
                root: name,
                content: value,
            })
        }
    }
}

fn ensure_single_root(stack: &[Frame], document: &Option<Document>) -> Result<()> {
    if stack.is_empty() && document.is_some() {
        return Err(malformed("more than one root element"));
    }
    Ok(())
}

/// Converts a raw response body into a [`Document`].
///
/// Returns `Ok(None)` for an empty body (or one with no element at all) and
/// `MalformedDocument` when the bytes are not well-formed XML. The result is
/// a pure function of the input.
pub fn normalize(raw: &[u8]) -> Result<Option<Document>> {
    let xml = utf8(raw)?;
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    if xml.trim().is_empty() {
        return Ok(None);
    }

    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut document: Option<Document> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(malformed_at(reader.error_position(), e)),
        };

        match event {
            Event::Start(start) => {
                ensure_single_root(&stack, &document)?;
                stack.push(Frame::open(&start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&stack, &document)?;
                let frame = Frame::open(&start)?;
                close(frame, &mut stack, &mut document);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an open element"))?;
                close(frame, &mut stack, &mut document);
            }
            Event::Text(text) => push_text(&mut stack, utf8(&text)?)?,
            Event::CData(data) => push_text(&mut stack, utf8(&data)?)?,
            Event::GeneralRef(reference) => {
                let resolved = match reference.resolve_char_ref() {
                    Ok(Some(ch)) => ch.to_string(),
                    Ok(None) => {
                        let name = utf8(&reference)?;
                        resolve_predefined_entity(name)
                            .ok_or_else(|| malformed(format!("unknown entity &{name};")))?
                            .to_string()
                    }
                    Err(e) => return Err(malformed_at(reader.error_position(), e)),
                };
                push_text(&mut stack, &resolved)?;
            }
            Event::Eof => break,
            // Declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unclosed element <{}>", open.name)));
    }

    Ok(document)
}

// A small customer response used by tests and benchmarks
pub const SAMPLE_CUSTOMERS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<customers>
  <customer id="6b9c4bd6-5f4a-102e-9aaf-40402145ee8d" code="customerCode1">
    <firstName>FName</firstName>
    <lastName>LName</lastName>
    <company/>
    <email>test@example.com</email>
    <subscriptions>
      <subscription id="7c2b6fee-5f4a-102e-9aaf-40402145ee8d">
        <plans>
          <plan id="a7d2b5a0-5f4a-102e-9aaf-40402145ee8d" code="PRO">
            <name>Pro</name>
            <recurringChargeAmount>19.95</recurringChargeAmount>
          </plan>
        </plans>
        <items>
          <item id="b1e3c6f4-5f4a-102e-9aaf-40402145ee8d" code="SEATS">
            <name>Seats</name>
            <quantity>1</quantity>
          </item>
        </items>
        <invoices/>
        <canceledDatetime></canceledDatetime>
      </subscription>
    </subscriptions>
  </customer>
</customers>
"#;
