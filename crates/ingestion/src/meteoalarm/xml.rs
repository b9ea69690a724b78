//! Namespace-agnostic walk over small in-memory XML documents.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{IngestionError, Result};

/// One step of the walk. Names are local names without prefix; empty
/// elements produce an `Open` directly followed by a `Close`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Close(String),
}

pub(crate) struct XmlNodes<'a> {
    reader: Reader<&'a [u8]>,
    pending_close: Option<String>,
}

impl<'a> XmlNodes<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        Self {
            reader,
            pending_close: None,
        }
    }

    /// Next node, `Ok(None)` at the end of the document.
    pub fn next_node(&mut self) -> Result<Option<Node>> {
        if let Some(name) = self.pending_close.take() {
            return Ok(Some(Node::Close(name)));
        }

        loop {
            let node = match self.reader.read_event() {
                Ok(Event::Start(start)) => Node::Open {
                    name: local_name(start.local_name().as_ref()),
                    attributes: self.attributes(&start)?,
                },
                Ok(Event::Empty(start)) => {
                    let name = local_name(start.local_name().as_ref());
                    self.pending_close = Some(name.clone());
                    Node::Open {
                        name,
                        attributes: self.attributes(&start)?,
                    }
                }
                Ok(Event::End(end)) => Node::Close(local_name(end.local_name().as_ref())),
                Ok(Event::Text(text)) => {
                    Node::Text(text.unescape().map_err(|e| self.error(e))?.into_owned())
                }
                Ok(Event::CData(data)) => Node::Text(String::from_utf8_lossy(&data).into_owned()),
                Ok(Event::Eof) => return Ok(None),
                Ok(_) => continue,
                Err(e) => return Err(self.error(e)),
            };
            return Ok(Some(node));
        }
    }

    fn attributes(&self, start: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| self.error(e.into()))?;
            let value = attribute
                .decode_and_unescape_value(&self.reader)
                .map_err(|e| self.error(e))?;
            attributes.push((local_name(attribute.key.local_name().as_ref()), value.into_owned()));
        }
        Ok(attributes)
    }

    fn error(&self, source: quick_xml::Error) -> IngestionError {
        IngestionError::Xml {
            position: self.reader.buffer_position(),
            source,
        }
    }
}

fn local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Value of the attribute `name`.
pub(crate) fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_strips_prefixes() {
        let mut nodes = XmlNodes::new(r#"<a:root><a:item x:kind="one &amp; two"/><b>t &amp; u</b></a:root>"#);
        let mut seen = Vec::new();
        while let Some(node) = nodes.next_node().unwrap() {
            seen.push(node);
        }

        assert_eq!(
            seen,
            vec![
                Node::Open { name: "root".to_string(), attributes: vec![] },
                Node::Open {
                    name: "item".to_string(),
                    attributes: vec![("kind".to_string(), "one & two".to_string())],
                },
                Node::Close("item".to_string()),
                Node::Open { name: "b".to_string(), attributes: vec![] },
                Node::Text("t & u".to_string()),
                Node::Close("b".to_string()),
                Node::Close("root".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed() {
        let mut nodes = XmlNodes::new("<a><b></a>");
        let mut result = Ok(None);
        for _ in 0..5 {
            result = nodes.next_node();
            if result.is_err() {
                break;
            }
        }
        assert!(result.is_err());
    }
}
