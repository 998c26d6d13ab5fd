//! A small element tree over quick-xml events; TMX documents are tiny.

use crate::error::MapError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Root element of `text`, `None` for a document without one.
    pub fn parse(text: &str) -> Result<Option<Element>, quick_xml::Error> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Element::open(&e)?),
                Event::Empty(e) => attach(&mut stack, &mut root, Element::open(&e)?),
                Event::End(_) => {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, &mut root, done);
                    }
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(root)
    }

    fn open(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
        let mut el = Element {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Default::default()
        };
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            el.attrs.push((key, value));
        }
        Ok(el)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric attribute, `default` when absent.
    pub fn num<T: FromStr>(&self, name: &str, default: T) -> Result<T, MapError> {
        Ok(self.opt_num(name)?.unwrap_or(default))
    }

    pub fn opt_num<T: FromStr>(&self, name: &str) -> Result<Option<T>, MapError> {
        let Some(v) = self.attr(name) else {
            return Ok(None);
        };
        v.trim().parse().map(Some).map_err(|_| {
            MapError::InvalidMap(format!(
                "attribute '{name}' of <{}> is not a number: '{v}'",
                self.name
            ))
        })
    }

    /// `1`/`true` flags as Tiled writes them.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.attr(name) {
            Some(v) => matches!(v.trim(), "1" | "true"),
            None => default,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}
