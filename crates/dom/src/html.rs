//! Forgiving HTML loader for test pages and the CLI. Tree building never
//! fails: unknown constructs are skipped, mismatched end tags are recovered
//! from, and whatever structure can be salvaged is kept. Anchoring has to
//! work on real-world markup, so "malformed input" is not an error here.

use crate::document::Document;
use crate::node::{ElementInit, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text: no child tags, no entity decoding.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse an HTML string into a [`Document`]. Infallible on purpose.
#[must_use]
pub fn parse_html(input: &str) -> Document {
    let mut loader = Loader {
        doc: Document::new(),
        chars: input.chars().collect(),
        pos: 0,
        stack: Vec::new(),
    };
    loader.stack.push(loader.doc.root());
    loader.run();
    loader.doc
}

struct Loader {
    doc: Document,
    chars: Vec<char>,
    pos: usize,
    stack: Vec<NodeId>,
}

impl Loader {
    fn run(&mut self) {
        while self.pos < self.chars.len() {
            if self.starts_with("<!--") {
                self.skip_comment();
            } else if self.starts_with("<!") {
                self.skip_until('>');
            } else if self.starts_with("</") {
                self.close_tag();
            } else if self.peek() == Some('<') && self.peek_at(1).is_some_and(|c| c.is_alphabetic())
            {
                self.open_tag();
            } else {
                self.text_run();
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, needle: &str) -> bool {
        needle
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_until(&mut self, end: char) {
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == end {
                return;
            }
        }
    }

    fn skip_comment(&mut self) {
        self.pos += 4;
        while self.pos < self.chars.len() {
            if self.starts_with("-->") {
                self.pos += 3;
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn tag_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_lowercase()
    }

    fn parent(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn text_run(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        if !raw.is_empty() {
            let parent = self.parent();
            self.doc.append_text(parent, &decode_entities(&raw));
        }
    }

    fn open_tag(&mut self) {
        self.pos += 1;
        let name = self.tag_name();
        let mut init = ElementInit::new(&name);
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some('/') if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    self_closing = true;
                    break;
                }
                Some(_) => {
                    let (attr, value) = self.attribute();
                    if attr.is_empty() {
                        // Stray punctuation inside the tag; step over it.
                        self.pos += 1;
                    } else {
                        init = init.attr(&attr, &value);
                    }
                }
            }
        }

        // <html> maps onto the prebuilt root instead of nesting under it.
        if name == "html" && self.stack.len() == 1 {
            let root = self.doc.root();
            for (attr, value) in init.into_data().attributes {
                self.doc.set_attribute(root, &attr, &value);
            }
            return;
        }

        let parent = self.parent();
        let node = self.doc.append_element(parent, init);
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text_content(node, &name);
        } else if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            self.stack.push(node);
        }
    }

    fn attribute(&mut self) -> (String, String) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '=' || c == '>' || (c == '/' && self.peek_at(1) == Some('>'))
            {
                break;
            }
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_lowercase();
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return (name, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let value_start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                let value: String = self.chars[value_start..self.pos].iter().collect();
                if self.peek().is_some() {
                    self.pos += 1;
                }
                value
            }
            _ => {
                let value_start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' || (c == '/' && self.peek_at(1) == Some('>')) {
                        break;
                    }
                    self.pos += 1;
                }
                self.chars[value_start..self.pos].iter().collect()
            }
        };
        (name, decode_entities(&value))
    }

    fn raw_text_content(&mut self, node: NodeId, name: &str) {
        let close = format!("</{name}");
        let start = self.pos;
        let mut end = self.chars.len();
        while self.pos < self.chars.len() {
            if self.starts_with_ignore_case(&close) {
                end = self.pos;
                self.skip_until('>');
                break;
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..end].iter().collect();
        if !raw.is_empty() {
            self.doc.append_text(node, &raw);
        }
    }

    fn starts_with_ignore_case(&self, needle: &str) -> bool {
        needle.chars().enumerate().all(|(i, c)| {
            self.peek_at(i)
                .is_some_and(|have| have.eq_ignore_ascii_case(&c))
        })
    }

    fn close_tag(&mut self) {
        self.pos += 2;
        let name = self.tag_name();
        self.skip_until('>');
        if name == "html" {
            self.stack.truncate(1);
            return;
        }
        // Pop to the nearest matching open element; ignore strays.
        let matching = self
            .stack
            .iter()
            .skip(1)
            .rposition(|id| self.doc.tag_name_of(*id) == Some(name.as_str()));
        if let Some(offset) = matching {
            self.stack.truncate(offset + 1);
        }
    }
}

impl Document {
    fn tag_name_of(&self, node: NodeId) -> Option<&str> {
        self.node(node).element().map(|el| el.tag.as_str())
    }
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '&' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let Some(semi) = chars[i + 1..].iter().take(32).position(|c| *c == ';') else {
            out.push('&');
            i += 1;
            continue;
        };
        let entity: String = chars[i + 1..i + 1 + semi].iter().collect();
        let decoded = match entity.as_str() {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => decode_numeric_entity(&entity),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                i += semi + 2;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<u32>().ok()?
    };
    char::from_u32(code)
}
