//! Selector parsing and matching for the pragmatic CSS subset the anchoring
//! engine emits: tags, `*`, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! `:nth-child(n)`, `:nth-of-type(n)`, descendant and `>` combinators, and
//! comma-separated lists. Anything outside the subset is a syntax error, not
//! a silent non-match, so callers can tell "malformed" from "absent".

use crate::document::Document;
use crate::error::QueryError;
use crate::node::NodeId;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList {
    complexes: Vec<ComplexSelector>,
}

/// One comma-separated arm. `ancestors` is ordered from the key compound
/// outward, which is the order the right-to-left matcher consumes it in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    key: CompoundSelector,
    ancestors: Vec<(Combinator, CompoundSelector)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    universal: bool,
    parts: Vec<SimplePart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimplePart {
    Id(String),
    Class(String),
    AttrPresent(String),
    AttrEquals(String, String),
    NthChild(u32),
    NthOfType(u32),
}

/// Parse without matching. The cheap way for a caller with no document at
/// hand to distinguish well-formed selectors from garbage.
pub fn check_selector_syntax(selector: &str) -> Result<()> {
    parse_selector_list(selector).map(|_| ())
}

pub(crate) fn parse_selector_list(input: &str) -> Result<SelectorList> {
    Parser::new(input).selector_list()
}

pub(crate) fn matches(doc: &Document, node: NodeId, list: &SelectorList) -> bool {
    list.complexes
        .iter()
        .any(|complex| matches_complex(doc, node, complex))
}

fn matches_complex(doc: &Document, node: NodeId, complex: &ComplexSelector) -> bool {
    matches_compound(doc, node, &complex.key) && matches_ancestors(doc, node, &complex.ancestors)
}

fn matches_ancestors(
    doc: &Document,
    node: NodeId,
    ancestors: &[(Combinator, CompoundSelector)],
) -> bool {
    let Some(((combinator, compound), rest)) = ancestors.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => {
            let Some(parent) = doc.node(node).parent else {
                return false;
            };
            matches_compound(doc, parent, compound) && matches_ancestors(doc, parent, rest)
        }
        Combinator::Descendant => {
            // Backtracking walk: any ancestor may satisfy this compound as
            // long as the remaining prefix matches above it.
            let mut current = doc.node(node).parent;
            while let Some(ancestor) = current {
                if matches_compound(doc, ancestor, compound)
                    && matches_ancestors(doc, ancestor, rest)
                {
                    return true;
                }
                current = doc.node(ancestor).parent;
            }
            false
        }
    }
}

fn matches_compound(doc: &Document, node: NodeId, compound: &CompoundSelector) -> bool {
    let Some(el) = doc.node(node).element() else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if el.tag != *tag {
            return false;
        }
    }
    compound.parts.iter().all(|part| match part {
        SimplePart::Id(id) => el.attribute("id") == Some(id.as_str()),
        SimplePart::Class(class) => el.has_class(class),
        SimplePart::AttrPresent(name) => el.attribute(name).is_some(),
        SimplePart::AttrEquals(name, value) => el.attribute(name) == Some(value.as_str()),
        SimplePart::NthChild(n) => doc.nth_child_index(node) == Some(*n),
        SimplePart::NthOfType(n) => doc.nth_of_type_index(node) == Some(*n),
    })
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn err(&self, message: impl Into<String>) -> QueryError {
        QueryError::Syntax(format!("{} at offset {}", message.into(), self.pos))
    }

    fn selector_list(mut self) -> Result<SelectorList> {
        let mut complexes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                if complexes.is_empty() {
                    return Err(self.err("empty selector"));
                }
                return Err(self.err("expected selector after ','"));
            }
            complexes.push(self.complex_selector()?);
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(SelectorList { complexes }),
                Some(',') => {
                    self.bump();
                }
                Some(c) => return Err(self.err(format!("unexpected '{c}'"))),
            }
        }
    }

    fn complex_selector(&mut self) -> Result<ComplexSelector> {
        // Parsed left-to-right, then flipped so the key compound comes first.
        let mut compounds = vec![self.compound_selector()?];
        let mut combinators = Vec::new();
        loop {
            let skipped = self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                    compounds.push(self.compound_selector()?);
                }
                Some(c) if skipped > 0 && is_compound_start(c) => {
                    combinators.push(Combinator::Descendant);
                    compounds.push(self.compound_selector()?);
                }
                _ => break,
            }
        }
        let key = compounds.pop().unwrap_or_default();
        let ancestors = combinators
            .into_iter()
            .rev()
            .zip(compounds.into_iter().rev())
            .collect();
        Ok(ComplexSelector { key, ancestors })
    }

    fn compound_selector(&mut self) -> Result<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        match self.peek() {
            Some('*') => {
                self.bump();
                compound.universal = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident().to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(self.err("expected identifier after '#'"));
                    }
                    compound.parts.push(SimplePart::Id(id));
                }
                Some('.') => {
                    self.bump();
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(self.err("expected class name after '.'"));
                    }
                    compound.parts.push(SimplePart::Class(class));
                }
                Some('[') => {
                    self.bump();
                    compound.parts.push(self.attribute_part()?);
                }
                Some(':') => {
                    self.bump();
                    compound.parts.push(self.pseudo_part()?);
                }
                _ => break,
            }
        }
        if compound.tag.is_none() && !compound.universal && compound.parts.is_empty() {
            return Err(self.err("expected selector"));
        }
        Ok(compound)
    }

    fn attribute_part(&mut self) -> Result<SimplePart> {
        self.skip_whitespace();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.err("expected attribute name after '['"));
        }
        self.skip_whitespace();
        match self.peek() {
            Some(']') => {
                self.bump();
                Ok(SimplePart::AttrPresent(name))
            }
            Some('=') => {
                self.bump();
                self.skip_whitespace();
                let value = self.attribute_value()?;
                self.skip_whitespace();
                if self.bump() != Some(']') {
                    return Err(self.err("unclosed attribute selector"));
                }
                Ok(SimplePart::AttrEquals(name, value))
            }
            _ => Err(self.err("unclosed attribute selector")),
        }
    }

    fn attribute_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.bump();
                        return Ok(value);
                    }
                    self.pos += 1;
                }
                Err(self.err("unterminated attribute value"))
            }
            _ => {
                let value = self.ident();
                if value.is_empty() {
                    return Err(self.err("expected attribute value after '='"));
                }
                Ok(value)
            }
        }
    }

    fn pseudo_part(&mut self) -> Result<SimplePart> {
        let name = self.ident();
        if self.bump() != Some('(') {
            return Err(self.err(format!("unsupported pseudo-class ':{name}'")));
        }
        self.skip_whitespace();
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.err(format!("expected index in ':{name}()'")));
        }
        let digits: String = self.chars[digits_start..self.pos].iter().collect();
        let n: u32 = digits
            .parse()
            .map_err(|_| self.err(format!("index out of range in ':{name}()'")))?;
        self.skip_whitespace();
        if self.bump() != Some(')') {
            return Err(self.err(format!("unclosed ':{name}()'")));
        }
        match name.as_str() {
            "nth-child" => Ok(SimplePart::NthChild(n)),
            "nth-of-type" => Ok(SimplePart::NthOfType(n)),
            other => Err(self.err(format!("unsupported pseudo-class ':{other}'"))),
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn is_compound_start(c: char) -> bool {
    is_ident_char(c) || matches!(c, '*' | '#' | '.' | '[' | ':')
}
