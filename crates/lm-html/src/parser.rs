//! Sandboxed HTML fragment parser.
//!
//! Builds a detached [`DomTree`] from markup. Nothing is executed or fetched:
//! `script` and `style` bodies are kept as inert raw text.

use lm_core::EditorError;
use lm_core::EditorResult;
use lm_dom::DomTree;
use lm_dom::NodeId;
use lm_dom::tags;
use tracing::trace;

use crate::MarkupParser;

const FRAGMENT_CONTAINER_TAG: &str = "template";
const DEFAULT_MAX_DEPTH: usize = 256;

/// Parser hardening knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlParserConfig {
    /// Report structural problems instead of recovering from them.
    pub strict: bool,
    pub max_depth: usize,
}

impl Default for HtmlParserConfig {
    fn default() -> Self {
        Self {
            strict: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parses markup into a detached tree rooted at a synthetic container.
#[derive(Debug, Clone, Default)]
pub struct HtmlParser {
    config: HtmlParserConfig,
}

impl HtmlParser {
    pub fn new(config: HtmlParserConfig) -> Self {
        Self { config }
    }

    /// Recovers from every structural problem; never fails.
    pub fn lenient() -> Self {
        Self::new(HtmlParserConfig {
            strict: false,
            ..HtmlParserConfig::default()
        })
    }

    pub fn config(&self) -> &HtmlParserConfig {
        &self.config
    }

    /// Parses `markup` and appends the resulting nodes to `parent` in `tree`.
    pub fn parse_into(&self, markup: &str, tree: &mut DomTree, parent: NodeId) -> EditorResult<()> {
        let tokens = tokenize(markup, self.config.strict)?;
        build_tree(tokens, tree, parent, &self.config)
    }
}

impl MarkupParser for HtmlParser {
    fn parse_fragment(&self, markup: &str) -> EditorResult<DomTree> {
        let mut tree = DomTree::new(FRAGMENT_CONTAINER_TAG);
        let root = tree.root();
        self.parse_into(markup, &mut tree, root)?;
        Ok(tree)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    /// Character data; entities are decoded when the node is built.
    Text(String),
    /// Body of a `script` or `style` element, kept byte for byte.
    RawText(String),
}

/// Outcome of trying to read a tag at the cursor.
enum Scan {
    Done,
    NotATag,
    Unterminated,
}

fn tokenize(source: &str, strict: bool) -> EditorResult<Vec<Token>> {
    Tokenizer::new(source, strict).run()
}

/// Cursor over the markup source.
struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    strict: bool,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str, strict: bool) -> Self {
        Self {
            src,
            pos: 0,
            strict,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn run(mut self) -> EditorResult<Vec<Token>> {
        while !self.rest().is_empty() {
            let rest = self.rest();
            if let Some(body) = rest.strip_prefix("<!--") {
                let skipped = body.find("-->").map_or(body.len(), |end| end + 3);
                self.pos += 4 + skipped;
            } else if rest.starts_with("<!") {
                let skipped = rest.find('>').map_or(rest.len(), |end| end + 1);
                self.pos += skipped;
            } else if rest.starts_with('<') {
                let begin = self.pos;
                let scan = if rest.starts_with("</") {
                    self.end_tag()
                } else {
                    self.start_tag()?
                };
                match scan {
                    Scan::Done => {}
                    Scan::Unterminated if self.strict => {
                        return Err(EditorError::host_parse(format!(
                            "unterminated tag at byte {begin}"
                        )));
                    }
                    Scan::Unterminated | Scan::NotATag => {
                        self.pos = begin;
                        self.text();
                    }
                }
            } else {
                self.text();
            }
        }
        Ok(self.tokens)
    }

    /// Consumes character data up to the next `<`. The first character is
    /// always taken, so a `<` that opened no tag becomes text.
    fn text(&mut self) {
        let rest = self.rest();
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let len = rest[first..].find('<').map_or(rest.len(), |at| first + at);
        self.pos += len;

        let chunk = &rest[..len];
        if let Some(Token::Text(previous)) = self.tokens.last_mut() {
            previous.push_str(chunk);
        } else if !chunk.is_empty() {
            self.tokens.push(Token::Text(chunk.to_owned()));
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !keep(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_spaces(&mut self) {
        self.take_while(|c| c.is_ascii_whitespace());
    }

    fn end_tag(&mut self) -> Scan {
        self.pos += 2;
        self.skip_spaces();
        let name = self.take_while(is_name_char);
        if name.is_empty() {
            return Scan::NotATag;
        }
        let name = name.to_ascii_lowercase();

        let rest = self.rest();
        let Some(close) = rest.find('>') else {
            return Scan::Unterminated;
        };
        self.pos += close + 1;
        self.tokens.push(Token::End { name });
        Scan::Done
    }

    fn start_tag(&mut self) -> EditorResult<Scan> {
        self.pos += 1;
        if !self.rest().starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Ok(Scan::NotATag);
        }
        let name = self.take_while(is_name_char).to_ascii_lowercase();
        let mut attrs: Vec<(String, String)> = Vec::new();

        let self_closing = loop {
            self.skip_spaces();
            let rest = self.rest();
            if rest.is_empty() {
                return Ok(Scan::Unterminated);
            }
            if self.eat('>') {
                break false;
            }
            if self.eat('/') {
                // Only `/>` closes the tag; any other slash is noise.
                self.skip_spaces();
                if self.eat('>') {
                    break true;
                }
                continue;
            }

            let attr_name = self.take_while(is_attr_name_char);
            if attr_name.is_empty() {
                let Some(stray) = rest.chars().next() else {
                    return Ok(Scan::Unterminated);
                };
                if self.strict {
                    return Err(EditorError::host_parse(format!(
                        "unexpected `{stray}` in start tag `{name}`"
                    )));
                }
                self.pos += stray.len_utf8();
                continue;
            }
            let attr_name = attr_name.to_ascii_lowercase();

            self.skip_spaces();
            let value = if self.eat('=') {
                self.skip_spaces();
                match self.attribute_value() {
                    Some(value) => decode_entities(value),
                    None => return Ok(Scan::Unterminated),
                }
            } else {
                String::new()
            };

            // The first occurrence of an attribute wins.
            if !attrs.iter().any(|(existing, _)| *existing == attr_name) {
                attrs.push((attr_name, value));
            }
        };

        let raw_text = !self_closing && tags::is_raw_text(&name);
        self.tokens.push(Token::Start {
            name: name.clone(),
            attrs,
            self_closing,
        });
        if raw_text {
            self.raw_text(name)?;
        }
        Ok(Scan::Done)
    }

    /// Reads a quoted or unquoted value. `None` means the closing quote is
    /// missing.
    fn attribute_value(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote)?;
                self.pos += end + 2;
                Some(&body[..end])
            }
            _ => Some(self.take_while(|c| !c.is_ascii_whitespace() && c != '>')),
        }
    }

    /// Consumes everything up to `</name>` as one undecoded token.
    fn raw_text(&mut self, name: String) -> EditorResult<()> {
        let body = self.rest();
        let mut from = 0;

        while let Some(found) = body[from..].find("</") {
            let at = from + found;
            let after = &body[at + 2..];
            let names_match = after
                .as_bytes()
                .get(..name.len())
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()));
            if names_match {
                let tail = after[name.len()..].trim_start_matches(|c: char| c.is_ascii_whitespace());
                if tail.starts_with('>') {
                    self.push_raw(&body[..at]);
                    self.pos += body.len() - tail.len() + 1;
                    self.tokens.push(Token::End { name });
                    return Ok(());
                }
            }
            from = at + 2;
        }

        if self.strict {
            return Err(EditorError::host_parse(format!(
                "raw text element `{name}` is never closed"
            )));
        }
        self.push_raw(body);
        self.pos = self.src.len();
        Ok(())
    }

    fn push_raw(&mut self, body: &str) {
        if !body.is_empty() {
            self.tokens.push(Token::RawText(body.to_owned()));
        }
    }
}

fn build_tree(
    tokens: Vec<Token>,
    tree: &mut DomTree,
    parent: NodeId,
    config: &HtmlParserConfig,
) -> EditorResult<()> {
    let mut stack: Vec<(String, NodeId)> = Vec::new();

    for token in tokens {
        let current = stack.last().map_or(parent, |(_, id)| *id);
        match token {
            Token::Text(text) => {
                let node = tree.create_text(decode_entities(&text));
                tree.append_child(current, node);
            }
            Token::RawText(text) => {
                let node = tree.create_text(text);
                tree.append_child(current, node);
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let node = tree.create_element_with_attrs(&name, attrs);
                tree.append_child(current, node);

                if self_closing || tags::is_void(&name) {
                    continue;
                }

                if stack.len() >= config.max_depth {
                    if config.strict {
                        return Err(EditorError::host_parse(format!(
                            "nesting deeper than {} elements",
                            config.max_depth
                        )));
                    }
                    continue;
                }
                stack.push((name, node));
            }
            Token::End { name } => {
                let Some(position) = stack.iter().rposition(|(open, _)| *open == name) else {
                    if config.strict {
                        return Err(EditorError::host_parse(format!(
                            "end tag `{name}` closes no open element"
                        )));
                    }
                    trace!(tag = %name, "ignoring stray end tag");
                    continue;
                };

                if config.strict && position + 1 != stack.len() {
                    return Err(EditorError::host_parse(format!(
                        "end tag `{name}` closes misnested elements"
                    )));
                }
                stack.truncate(position);
            }
        }
    }

    if config.strict {
        if let Some((name, _)) = stack.last() {
            return Err(EditorError::host_parse(format!(
                "element `{name}` is never closed"
            )));
        }
    }

    Ok(())
}

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
];

/// Replaces character references. Unknown references stay literal.
fn decode_entities(input: &str) -> String {
    let mut pieces = input.split('&');
    let mut out = pieces.next().unwrap_or_default().to_owned();

    for piece in pieces {
        let decoded = piece
            .split_once(';')
            .and_then(|(reference, tail)| Some((entity_char(reference)?, tail)));
        match decoded {
            Some((c, tail)) => {
                out.push(c);
                out.push_str(tail);
            }
            None => {
                out.push('&');
                out.push_str(piece);
            }
        }
    }
    out
}

fn entity_char(reference: &str) -> Option<char> {
    if let Some((_, c)) = NAMED_ENTITIES.iter().find(|(name, _)| *name == reference) {
        return Some(*c);
    }
    let numeric = reference.strip_prefix('#')?;
    let code = match numeric.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => numeric.parse().ok()?,
    };
    char::from_u32(code)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')
}

fn is_attr_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '/' | '>' | '=' | '"' | '\'' | '<')
}
