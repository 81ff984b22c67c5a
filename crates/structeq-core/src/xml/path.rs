use std::fmt;
use std::str::FromStr;

use roxmltree::Node;

use crate::QueryError;

/// A parsed element path in the ElementTree `findall` dialect.
///
/// Paths are always relative to the element they are evaluated on. Supported
/// syntax: `tag`, `{uri}tag`, `{*}tag`, `*`, `.`, `..`, the `//` descendant
/// axis and the predicates `[@attr]`, `[@attr='v']`, `[@attr!='v']`,
/// `[tag]`, `[tag='text']`, `[.='text']`, `[N]`, `[last()]` and
/// `[last()-N]`.
///
/// ```
/// # use structeq_core::xml::XmlPath;
/// let doc = roxmltree::Document::parse("<a><b n='1'/><c><b n='2'/></c></a>").unwrap();
/// let path: XmlPath = ".//b[@n='2']".parse()?;
/// let found = path.find(doc.root_element());
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].attribute("n"), Some("2"));
/// # Ok::<(), structeq_core::QueryError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlPath {
    source: String,
    steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: StepTest,
    predicates: Vec<Predicate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum StepTest {
    Element(NameTest),
    SelfNode,
    Parent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct NameTest {
    namespace: NamespaceTest,
    /// `None` matches any local name.
    local: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NamespaceTest {
    Any,
    Unqualified,
    Uri(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttributeName {
    namespace: Option<String>,
    local: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Predicate {
    HasAttribute(AttributeName),
    Attribute { name: AttributeName, op: TextOp, value: String },
    HasChild(NameTest),
    ChildText { test: NameTest, op: TextOp, value: String },
    OwnText { op: TextOp, value: String },
    Position(Position),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextOp {
    Eq,
    Ne,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    /// 1-based index among same-named siblings.
    Index(usize),
    /// Distance from the last same-named sibling; `0` is `last()`.
    FromLast(usize),
}

impl XmlPath {
    /// Returns the expression this path was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the path from `root`, returning distinct elements in
    /// document order.
    ///
    /// `..` never climbs above `root`, and positional predicates do not
    /// apply to `root` itself.
    #[must_use]
    pub fn find<'a, 'input>(&self, root: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let mut nodes = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            for &node in &nodes {
                match (&step.test, step.axis) {
                    (StepTest::SelfNode, _) => next.push(node),
                    (StepTest::Parent, _) => next.extend(parent_within(node, root)),
                    (StepTest::Element(test), Axis::Child) => {
                        next.extend(node.children().filter(|child| test.matches(*child)));
                    }
                    (StepTest::Element(test), Axis::Descendant) => {
                        let below = node.descendants().skip(1);
                        next.extend(below.filter(|child| test.matches(*child)));
                    }
                }
            }
            next.retain(|candidate| step.predicates.iter().all(|p| p.matches(*candidate, root)));
            next.sort_by_key(|node| node.id().get_usize());
            next.dedup_by_key(|node| node.id());
            nodes = next;
        }
        nodes
    }
}

impl FromStr for XmlPath {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let steps = Parser::new(s).parse()?;
        Ok(Self { source: s.to_owned(), steps })
    }
}

impl fmt::Display for XmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parent_within<'a, 'input>(
    node: Node<'a, 'input>,
    root: Node<'a, 'input>,
) -> Option<Node<'a, 'input>> {
    if node == root {
        None
    } else {
        node.parent_element()
    }
}

fn same_name(a: Node<'_, '_>, b: Node<'_, '_>) -> bool {
    let (a, b) = (a.tag_name(), b.tag_name());
    a.namespace() == b.namespace() && a.name() == b.name()
}

/// Concatenated text of the element and all its descendants.
fn text_content(node: Node<'_, '_>) -> String {
    node.descendants().filter(Node::is_text).filter_map(|n| n.text()).collect()
}

impl NameTest {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        if !node.is_element() {
            return false;
        }
        let name = node.tag_name();
        let namespace_ok = match &self.namespace {
            NamespaceTest::Any => true,
            NamespaceTest::Unqualified => name.namespace().is_none(),
            NamespaceTest::Uri(uri) => name.namespace() == Some(uri.as_str()),
        };
        namespace_ok && self.local.as_deref().is_none_or(|local| local == name.name())
    }
}

impl AttributeName {
    fn lookup<'a>(&self, node: Node<'a, '_>) -> Option<&'a str> {
        node.attributes()
            .find(|attr| attr.namespace() == self.namespace.as_deref() && attr.name() == self.local)
            .map(|attr| attr.value())
    }
}

impl TextOp {
    fn holds(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Eq => actual == expected,
            Self::Ne => actual != expected,
        }
    }
}

impl Predicate {
    fn matches<'a, 'input>(&self, node: Node<'a, 'input>, root: Node<'a, 'input>) -> bool {
        match self {
            Self::HasAttribute(name) => name.lookup(node).is_some(),
            Self::Attribute { name, op, value } => {
                name.lookup(node).is_some_and(|actual| op.holds(actual, value))
            }
            Self::HasChild(test) => node.children().any(|child| test.matches(child)),
            Self::ChildText { test, op, value } => node
                .children()
                .filter(|child| test.matches(*child))
                .any(|child| op.holds(&text_content(child), value)),
            Self::OwnText { op, value } => op.holds(&text_content(node), value),
            Self::Position(position) => {
                let Some(parent) = parent_within(node, root) else {
                    return false;
                };
                let siblings: Vec<_> = parent
                    .children()
                    .filter(|sibling| sibling.is_element() && same_name(*sibling, node))
                    .collect();
                let index = match *position {
                    Position::Index(n) => n.checked_sub(1),
                    Position::FromLast(back) => {
                        back.checked_add(1).and_then(|k| siblings.len().checked_sub(k))
                    }
                };
                index.and_then(|i| siblings.get(i)).is_some_and(|sibling| *sibling == node)
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), QueryError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::new(self.pos, message)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn parse(mut self) -> Result<Vec<Step>, QueryError> {
        if self.input.trim().is_empty() {
            return Err(self.error("empty path expression"));
        }
        if self.peek() == Some('/') {
            return Err(self.error("absolute paths cannot be evaluated on an element"));
        }
        let mut steps = Vec::new();
        let mut axis = Axis::Child;
        loop {
            steps.push(self.parse_step(axis)?);
            match self.peek() {
                None => break,
                Some('/') if self.starts_with("//") => {
                    self.pos += 2;
                    axis = Axis::Descendant;
                }
                Some('/') => {
                    self.pos += 1;
                    axis = Axis::Child;
                }
                Some(c) => return Err(self.error(format!("unexpected character '{c}'"))),
            }
        }
        Ok(steps)
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, QueryError> {
        let start = self.pos;
        let test = if self.starts_with("..") {
            self.pos += 2;
            StepTest::Parent
        } else if self.starts_with(".") {
            self.pos += 1;
            StepTest::SelfNode
        } else {
            match self.peek() {
                None | Some('/') => return Err(self.error("expected a path step")),
                Some(_) => StepTest::Element(self.parse_name_test()?),
            }
        };
        if axis == Axis::Descendant && !matches!(test, StepTest::Element(_)) {
            return Err(QueryError::new(start, "'//' must be followed by a tag or '*'"));
        }
        let mut predicates = Vec::new();
        while self.peek() == Some('[') {
            predicates.push(self.parse_predicate()?);
        }
        Ok(Step { axis, test, predicates })
    }

    fn parse_name_test(&mut self) -> Result<NameTest, QueryError> {
        let namespace = if self.peek() == Some('{') {
            Some(match self.parse_braced_uri()?.as_str() {
                "*" => NamespaceTest::Any,
                "" => NamespaceTest::Unqualified,
                uri => NamespaceTest::Uri(uri.to_owned()),
            })
        } else {
            None
        };
        let local = if self.peek() == Some('*') {
            self.pos += 1;
            None
        } else {
            Some(self.parse_name()?)
        };
        let namespace = namespace.unwrap_or(if local.is_some() {
            NamespaceTest::Unqualified
        } else {
            NamespaceTest::Any
        });
        Ok(NameTest { namespace, local })
    }

    fn parse_braced_uri(&mut self) -> Result<String, QueryError> {
        self.expect('{')?;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '}') {
            self.bump();
        }
        let uri = self.input[start..self.pos].to_owned();
        self.expect('}')?;
        Ok(uri)
    }

    fn parse_name(&mut self) -> Result<String, QueryError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn parse_attribute_name(&mut self) -> Result<AttributeName, QueryError> {
        let namespace =
            if self.peek() == Some('{') { Some(self.parse_braced_uri()?) } else { None };
        let local = self.parse_name()?;
        Ok(AttributeName { namespace, local })
    }

    fn parse_predicate(&mut self) -> Result<Predicate, QueryError> {
        self.expect('[')?;
        self.skip_ws();
        let predicate = match self.peek() {
            Some('@') => {
                self.pos += 1;
                let name = self.parse_attribute_name()?;
                match self.parse_text_op()? {
                    None => Predicate::HasAttribute(name),
                    Some(op) => Predicate::Attribute { name, op, value: self.parse_quoted()? },
                }
            }
            Some(c) if c.is_ascii_digit() => {
                let at = self.pos;
                match self.parse_uint()? {
                    0 => return Err(QueryError::new(at, "positions start at 1")),
                    n => Predicate::Position(Position::Index(n)),
                }
            }
            Some('l') if self.starts_with("last()") => {
                self.pos += "last()".len();
                self.skip_ws();
                let back = if self.peek() == Some('-') {
                    self.pos += 1;
                    self.skip_ws();
                    self.parse_uint()?
                } else {
                    0
                };
                Predicate::Position(Position::FromLast(back))
            }
            Some('.') => {
                self.pos += 1;
                match self.parse_text_op()? {
                    Some(op) => Predicate::OwnText { op, value: self.parse_quoted()? },
                    None => return Err(self.error("expected '=' or '!=' after '.'")),
                }
            }
            Some(_) => {
                let test = self.parse_name_test()?;
                match self.parse_text_op()? {
                    None => Predicate::HasChild(test),
                    Some(op) => Predicate::ChildText { test, op, value: self.parse_quoted()? },
                }
            }
            None => return Err(self.error("unterminated '['")),
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(predicate)
    }

    /// Parses an optional `=` or `!=`, leaving the cursor on the operand.
    fn parse_text_op(&mut self) -> Result<Option<TextOp>, QueryError> {
        self.skip_ws();
        let op = if self.starts_with("!=") {
            self.pos += 2;
            TextOp::Ne
        } else if self.starts_with("=") {
            self.pos += 1;
            TextOp::Eq
        } else {
            return Ok(None);
        };
        self.skip_ws();
        Ok(Some(op))
    }

    fn parse_quoted(&mut self) -> Result<String, QueryError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.bump();
        }
        let value = self.input[start..self.pos].to_owned();
        self.expect(quote)?;
        Ok(value)
    }

    fn parse_uint(&mut self) -> Result<usize, QueryError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.input[start..self.pos]
            .parse::<usize>()
            .map_err(|_| QueryError::new(start, "expected a non-negative integer"))
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '/' | '[' | ']' | '(' | ')' | '@' | '!' | '=' | '{' | '}' | '\'' | '"' | '*'
        )
}
