use std::fmt;
use std::str::FromStr;

use serde_json::Value as JsonValue;

use crate::QueryError;

/// A parsed JSONPath expression.
///
/// Supported syntax: `$` root (optional), `.name`, `['name']`, `.*`, `[*]`,
/// `[N]`, `[-N]`, `[start:end:step]`, unions such as `['a',0]`, descendant
/// segments (`..name`, `..*`, `..[0]`) and filters of the form
/// `[?(@.member)]` or `[?(@.member == 'literal')]`.
///
/// ```
/// # use structeq_core::json::JsonPath;
/// let path: JsonPath = "$..stations".parse()?;
/// let doc = serde_json::json!({"data": {"stations": {"regular": []}}});
/// assert_eq!(path.find(&doc).len(), 1);
/// # Ok::<(), structeq_core::QueryError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Child(Vec<Selector>),
    Descendant(Vec<Selector>),
}

#[derive(Clone, Debug, PartialEq)]
enum Selector {
    Name(String),
    Wildcard,
    Index(i64),
    Slice { start: Option<i64>, end: Option<i64>, step: i64 },
    Filter(Filter),
}

#[derive(Clone, Debug, PartialEq)]
enum Filter {
    Exists(Vec<String>),
    Compare { path: Vec<String>, op: CompareOp, literal: JsonValue },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl JsonPath {
    /// Returns the expression this path was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the path against a document, returning matches in document order.
    #[must_use]
    pub fn find<'v>(&self, root: &'v JsonValue) -> Vec<&'v JsonValue> {
        let mut nodes = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            match segment {
                Segment::Child(selectors) => {
                    for node in &nodes {
                        apply_selectors(node, selectors, &mut next);
                    }
                }
                Segment::Descendant(selectors) => {
                    for node in &nodes {
                        for visited in descendants_or_self(node) {
                            apply_selectors(visited, selectors, &mut next);
                        }
                    }
                }
            }
            nodes = next;
        }
        nodes
    }
}

impl FromStr for JsonPath {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = Parser::new(s).parse()?;
        Ok(Self { source: s.to_owned(), segments })
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn apply_selectors<'v>(node: &'v JsonValue, selectors: &[Selector], out: &mut Vec<&'v JsonValue>) {
    for selector in selectors {
        match selector {
            Selector::Name(name) => {
                if let Some(value) = node.as_object().and_then(|map| map.get(name)) {
                    out.push(value);
                }
            }
            Selector::Wildcard => out.extend(children(node)),
            Selector::Index(index) => {
                if let Some(items) = node.as_array() {
                    if let Some(idx) = normalize_index(*index, items.len()) {
                        out.push(&items[idx]);
                    }
                }
            }
            Selector::Slice { start, end, step } => {
                if let Some(items) = node.as_array() {
                    for idx in slice_indices(items.len(), *start, *end, *step) {
                        out.push(&items[idx]);
                    }
                }
            }
            Selector::Filter(filter) => {
                out.extend(children(node).filter(|child| filter.matches(child)));
            }
        }
    }
}

fn children(node: &JsonValue) -> Box<dyn Iterator<Item = &JsonValue> + '_> {
    match node {
        JsonValue::Array(items) => Box::new(items.iter()),
        JsonValue::Object(map) => Box::new(map.values()),
        _ => Box::new(std::iter::empty()),
    }
}

/// Pre-order walk without recursion so adversarially deep documents cannot
/// overflow the stack.
fn descendants_or_self(root: &JsonValue) -> Vec<&JsonValue> {
    let mut visited = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visited.push(node);
        let kids: Vec<_> = children(node).collect();
        stack.extend(kids.into_iter().rev());
    }
    visited
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if index < 0 { len + index } else { index };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}

fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: i64) -> Vec<usize> {
    let Ok(len) = i64::try_from(len) else {
        return Vec::new();
    };
    let normalize = |i: i64| if i >= 0 { i } else { len + i };
    let mut indices = Vec::new();
    if step > 0 {
        let lower = normalize(start.unwrap_or(0)).clamp(0, len);
        let upper = normalize(end.unwrap_or(len)).clamp(0, len);
        let mut i = lower;
        while i < upper {
            indices.push(i);
            match i.checked_add(step) {
                Some(n) => i = n,
                None => break,
            }
        }
    } else if step < 0 {
        let upper = normalize(start.unwrap_or(len - 1)).clamp(-1, len - 1);
        let lower = normalize(end.unwrap_or(-len - 1)).clamp(-1, len - 1);
        let mut i = upper;
        while lower < i {
            indices.push(i);
            match i.checked_add(step) {
                Some(n) => i = n,
                None => break,
            }
        }
    }
    indices.into_iter().filter_map(|i| usize::try_from(i).ok()).collect()
}

impl Filter {
    fn matches(&self, candidate: &JsonValue) -> bool {
        match self {
            Self::Exists(path) => resolve(candidate, path).is_some(),
            Self::Compare { path, op, literal } => match resolve(candidate, path) {
                Some(value) => compare(value, *op, literal),
                None => *op == CompareOp::Ne,
            },
        }
    }
}

fn resolve<'v>(node: &'v JsonValue, path: &[String]) -> Option<&'v JsonValue> {
    path.iter().try_fold(node, |current, name| current.as_object()?.get(name))
}

fn compare(value: &JsonValue, op: CompareOp, literal: &JsonValue) -> bool {
    use std::cmp::Ordering;

    let ordering = match (value, literal) {
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let equal = match ordering {
        Some(ordering) => ordering == Ordering::Equal,
        None => value == literal,
    };
    match op {
        CompareOp::Eq => equal,
        CompareOp::Ne => !equal,
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
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

    fn parse(mut self) -> Result<Vec<Segment>, QueryError> {
        if self.input.trim().is_empty() {
            return Err(self.error("empty path expression"));
        }
        let mut segments = Vec::new();
        if self.peek() == Some('$') {
            self.pos += 1;
        } else if self.peek().is_some_and(is_name_char) {
            segments.push(Segment::Child(vec![Selector::Name(self.parse_name()?)]));
        }
        while self.peek().is_some() {
            if self.starts_with("..") {
                self.pos += 2;
                segments.push(Segment::Descendant(self.parse_segment_body()?));
            } else if self.starts_with(".") {
                self.pos += 1;
                match self.peek() {
                    Some('*') => {
                        self.pos += 1;
                        segments.push(Segment::Child(vec![Selector::Wildcard]));
                    }
                    _ => segments.push(Segment::Child(vec![Selector::Name(self.parse_name()?)])),
                }
            } else if self.starts_with("[") {
                segments.push(Segment::Child(self.parse_bracket()?));
            } else {
                let c = self.peek().unwrap_or_default();
                return Err(self.error(format!("unexpected character '{c}'")));
            }
        }
        Ok(segments)
    }

    fn parse_segment_body(&mut self) -> Result<Vec<Selector>, QueryError> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok(vec![Selector::Wildcard])
            }
            Some('[') => self.parse_bracket(),
            _ => Ok(vec![Selector::Name(self.parse_name()?)]),
        }
    }

    fn parse_name(&mut self) -> Result<String, QueryError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error("expected member name"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn parse_bracket(&mut self) -> Result<Vec<Selector>, QueryError> {
        self.expect('[')?;
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.parse_selector()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                Some(c) => {
                    self.pos -= c.len_utf8();
                    return Err(self.error(format!("expected ',' or ']', found '{c}'")));
                }
                None => return Err(self.error("unterminated '['")),
            }
        }
        Ok(selectors)
    }

    fn parse_selector(&mut self) -> Result<Selector, QueryError> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok(Selector::Wildcard)
            }
            Some('\'' | '"') => Ok(Selector::Name(self.parse_quoted()?)),
            Some('?') => {
                self.pos += 1;
                Ok(Selector::Filter(self.parse_filter()?))
            }
            Some(c) if c == ':' || c == '-' || c.is_ascii_digit() => self.parse_index_or_slice(),
            Some(c) => Err(self.error(format!("unexpected character '{c}' in selector"))),
            None => Err(self.error("unterminated '['")),
        }
    }

    fn parse_quoted(&mut self) -> Result<String, QueryError> {
        let quote = self.bump().unwrap_or('\'');
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    fn parse_int(&mut self) -> Result<Option<i64>, QueryError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| QueryError::new(start, format!("invalid integer '{text}'")))
    }

    fn parse_index_or_slice(&mut self) -> Result<Selector, QueryError> {
        let start = self.parse_int()?;
        self.skip_ws();
        if self.peek() != Some(':') {
            return start.map(Selector::Index).ok_or_else(|| self.error("expected index"));
        }
        self.pos += 1;
        self.skip_ws();
        let end = self.parse_int()?;
        self.skip_ws();
        let mut step = 1;
        if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_ws();
            step = self.parse_int()?.unwrap_or(1);
        }
        Ok(Selector::Slice { start, end, step })
    }

    fn parse_filter(&mut self) -> Result<Filter, QueryError> {
        self.skip_ws();
        let parenthesized = self.peek() == Some('(');
        if parenthesized {
            self.pos += 1;
            self.skip_ws();
        }
        self.expect('@')?;
        let mut path = Vec::new();
        loop {
            if self.peek() == Some('.') {
                self.pos += 1;
                path.push(self.parse_name()?);
            } else if self.starts_with("['") || self.starts_with("[\"") {
                self.pos += 1;
                path.push(self.parse_quoted()?);
                self.expect(']')?;
            } else {
                break;
            }
        }
        self.skip_ws();
        let filter = match self.parse_op() {
            Some(op) => {
                self.skip_ws();
                let literal = self.parse_literal()?;
                Filter::Compare { path, op, literal }
            }
            None => Filter::Exists(path),
        };
        self.skip_ws();
        if parenthesized {
            self.expect(')')?;
        }
        Ok(filter)
    }

    fn parse_op(&mut self) -> Option<CompareOp> {
        const OPS: [(&str, CompareOp); 6] = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        for (token, op) in OPS {
            if self.starts_with(token) {
                self.pos += token.len();
                return Some(op);
            }
        }
        None
    }

    fn parse_literal(&mut self) -> Result<JsonValue, QueryError> {
        if matches!(self.peek(), Some('\'' | '"')) {
            return self.parse_quoted().map(JsonValue::String);
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'))
        {
            self.pos += 1;
        }
        let token = &self.input[start..self.pos];
        match token {
            "true" => Ok(JsonValue::Bool(true)),
            "false" => Ok(JsonValue::Bool(false)),
            "null" => Ok(JsonValue::Null),
            _ => match serde_json::from_str::<serde_json::Number>(token) {
                Ok(number) => Ok(JsonValue::Number(number)),
                Err(_) => Err(QueryError::new(start, format!("invalid literal '{token}'"))),
            },
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn find(path: &str, doc: &JsonValue) -> Vec<JsonValue> {
        let path: JsonPath = path.parse().expect("path parses");
        path.find(doc).into_iter().cloned().collect()
    }

    #[test]
    fn root_selects_document() {
        let doc = json!({"a": 1});
        assert_eq!(find("$", &doc), vec![doc.clone()]);
    }

    #[test]
    fn dotted_and_bracketed_members_agree() {
        let doc = json!({"a": {"b c": 2, "d": 3}});
        assert_eq!(find("$.a['b c']", &doc), vec![json!(2)]);
        assert_eq!(find("$[\"a\"].d", &doc), vec![json!(3)]);
        assert_eq!(find("a.d", &doc), vec![json!(3)]);
    }

    #[test]
    fn indices_and_slices() {
        let doc = json!([0, 1, 2, 3, 4]);
        assert_eq!(find("$[1]", &doc), vec![json!(1)]);
        assert_eq!(find("$[-1]", &doc), vec![json!(4)]);
        assert_eq!(find("$[9]", &doc), Vec::<JsonValue>::new());
        assert_eq!(find("$[1:3]", &doc), vec![json!(1), json!(2)]);
        assert_eq!(find("$[::2]", &doc), vec![json!(0), json!(2), json!(4)]);
        assert_eq!(find("$[::-1]", &doc), vec![json!(4), json!(3), json!(2), json!(1), json!(0)]);
        assert_eq!(find("$[0:5:0]", &doc), Vec::<JsonValue>::new());
        assert_eq!(find("$[0, -1]", &doc), vec![json!(0), json!(4)]);
    }

    #[test]
    fn extreme_slice_steps_stop_at_the_bounds() {
        let doc = json!([0, 1, 2, 3]);
        assert_eq!(find("$[1::9223372036854775807]", &doc), vec![json!(1)]);
        assert_eq!(find("$[::-9223372036854775808]", &doc), vec![json!(3)]);
        assert_eq!(find("$[-9223372036854775808:]", &doc).len(), 4);
    }

    #[test]
    fn descendant_names_are_preorder() {
        let doc = json!({"a": {"id": 1, "b": {"id": 2}}, "id": 0});
        let mut found = find("$..id", &doc);
        found.sort_by_key(|v| v.as_i64());
        assert_eq!(found, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(find("$..b..id", &doc), vec![json!(2)]);
    }

    #[test]
    fn wildcard_covers_objects_and_arrays() {
        let doc = json!({"a": [1, 2], "b": {"c": 3}});
        assert_eq!(find("$.a[*]", &doc), vec![json!(1), json!(2)]);
        assert_eq!(find("$.b.*", &doc), vec![json!(3)]);
        assert_eq!(find("$..*", &doc).len(), 5);
    }

    #[test]
    fn filters_select_matching_children() {
        let doc = json!({"items": [
            {"name": "a", "size": 1},
            {"name": "b", "size": 5},
            {"name": "c"}
        ]});
        assert_eq!(find("$.items[?(@.size)]", &doc).len(), 2);
        assert_eq!(find("$.items[?(@.size > 2)]", &doc), vec![json!({"name": "b", "size": 5})]);
        assert_eq!(find("$.items[?(@.name == 'c')]", &doc), vec![json!({"name": "c"})]);
        assert_eq!(find("$.items[?@.size != 1]", &doc).len(), 2);
        assert_eq!(find("$.items[?(@.size == 5.0)]", &doc).len(), 1);
    }

    #[test]
    fn malformed_paths_report_position() {
        let err = "$.".parse::<JsonPath>().unwrap_err();
        assert_eq!(err.position(), 2);
        let err = "$[1".parse::<JsonPath>().unwrap_err();
        assert_eq!(err.position(), 3);
        let err = "$['a".parse::<JsonPath>().unwrap_err();
        assert_eq!(err.message(), "unterminated string literal");
        assert!("".parse::<JsonPath>().is_err());
        assert!("$ a".parse::<JsonPath>().is_err());
        assert!("$[?(@.a == )]".parse::<JsonPath>().is_err());
    }

    #[test]
    fn deep_documents_do_not_overflow_descendant_walk() {
        let mut doc = json!(1);
        for _ in 0..2_000 {
            doc = JsonValue::Array(vec![doc]);
        }
        let path: JsonPath = "$..*".parse().unwrap();
        assert_eq!(path.find(&doc).len(), 2_000);
        // Nested serde_json values drop recursively; unwind them iteratively.
        let mut current = doc;
        while let JsonValue::Array(mut items) = current {
            current = items.pop().unwrap_or(JsonValue::Null);
        }
    }
}
