//! A small expression language for `lambda` casts.
//!
//! Expressions see exactly one variable, `x`, bound to the value being cast.
//! Supported: integer, float, string, boolean and null literals, list
//! literals, arithmetic (`+ - * / // % **`), comparisons (chained as in
//! `0 < x <= 10`), `in` / `not in`, `and` / `or` / `not`, indexing, and a
//! fixed set of builtin functions. There is no attribute access and no way
//! to name anything outside that set.

use std::cmp::Ordering;

use crate::config::value::Value;

/// A parsed expression, ready to be evaluated against a value.
#[derive(Debug, Clone)]
pub struct Expr {
    source: String,
    root: Node,
}

impl Expr {
    /// Parses an expression. Unknown names are rejected here, not at evaluation.
    pub fn parse(source: &str) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        if tokens.len() > MAX_TOKENS {
            return Err(format!("expression longer than {MAX_TOKENS} tokens"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(format!("unexpected {token:?} after end of expression"));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression with `x` bound to `value`.
    pub fn evaluate(&self, value: &Value) -> Result<Value, String> {
        eval(&self.root, value)
    }
}

/// Bounds parser and evaluator recursion.
const MAX_DEPTH: usize = 64;
const MAX_TOKENS: usize = 1024;

/// Longest string `*` may produce, in bytes.
const MAX_REPEAT_LEN: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
}

const OPERATORS: [&str; 19] = [
    "**", "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "(", ")", "[", "]",
    ",", ".",
];

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                is_float = true;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                is_float = true;
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let token = if is_float {
                text.parse().map(Token::Float).ok()
            } else {
                text.parse().map(Token::Int).ok()
            };
            tokens.push(token.ok_or_else(|| format!("invalid number literal '{text}'"))?);
        } else if c == '"' || c == '\'' {
            let mut text = String::new();
            i += 1;
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err("unterminated string literal".to_string());
                };
                i += 1;
                match ch {
                    _ if ch == c => break,
                    '\\' => {
                        let escaped = chars
                            .get(i)
                            .ok_or_else(|| "unterminated string literal".to_string())?;
                        i += 1;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => *other,
                        });
                    }
                    _ => text.push(ch),
                }
            }
            tokens.push(Token::Str(text));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| format!("unexpected character '{c}'"))?;
            if *op == "." {
                return Err("attribute access is not allowed".to_string());
            }
            i += op.chars().count();
            tokens.push(Token::Op(*op));
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Builtin {
    Int,
    Float,
    Str,
    Bool,
    Len,
    Upper,
    Lower,
    Strip,
    Abs,
    Round,
    Min,
    Max,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "str" => Builtin::Str,
            "bool" => Builtin::Bool,
            "len" => Builtin::Len,
            "upper" => Builtin::Upper,
            "lower" => Builtin::Lower,
            "strip" => Builtin::Strip,
            "abs" => Builtin::Abs,
            "round" => Builtin::Round,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            _ => return None,
        })
    }

    fn accepts(&self, count: usize) -> bool {
        match self {
            Builtin::Round => count == 1 || count == 2,
            Builtin::Min | Builtin::Max => count >= 1,
            _ => count == 1,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Var,
    List(Vec<Node>),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Compare(Box<Node>, Vec<(CompareOp, Node)>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Index(Box<Node>, Box<Node>),
    Call(Builtin, Vec<Node>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), String> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(format!("expected '{op}'"))
        }
    }

    /// Runs `parse` one nesting level deeper.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Node, String>) -> Result<Node, String> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("expression nested deeper than {MAX_DEPTH} levels"));
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn parse_or(&mut self) -> Result<Node, String> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            left = Node::Or(Box::new(left), Box::new(self.parse_and()?));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, String> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            left = Node::And(Box::new(left), Box::new(self.parse_not()?));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node, String> {
        if self.eat_keyword("not") {
            return Ok(Node::Not(Box::new(self.nested(Self::parse_not)?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Node, String> {
        let first = self.parse_additive()?;
        let mut rest = Vec::new();
        loop {
            let next_is_in =
                matches!(self.tokens.get(self.pos + 1), Some(Token::Ident(n)) if n == "in");
            let (op, width) = match self.peek() {
                Some(Token::Op("==")) => (CompareOp::Eq, 1),
                Some(Token::Op("!=")) => (CompareOp::Ne, 1),
                Some(Token::Op("<")) => (CompareOp::Lt, 1),
                Some(Token::Op("<=")) => (CompareOp::Le, 1),
                Some(Token::Op(">")) => (CompareOp::Gt, 1),
                Some(Token::Op(">=")) => (CompareOp::Ge, 1),
                Some(Token::Ident(w)) if w == "in" => (CompareOp::In, 1),
                Some(Token::Ident(w)) if w == "not" && next_is_in => (CompareOp::NotIn, 2),
                _ => break,
            };
            self.pos += width;
            rest.push((op, self.parse_additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Node::Compare(Box::new(first), rest))
        }
    }

    fn parse_additive(&mut self) -> Result<Node, String> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            left = Node::Binary(op, Box::new(left), Box::new(self.parse_term()?));
        }
    }

    fn parse_term(&mut self) -> Result<Node, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_op("*") {
                BinaryOp::Mul
            } else if self.eat_op("//") {
                BinaryOp::FloorDiv
            } else if self.eat_op("/") {
                BinaryOp::Div
            } else if self.eat_op("%") {
                BinaryOp::Mod
            } else {
                return Ok(left);
            };
            left = Node::Binary(op, Box::new(left), Box::new(self.parse_unary()?));
        }
    }

    fn parse_unary(&mut self) -> Result<Node, String> {
        if self.eat_op("-") {
            return Ok(Node::Neg(Box::new(self.nested(Self::parse_unary)?)));
        }
        if self.eat_op("+") {
            return self.nested(Self::parse_unary);
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Node, String> {
        let base = self.parse_postfix()?;
        if self.eat_op("**") {
            let exponent = self.nested(Self::parse_unary)?;
            return Ok(Node::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Node, String> {
        let mut node = self.parse_atom()?;
        while self.eat_op("[") {
            let index = self.nested(Self::parse_or)?;
            self.expect_op("]")?;
            node = Node::Index(Box::new(node), Box::new(index));
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<Node, String> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Node::Literal(Value::Integer(i))),
            Some(Token::Float(f)) => Ok(Node::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Node::Literal(Value::String(s))),
            Some(Token::Op("(")) => {
                let inner = self.nested(Self::parse_or)?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Some(Token::Op("[")) => Ok(Node::List(self.parse_items("]")?)),
            Some(Token::Ident(name)) => match name.as_str() {
                "x" => Ok(Node::Var),
                "true" | "True" => Ok(Node::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Node::Literal(Value::Bool(false))),
                "null" | "None" => Ok(Node::Literal(Value::Null)),
                _ => {
                    let builtin =
                        Builtin::from_name(&name).ok_or_else(|| format!("unknown name '{name}'"))?;
                    self.expect_op("(")?;
                    let args = self.parse_items(")")?;
                    if !builtin.accepts(args.len()) {
                        return Err(format!("wrong number of arguments to '{name}'"));
                    }
                    Ok(Node::Call(builtin, args))
                }
            },
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    /// Parses comma separated expressions up to and including `close`.
    fn parse_items(&mut self, close: &str) -> Result<Vec<Node>, String> {
        let mut items = Vec::new();
        while !self.eat_op(close) {
            items.push(self.nested(Self::parse_or)?);
            if !self.eat_op(",") {
                self.expect_op(close)?;
                break;
            }
        }
        Ok(items)
    }
}

fn eval(node: &Node, x: &Value) -> Result<Value, String> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Var => Ok(x.clone()),
        Node::List(items) => items
            .iter()
            .map(|item| eval(item, x))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Neg(inner) => match eval(inner, x)? {
            Value::Integer(i) => i.checked_neg().map(Value::Integer).ok_or_else(overflow),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(format!("cannot negate {}", other.type_name())),
        },
        Node::Not(inner) => Ok(Value::Bool(!eval(inner, x)?.is_truthy())),
        Node::And(left, right) => {
            let left = eval(left, x)?;
            if left.is_truthy() {
                eval(right, x)
            } else {
                Ok(left)
            }
        }
        Node::Or(left, right) => {
            let left = eval(left, x)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval(right, x)
            }
        }
        Node::Binary(op, left, right) => binary(*op, eval(left, x)?, eval(right, x)?),
        Node::Compare(first, rest) => {
            let mut left = eval(first, x)?;
            for (op, node) in rest {
                let right = eval(node, x)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Node::Index(target, index) => index_value(eval(target, x)?, eval(index, x)?),
        Node::Call(builtin, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, x))
                .collect::<Result<Vec<_>, _>>()?;
            call(*builtin, args)
        }
    }
}

fn overflow() -> String {
    "integer overflow".to_string()
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    match (op, &left, &right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            return Ok(Value::String(format!("{a}{b}")));
        }
        (BinaryOp::Add, Value::Array(a), Value::Array(b)) => {
            return Ok(Value::Array(a.iter().chain(b).cloned().collect()));
        }
        (BinaryOp::Add, Value::Bytes(a), Value::Bytes(b)) => {
            return Ok(Value::Bytes(a.iter().chain(b).copied().collect()));
        }
        (BinaryOp::Mul, Value::String(s), Value::Integer(n))
        | (BinaryOp::Mul, Value::Integer(n), Value::String(s)) => {
            let count = usize::try_from(*n).unwrap_or(0);
            return match s.len().checked_mul(count) {
                Some(len) if len <= MAX_REPEAT_LEN => Ok(Value::String(s.repeat(count))),
                _ => Err("repeated string too large".to_string()),
            };
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (Num::of(&left), Num::of(&right)) else {
        return Err(format!(
            "unsupported operand types for {op:?}: {} and {}",
            left.type_name(),
            right.type_name()
        ));
    };

    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return Err("division by zero".to_string());
                }
                return Ok(Value::Float(a as f64 / b as f64));
            }
            BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => {
                return Err("division by zero".to_string());
            }
            BinaryOp::FloorDiv => a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            }),
            BinaryOp::Mod => a.checked_rem(b).map(|r| {
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            }),
            BinaryOp::Pow if b < 0 => return Ok(Value::Float((a as f64).powf(b as f64))),
            BinaryOp::Pow => u32::try_from(b).ok().and_then(|b| a.checked_pow(b)),
        };
        return result.map(Value::Integer).ok_or_else(overflow);
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err("division by zero".to_string());
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::Pow => a.powf(b),
    };
    Ok(Value::Float(result))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn order(left: &Value, right: &Value) -> Result<Ordering, String> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        format!(
            "cannot order {} and {}",
            left.type_name(),
            right.type_name()
        )
    })
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, String> {
    Ok(match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Lt => order(left, right)? == Ordering::Less,
        CompareOp::Le => order(left, right)? != Ordering::Greater,
        CompareOp::Gt => order(left, right)? == Ordering::Greater,
        CompareOp::Ge => order(left, right)? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
    })
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, String> {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => Ok(h.contains(n.as_str())),
        (Value::Array(items), _) => Ok(items.iter().any(|item| values_equal(item, needle))),
        (Value::Map(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(format!(
            "cannot test {} for membership in {}",
            needle.type_name(),
            haystack.type_name()
        )),
    }
}

fn index_value(target: Value, index: Value) -> Result<Value, String> {
    match (target, index) {
        (Value::Map(mut map), Value::String(key)) => {
            map.remove(&key).ok_or_else(|| format!("key '{key}' not found"))
        }
        (Value::Array(mut items), Value::Integer(i)) => {
            let at = position(i, items.len())?;
            Ok(items.swap_remove(at))
        }
        (Value::String(s), Value::Integer(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let at = position(i, chars.len())?;
            Ok(Value::String(chars[at].to_string()))
        }
        (target, index) => Err(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        )),
    }
}

/// Resolves a possibly negative index against a length.
fn position(index: i64, len: usize) -> Result<usize, String> {
    let len_i = i64::try_from(len).map_err(|_| overflow())?;
    let at = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&at) {
        usize::try_from(at).map_err(|_| overflow())
    } else {
        Err(format!("index {index} out of range"))
    }
}

fn call(builtin: Builtin, mut args: Vec<Value>) -> Result<Value, String> {
    if matches!(builtin, Builtin::Min | Builtin::Max) {
        return extremum(builtin, args);
    }
    if builtin == Builtin::Round {
        let digits = if args.len() == 2 { args.pop() } else { None };
        return round(args.swap_remove(0), digits);
    }

    let arg = args.swap_remove(0);
    match (builtin, arg) {
        (Builtin::Int, Value::Integer(i)) => Ok(Value::Integer(i)),
        (Builtin::Int, Value::Bool(b)) => Ok(Value::Integer(i64::from(b))),
        (Builtin::Int, Value::Float(f)) => float_to_int(f.trunc()),
        (Builtin::Int, Value::String(s)) => s
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| format!("invalid literal for int(): '{s}'")),
        (Builtin::Float, Value::String(s)) => s
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| format!("could not convert string to float: '{s}'")),
        (Builtin::Float, other) => Num::of(&other)
            .map(|n| Value::Float(n.as_f64()))
            .ok_or_else(|| format!("float() argument must be a number, not {}", other.type_name())),
        (Builtin::Str, other) => Ok(Value::String(other.to_string())),
        (Builtin::Bool, other) => Ok(Value::Bool(other.is_truthy())),
        (Builtin::Len, Value::String(s)) => len(s.chars().count()),
        (Builtin::Len, Value::Bytes(b)) => len(b.len()),
        (Builtin::Len, Value::Array(a)) => len(a.len()),
        (Builtin::Len, Value::Map(m)) => len(m.len()),
        (Builtin::Upper, Value::String(s)) => Ok(Value::String(s.to_uppercase())),
        (Builtin::Lower, Value::String(s)) => Ok(Value::String(s.to_lowercase())),
        (Builtin::Strip, Value::String(s)) => Ok(Value::String(s.trim().to_string())),
        (Builtin::Abs, Value::Integer(i)) => {
            i.checked_abs().map(Value::Integer).ok_or_else(overflow)
        }
        (Builtin::Abs, Value::Float(f)) => Ok(Value::Float(f.abs())),
        (builtin, other) => Err(format!(
            "{}() does not accept {}",
            format!("{builtin:?}").to_lowercase(),
            other.type_name()
        )),
    }
}

fn len(n: usize) -> Result<Value, String> {
    i64::try_from(n).map(Value::Integer).map_err(|_| overflow())
}

fn float_to_int(f: f64) -> Result<Value, String> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Ok(Value::Integer(f as i64))
    } else {
        Err(format!("cannot convert {f} to integer"))
    }
}

fn round(value: Value, digits: Option<Value>) -> Result<Value, String> {
    let number = Num::of(&value)
        .ok_or_else(|| format!("round() does not accept {}", value.type_name()))?;
    match digits {
        None => match number {
            Num::Int(i) => Ok(Value::Integer(i)),
            Num::Float(f) => float_to_int(f.round()),
        },
        Some(Value::Integer(d)) => {
            let d = i32::try_from(d).map_err(|_| overflow())?;
            let scale = 10f64.powi(d);
            Ok(Value::Float((number.as_f64() * scale).round() / scale))
        }
        Some(other) => Err(format!("round() digits must be an integer, not {}", other.type_name())),
    }
}

fn extremum(builtin: Builtin, args: Vec<Value>) -> Result<Value, String> {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::Array(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    };
    let mut items = items.into_iter();
    let mut best = items
        .next()
        .ok_or_else(|| "min()/max() of an empty sequence".to_string())?;
    for item in items {
        let ordering = order(&item, &best)?;
        let better = match builtin {
            Builtin::Min => ordering == Ordering::Less,
            _ => ordering == Ordering::Greater,
        };
        if better {
            best = item;
        }
    }
    Ok(best)
}
