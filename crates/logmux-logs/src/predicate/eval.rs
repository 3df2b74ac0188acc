use std::borrow::Cow;

use serde_json::{Map, Value as JsonValue};

use logmux_types::LogLevel;

use super::parser::{BinaryOp, Expr, Literal, UnaryOp};
use crate::error::EvalError;

/// Runtime value; objects and arrays borrow from the record
#[derive(Clone, Debug)]
pub enum Value<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    Object(&'a Map<String, JsonValue>),
    Array(&'a [JsonValue]),
}

impl<'a> From<&'a JsonValue> for Value<'a> {
    fn from(value: &'a JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Self::Str(Cow::Borrowed(s)),
            JsonValue::Array(items) => Self::Array(items),
            JsonValue::Object(map) => Self::Object(map),
        }
    }
}

impl Value<'_> {
    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Object(_) | Self::Array(_) => true,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }

    fn is_primitive(&self) -> bool {
        !matches!(self, Self::Object(_) | Self::Array(_))
    }

    fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Object(_) | Self::Array(_) => f64::NAN,
        }
    }

    fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::Str(s) => s.to_string(),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Array(items) => items
                .iter()
                .map(|item| match item {
                    JsonValue::Null => String::new(),
                    other => Value::from(other).to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Names visible to an expression: the record's fields, then level constants
pub struct Scope<'a> {
    record: &'a Map<String, JsonValue>,
}

impl<'a> Scope<'a> {
    pub fn new(record: &'a Map<String, JsonValue>) -> Self {
        Self { record }
    }

    fn lookup(&self, name: &str) -> Result<Value<'a>, EvalError> {
        if let Some(value) = self.record.get(name) {
            return Ok(Value::from(value));
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == name)
            .map(|level| Value::Number(level.value() as f64))
            .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value<'a>, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(Cow::Owned(s.clone())),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),
            Expr::Ident(name) => self.lookup(name),
            Expr::This => Ok(Value::Object(self.record)),
            Expr::Member(object, property) => {
                let object = self.eval(object)?;
                let property = self.eval(property)?;
                member(object, &property)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg if value.is_primitive() => Ok(Value::Number(-value.to_number())),
                    UnaryOp::Neg => Err(EvalError::TypeMismatch {
                        op: "-",
                        left: "nothing",
                        right: value.type_name(),
                    }),
                }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let left = self.eval(left)?;
                if left.truthy() { self.eval(right) } else { Ok(left) }
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let left = self.eval(left)?;
                if left.truthy() { Ok(left) } else { self.eval(right) }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Match(operand, pattern) => match self.eval(operand)? {
                Value::Undefined | Value::Null => Ok(Value::Bool(false)),
                value => Ok(Value::Bool(pattern.is_match(&value.to_js_string()))),
            },
        }
    }
}

fn member<'a>(object: Value<'a>, property: &Value<'_>) -> Result<Value<'a>, EvalError> {
    let key = property.to_js_string();
    match object {
        Value::Undefined | Value::Null => Err(EvalError::NullAccess {
            property: key,
            target: object.type_name(),
        }),
        Value::Object(map) => Ok(map.get(&key).map(Value::from).unwrap_or(Value::Undefined)),
        Value::Array(items) if key == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map(Value::from)
            .unwrap_or(Value::Undefined)),
        Value::Str(s) if key == "length" => Ok(Value::Number(s.chars().count() as f64)),
        _ => Ok(Value::Undefined),
    }
}

fn binary<'a>(op: BinaryOp, left: &Value<'a>, right: &Value<'a>) -> Result<Value<'a>, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };

    let value = match op {
        BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
        BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
        BinaryOp::Ne => Value::Bool(!loose_equals(left, right)),
        BinaryOp::Add => {
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                if !left.is_primitive() || !right.is_primitive() {
                    return Err(mismatch());
                }
                Value::Str(Cow::Owned(left.to_js_string() + &right.to_js_string()))
            } else if left.is_primitive() && right.is_primitive() {
                Value::Number(left.to_number() + right.to_number())
            } else {
                return Err(mismatch());
            }
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            if !left.is_primitive() || !right.is_primitive() {
                return Err(mismatch());
            }
            let (l, r) = (left.to_number(), right.to_number());
            Value::Number(match op {
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                _ => l % r,
            })
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if !left.is_primitive() || !right.is_primitive() {
                return Err(mismatch());
            }
            let ordering = match (left, right) {
                (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(match ordering {
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            })
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are handled in eval"),
    };
    Ok(value)
}

fn strict_equals(left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::Object(l), Value::Object(r)) => std::ptr::eq(*l, *r),
        (Value::Array(l), Value::Array(r)) => std::ptr::eq(*l, *r),
        _ => false,
    }
}

fn loose_equals(left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_) | Value::Str(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_))
        | (Value::Number(_) | Value::Bool(_), Value::Str(_)) => {
            left.to_number() == right.to_number()
        }
        _ => strict_equals(left, right),
    }
}
