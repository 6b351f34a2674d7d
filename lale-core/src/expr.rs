//! Column expressions evaluated over a [`Frame`].
//!
//! An [`Expr`] is a literal, a column reference, a binary arithmetic
//! operation or a call to one of the built-in functions (`replace`,
//! `identity` and the date parts). Evaluation yields one cell per row;
//! literals broadcast. Division and modulo round toward negative infinity.
//! A null operand, or an arithmetic result that is not a finite number,
//! produces a null cell.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::{Number, Value};
use std::fmt;
use std::ops;
use std::str::FromStr;

use crate::data::{FeatureRef, Frame, values_equal};
use crate::error::{LaleError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

/// What `replace` does with values missing from its mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HandleUnknown {
    /// Keep the value unchanged.
    #[default]
    Identity,
    /// Substitute the given value.
    UseEncodedValue(Value),
}

/// Calendar fields extracted from date strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    DayOfMonth,
    /// Monday is 0.
    DayOfWeek,
    DayOfYear,
    Hour,
    Minute,
    Month,
}

impl DatePart {
    pub fn name(self) -> &'static str {
        match self {
            Self::DayOfMonth => "day_of_month",
            Self::DayOfWeek => "day_of_week",
            Self::DayOfYear => "day_of_year",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Month => "month",
        }
    }

    fn extract(self, t: &NaiveDateTime) -> u32 {
        match self {
            Self::DayOfMonth => t.day(),
            Self::DayOfWeek => t.weekday().num_days_from_monday(),
            Self::DayOfYear => t.ordinal(),
            Self::Hour => t.hour(),
            Self::Minute => t.minute(),
            Self::Month => t.month(),
        }
    }
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatePart {
    type Err = LaleError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "day_of_month" => Ok(Self::DayOfMonth),
            "day_of_week" => Ok(Self::DayOfWeek),
            "day_of_year" => Ok(Self::DayOfYear),
            "hour" => Ok(Self::Hour),
            "minute" => Ok(Self::Minute),
            "month" => Ok(Self::Month),
            other => Err(LaleError::data(format!("Unimplemented function {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(FeatureRef),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Replace {
        column: Box<Expr>,
        mapping: Vec<(Value, Value)>,
        handle_unknown: HandleUnknown,
    },
    Identity(Box<Expr>),
    DatePart {
        part: DatePart,
        column: Box<Expr>,
        /// strftime-style format; common ISO and US layouts are tried when absent.
        format: Option<String>,
    },
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn col(feature: impl Into<FeatureRef>) -> Self {
        Self::Column(feature.into())
    }

    pub fn binop(op: BinOp, left: Expr, right: Expr) -> Self {
        Self::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn floor_div(self, rhs: Expr) -> Self {
        Self::binop(BinOp::FloorDiv, self, rhs)
    }

    pub fn pow(self, rhs: Expr) -> Self {
        Self::binop(BinOp::Pow, self, rhs)
    }

    pub fn replace(
        self,
        mapping: impl IntoIterator<Item = (Value, Value)>,
        handle_unknown: HandleUnknown,
    ) -> Self {
        Self::Replace {
            column: Box::new(self),
            mapping: mapping.into_iter().collect(),
            handle_unknown,
        }
    }

    pub fn identity(self) -> Self {
        Self::Identity(Box::new(self))
    }

    pub fn date_part(self, part: DatePart, format: Option<&str>) -> Self {
        Self::DatePart {
            part,
            column: Box::new(self),
            format: format.map(str::to_string),
        }
    }

    /// Date part looked up by function name, e.g. `"day_of_week"`.
    pub fn date_function(name: &str, column: Expr, format: Option<&str>) -> Result<Self> {
        Ok(column.date_part(name.parse()?, format))
    }
}

macro_rules! expr_ops {
    ($($trait:ident $method:ident $op:ident),* $(,)?) => {
        $(
            impl ops::$trait for Expr {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    Expr::binop(BinOp::$op, self, rhs)
                }
            }
        )*
    };
}

expr_ops!(Add add Add, Sub sub Sub, Mul mul Mul, Div div Div, Rem rem Mod);

/// Evaluate `expr` over every row of `x`.
pub fn eval(x: &Frame, expr: &Expr) -> Result<Vec<Value>> {
    Ok(match evaluate(x, expr)? {
        Evaluated::Scalar(value) => vec![value; x.row_count()],
        Evaluated::Column(values) => values,
    })
}

enum Evaluated {
    Scalar(Value),
    Column(Vec<Value>),
}

impl Evaluated {
    fn map(self, f: impl Fn(&Value) -> Result<Value>) -> Result<Self> {
        match self {
            Self::Scalar(value) => Ok(Self::Scalar(f(&value)?)),
            Self::Column(values) => values.iter().map(f).collect::<Result<_>>().map(Self::Column),
        }
    }
}

fn evaluate(x: &Frame, expr: &Expr) -> Result<Evaluated> {
    use Evaluated::{Column, Scalar};

    match expr {
        Expr::Literal(value) => Ok(Scalar(value.clone())),
        Expr::Column(feature) => {
            let col = x.column_index(feature)?;
            Ok(Column(x.column_values(col).cloned().collect()))
        }
        Expr::BinOp { op, left, right } => {
            let op = *op;
            match (evaluate(x, left)?, evaluate(x, right)?) {
                (Scalar(a), Scalar(b)) => Ok(Scalar(apply(op, &a, &b)?)),
                (Scalar(a), Column(bs)) => {
                    bs.iter().map(|b| apply(op, &a, b)).collect::<Result<_>>().map(Column)
                }
                (Column(values), Scalar(b)) => {
                    values.iter().map(|a| apply(op, a, &b)).collect::<Result<_>>().map(Column)
                }
                (Column(values), Column(bs)) => values
                    .iter()
                    .zip(&bs)
                    .map(|(a, b)| apply(op, a, b))
                    .collect::<Result<_>>()
                    .map(Column),
            }
        }
        Expr::Replace {
            column,
            mapping,
            handle_unknown,
        } => evaluate(x, column)?.map(|value| Ok(replace_value(value, mapping, handle_unknown))),
        Expr::Identity(inner) => evaluate(x, inner),
        Expr::DatePart {
            part,
            column,
            format,
        } => evaluate(x, column)?.map(|value| date_part(*part, value, format.as_deref())),
    }
}

fn apply(op: BinOp, a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::String(s), Value::String(t)) if op == BinOp::Add => {
            Ok(Value::String(format!("{s}{t}")))
        }
        (Value::Number(m), Value::Number(n)) => Ok(match (m.as_i64(), n.as_i64()) {
            (Some(i), Some(j)) => match int_op(op, i, j) {
                Some(v) => Value::from(v),
                None => float_value(float_op(op, i as f64, j as f64)),
            },
            _ => float_value(float_op(
                op,
                m.as_f64().unwrap_or(f64::NAN),
                n.as_f64().unwrap_or(f64::NAN),
            )),
        }),
        _ => Err(LaleError::data(format!(
            "unsupported operands for {}: {a} and {b}",
            op.symbol()
        ))),
    }
}

/// Integer arithmetic; `None` when the result is not an integer or overflows.
fn int_op(op: BinOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => None,
        BinOp::FloorDiv => {
            let q = a.checked_div(b)?;
            let r = a.checked_rem(b)?;
            if r != 0 && (r < 0) != (b < 0) {
                q.checked_sub(1)
            } else {
                Some(q)
            }
        }
        BinOp::Mod => {
            let r = a.checked_rem(b)?;
            Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        BinOp::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
        }
        BinOp::Pow => a.powf(b),
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn replace_value(
    value: &Value,
    mapping: &[(Value, Value)],
    handle_unknown: &HandleUnknown,
) -> Value {
    match mapping.iter().find(|(from, _)| values_equal(from, value)) {
        Some((_, to)) => to.clone(),
        None => match handle_unknown {
            HandleUnknown::Identity => value.clone(),
            HandleUnknown::UseEncodedValue(unknown) => unknown.clone(),
        },
    }
}

const DEFAULT_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
];

fn parse_with(s: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, format)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, format).ok()?.and_hms_opt(0, 0, 0))
}

fn parse_datetime(s: &str, format: Option<&str>) -> Result<NaiveDateTime> {
    let s = s.trim();
    let parsed = match format {
        Some(format) => parse_with(s, format),
        None => DateTime::parse_from_rfc3339(s)
            .map(|t| t.naive_local())
            .ok()
            .or_else(|| DEFAULT_FORMATS.iter().find_map(|f| parse_with(s, f))),
    };
    parsed.ok_or_else(|| match format {
        Some(format) => LaleError::data(format!("cannot parse '{s}' as a date with '{format}'")),
        None => LaleError::data(format!("cannot parse '{s}' as a date")),
    })
}

fn date_part(part: DatePart, value: &Value, format: Option<&str>) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::from(part.extract(&parse_datetime(s, format)?))),
        other => Err(LaleError::data(format!("{part} expects date strings, found {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn frame() -> Frame {
        Frame::new(
            vec!["a".into(), "b".into(), "when".into(), "color".into()],
            vec![
                vec![json!(7), json!(2), json!("2021-03-04 10:15:00"), json!("red")],
                vec![json!(-7), json!(2), json!("2020-12-31T23:59:00"), json!("blue")],
                vec![json!(1.5), json!(0), json!(null), json!(null)],
            ],
        )
        .unwrap()
    }

    fn eval_ok(expr: Expr) -> Vec<Value> {
        eval(&frame(), &expr).unwrap()
    }

    #[test]
    fn test_literal_and_column() {
        assert_eq!(eval_ok(Expr::lit(5)), vec![json!(5); 3]);
        assert_eq!(eval_ok(Expr::col("b")), vec![json!(2), json!(2), json!(0)]);
        assert_eq!(eval_ok(Expr::col(1usize)), vec![json!(2), json!(2), json!(0)]);
        assert!(eval(&frame(), &Expr::col("missing")).is_err());
    }

    #[test]
    fn test_arithmetic() {
        let (a, b) = (Expr::col("a"), Expr::col("b"));
        assert_eq!(eval_ok(a.clone() + b.clone()), vec![json!(9), json!(-5), json!(1.5)]);
        assert_eq!(eval_ok(a.clone() - Expr::lit(1)), vec![json!(6), json!(-8), json!(0.5)]);
        assert_eq!(eval_ok(a.clone() * b.clone()), vec![json!(14), json!(-14), json!(0.0)]);
        assert_eq!(eval_ok(a.clone() / b.clone()), vec![json!(3.5), json!(-3.5), json!(null)]);
    }

    #[test]
    fn test_floor_division_and_modulo() {
        let (a, b) = (Expr::col("a"), Expr::col("b"));
        assert_eq!(
            eval_ok(a.clone().floor_div(b.clone())),
            vec![json!(3), json!(-4), json!(null)]
        );
        assert_eq!(eval_ok(a % b), vec![json!(1), json!(1), json!(null)]);
        assert_eq!(eval_ok(Expr::lit(-5.5) % Expr::lit(2)), vec![json!(0.5); 3]);
    }

    #[test]
    fn test_power() {
        assert_eq!(eval_ok(Expr::col("b").pow(Expr::lit(3))), vec![json!(8), json!(8), json!(0)]);
        assert_eq!(eval_ok(Expr::lit(2).pow(Expr::lit(-1))), vec![json!(0.5); 3]);
    }

    #[test]
    fn test_nulls_and_strings() {
        let joined = Expr::col("color") + Expr::lit("!");
        assert_eq!(eval_ok(joined), vec![json!("red!"), json!("blue!"), json!(null)]);
        let err = eval(&frame(), &(Expr::col("color") * Expr::lit(2))).unwrap_err();
        assert!(err.to_string().contains("unsupported operands for *"));
    }

    #[test]
    fn test_replace_keeps_unknown_values() {
        let expr = Expr::col("color").replace(
            [(json!("red"), json!(0)), (json!(null), json!(-1))],
            HandleUnknown::Identity,
        );
        assert_eq!(eval_ok(expr), vec![json!(0), json!("blue"), json!(-1)]);
    }

    #[test]
    fn test_replace_with_encoded_unknown() {
        let expr = Expr::col("a").replace(
            [(json!(7.0), json!("seven"))],
            HandleUnknown::UseEncodedValue(json!("other")),
        );
        assert_eq!(eval_ok(expr), vec![json!("seven"), json!("other"), json!("other")]);
    }

    #[test]
    fn test_identity() {
        assert_eq!(eval_ok(Expr::col("a").identity()), eval_ok(Expr::col("a")));
    }

    #[test]
    fn test_date_parts() {
        let cases = [
            (DatePart::DayOfMonth, [4, 31]),
            (DatePart::DayOfWeek, [3, 3]),
            (DatePart::DayOfYear, [63, 366]),
            (DatePart::Hour, [10, 23]),
            (DatePart::Minute, [15, 59]),
            (DatePart::Month, [3, 12]),
        ];
        for (part, [first, second]) in cases {
            let values = eval_ok(Expr::col("when").date_part(part, None));
            assert_eq!(values, vec![json!(first), json!(second), json!(null)], "{part}");
        }
    }

    #[test]
    fn test_date_part_with_format() {
        let x = Frame::new(vec!["d".into()], vec![vec![json!("04/03/2021")]]).unwrap();
        let day = Expr::date_function("day_of_month", Expr::col("d"), Some("%d/%m/%Y")).unwrap();
        let month = Expr::col("d").date_part(DatePart::Month, Some("%d/%m/%Y"));
        assert_eq!(eval(&x, &day).unwrap(), vec![json!(4)]);
        assert_eq!(eval(&x, &month).unwrap(), vec![json!(3)]);

        let bad = Expr::col("d").date_part(DatePart::Month, Some("%Y-%m-%d"));
        assert!(eval(&x, &bad).is_err());
    }

    #[test]
    fn test_rfc3339_keeps_local_clock() {
        let x = Frame::new(vec!["t".into()], vec![vec![json!("2021-03-04T10:15:00+02:00")]])
            .unwrap();
        let hour = Expr::col("t").date_part(DatePart::Hour, None);
        assert_eq!(eval(&x, &hour).unwrap(), vec![json!(10)]);
    }

    #[test]
    fn test_unknown_function() {
        let err = Expr::date_function("weekday_name", Expr::col("when"), None).unwrap_err();
        assert_eq!(err.to_string(), "Data error: Unimplemented function weekday_name");
        assert!(eval(&frame(), &Expr::col("a").date_part(DatePart::Hour, None)).is_err());
    }
}
