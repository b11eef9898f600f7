//! Typed expression builder
//!
//! Constructs callback trees directly, without going through source text:
//!
//! ```
//! use chainql_expr::builder::{field, lambda};
//!
//! let predicate = lambda(["x"], field("x", "id").gt(12).and(field("x", "title").contains("ll")));
//! assert_eq!(predicate.to_string(), r#"x => ((x.id > 12) && x.title.contains("ll"))"#);
//! ```

use crate::ast::*;
use std::ops;

/// A lambda with the given parameter names and single-expression body
pub fn lambda<I, S>(params: I, body: impl Into<Expression>) -> Lambda
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Lambda::new(params.into_iter().map(Into::into).collect(), body.into())
}

/// A reference to a lambda parameter
pub fn param(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

/// `param.property`
pub fn field(param_name: &str, property: &str) -> Expression {
    param(param_name).member(property)
}

/// A literal value
pub fn lit(value: impl Into<Literal>) -> Expression {
    Expression::Literal(value.into())
}

/// A plain object literal, used for multi-column projections
pub fn object<I, K>(entries: I) -> Expression
where
    I: IntoIterator<Item = (K, Expression)>,
    K: Into<String>,
{
    Expression::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

impl Expression {
    fn binary(self, op: BinaryOp, rhs: impl Into<Expression>) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            op,
            right: Box::new(rhs.into()),
        }
    }

    fn logical(self, op: LogicalOp, rhs: impl Into<Expression>) -> Expression {
        Expression::Logical {
            left: Box::new(self),
            op,
            right: Box::new(rhs.into()),
        }
    }

    fn method(self, name: &str, args: Vec<Expression>) -> Expression {
        self.member(name).call(args)
    }

    pub fn member(self, property: &str) -> Expression {
        Expression::Member {
            object: Box::new(self),
            property: property.to_string(),
        }
    }

    pub fn call(self, args: Vec<Expression>) -> Expression {
        Expression::Call {
            callee: Box::new(self),
            args,
        }
    }

    pub fn equals(self, rhs: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::StrictEquals, rhs)
    }

    pub fn not_equals(self, rhs: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::StrictNotEquals, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::GreaterThan, rhs)
    }

    pub fn ge(self, rhs: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::GreaterEquals, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::LessThan, rhs)
    }

    pub fn le(self, rhs: impl Into<Expression>) -> Expression {
        self.binary(BinaryOp::LessEquals, rhs)
    }

    pub fn and(self, rhs: impl Into<Expression>) -> Expression {
        self.logical(LogicalOp::And, rhs)
    }

    pub fn or(self, rhs: impl Into<Expression>) -> Expression {
        self.logical(LogicalOp::Or, rhs)
    }

    pub fn starts_with(self, prefix: &str) -> Expression {
        self.method("startsWith", vec![lit(prefix)])
    }

    pub fn ends_with(self, suffix: &str) -> Expression {
        self.method("endsWith", vec![lit(suffix)])
    }

    pub fn contains(self, needle: &str) -> Expression {
        self.method("contains", vec![lit(needle)])
    }

    pub fn to_lower(self) -> Expression {
        self.method("toLowerCase", Vec::new())
    }

    pub fn to_upper(self) -> Expression {
        self.method("toUpperCase", Vec::new())
    }

    pub fn length(self) -> Expression {
        self.member("length")
    }
}

impl ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }
}

macro_rules! arithmetic {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Expression>> ops::$trait<T> for Expression {
            type Output = Expression;

            fn $method(self, rhs: T) -> Expression {
                self.binary($op, rhs)
            }
        }
    };
}

arithmetic!(Add, add, BinaryOp::Add);
arithmetic!(Sub, sub, BinaryOp::Subtract);
arithmetic!(Mul, mul, BinaryOp::Multiply);
arithmetic!(Div, div, BinaryOp::Divide);
arithmetic!(Rem, rem, BinaryOp::Modulo);

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal {
            value: LiteralValue::Number(value as f64),
            raw: value.to_string(),
        }
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::from(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::boolean(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::string(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::string(&value)
    }
}

impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Expression::Literal(value)
    }
}

macro_rules! literal_expression {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expression {
                fn from(value: $ty) -> Self {
                    Expression::Literal(Literal::from(value))
                }
            }
        )*
    };
}

literal_expression!(i64, i32, f64, bool, &str, String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_lambda;
    use proptest::prelude::*;

    #[test]
    fn test_builder_matches_parser() {
        let built = lambda(["x"], field("x", "id").gt(12));
        let parsed = parse_lambda("x => x.id > 12").unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_string_methods_match_parser() {
        let built = lambda(["x"], field("x", "author").contains("ll"));
        let parsed = parse_lambda(r#"x => x.author.contains("ll")"#).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_operator_overloads() {
        let expr = !(field("x", "a") + 1).equals(field("x", "b") * 2);
        assert_eq!(expr.to_string(), "!((x.a + 1) === (x.b * 2))");
    }

    #[test]
    fn test_object_projection() {
        let projection = lambda(
            ["p", "u"],
            object([("title", field("p", "title")), ("author", field("u", "name"))]),
        );
        assert_eq!(projection.arity(), 2);
        assert_eq!(
            projection.to_string(),
            "(p, u) => ({ title: p.title, author: u.name })"
        );
    }

    fn leaf() -> impl Strategy<Value = Expression> {
        let column = prop::sample::select(vec!["id", "title", "author", "views"]);
        prop_oneof![
            column.clone().prop_map(|c| field("x", c)),
            (0i64..10_000).prop_map(|n| lit(n)),
            any::<bool>().prop_map(|b| lit(b)),
            "[a-z ]{0,6}".prop_map(|s: String| lit(s)),
            (column.clone(), "[a-z]{1,4}").prop_map(|(c, s)| field("x", c).contains(&s)),
            (column, "[a-z]{1,4}").prop_map(|(c, s)| field("x", c).to_lower().starts_with(&s)),
        ]
    }

    fn expression() -> impl Strategy<Value = Expression> {
        leaf().prop_recursive(4, 32, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.gt(r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.equals(r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.or(r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l + r),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l * r),
                inner.prop_map(|e| !e),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_printed_lambda_parses_back(body in expression()) {
            let built = lambda(["x"], body);
            let parsed = parse_lambda(&built.to_string()).unwrap();
            prop_assert_eq!(parsed, built);
        }
    }
}
