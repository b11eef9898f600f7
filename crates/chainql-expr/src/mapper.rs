//! Operator and member mapping from expression trees to SQL fragments
//!
//! Literal text is embedded as written. Nothing here escapes values, so
//! callbacks must not carry untrusted input.

use crate::ast::*;
use chainql_core::TranslationError;

/// Binds lambda parameters to the table aliases their members resolve against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    bindings: Vec<(String, Option<String>)>,
}

impl Scope {
    /// Every parameter of `lambda` refers to the single source table
    pub fn unqualified(lambda: &Lambda) -> Self {
        Self {
            bindings: lambda.params.iter().map(|p| (p.clone(), None)).collect(),
        }
    }

    /// Parameter `i` of `lambda` resolves against `aliases[i]`
    pub fn aliased(lambda: &Lambda, aliases: &[&str]) -> Self {
        Self {
            bindings: lambda
                .params
                .iter()
                .zip(aliases)
                .map(|(p, a)| (p.clone(), Some((*a).to_string())))
                .collect(),
        }
    }

    fn alias_of(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(param, _)| param == name)
            .and_then(|(_, alias)| alias.as_deref())
    }
}

/// Map a predicate or key-selector body to SQL
pub fn map_expression(expr: &Expression, scope: &Scope) -> Result<String, TranslationError> {
    Mapper { scope }.map(expr)
}

/// Map a projection body: an object literal at the root becomes a column list
pub fn map_projection(expr: &Expression, scope: &Scope) -> Result<String, TranslationError> {
    let mapper = Mapper { scope };
    match expr {
        Expression::Object(entries) => {
            if entries.is_empty() {
                return Err(TranslationError::UnsupportedExpression(
                    "empty object literal in projection".to_string(),
                ));
            }
            let columns = entries
                .iter()
                .map(|(key, value)| Ok(format!("{} AS {}", mapper.map(value)?, key)))
                .collect::<Result<Vec<_>, TranslationError>>()?;
            Ok(columns.join(", "))
        }
        other => mapper.map(other),
    }
}

struct Mapper<'a> {
    scope: &'a Scope,
}

impl Mapper<'_> {
    fn map(&self, expr: &Expression) -> Result<String, TranslationError> {
        match expr {
            Expression::Unary { op, operand } => {
                let operand = self.map(operand)?;
                Ok(match op {
                    UnaryOp::Not => format!("NOT {}", operand),
                    other => format!("{} {}", other.symbol(), operand),
                })
            }
            Expression::Binary { left, op, right } => {
                let sql_op = match op {
                    BinaryOp::Equals | BinaryOp::StrictEquals => "=",
                    BinaryOp::NotEquals | BinaryOp::StrictNotEquals => "<>",
                    other => other.symbol(),
                };
                Ok(format!("({} {} {})", self.map(left)?, sql_op, self.map(right)?))
            }
            Expression::Logical { left, op, right } => {
                let sql_op = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                Ok(format!("({} {} {})", self.map(left)?, sql_op, self.map(right)?))
            }
            Expression::Member { object, property } => self.map_member(object, property),
            Expression::Call { callee, args } => self.map_call(expr, callee, args),
            Expression::Identifier(name) => Ok(name.clone()),
            Expression::Literal(lit) => Ok(match lit.value {
                LiteralValue::Boolean(true) => "TRUE".to_string(),
                LiteralValue::Boolean(false) => "FALSE".to_string(),
                _ => lit.raw.clone(),
            }),
            Expression::Object(_) => Err(TranslationError::UnsupportedExpression(
                "object literal outside a projection".to_string(),
            )),
        }
    }

    fn map_member(&self, object: &Expression, property: &str) -> Result<String, TranslationError> {
        if property == "length" {
            return Ok(format!("LENGTH({})", self.map(object)?));
        }

        match object {
            Expression::Identifier(name) => match self.scope.alias_of(name) {
                Some(alias) => Ok(format!("{}.{}", alias, property)),
                None => Ok(property.to_string()),
            },
            _ => Ok(property.to_string()),
        }
    }

    fn map_call(
        &self,
        call: &Expression,
        callee: &Expression,
        args: &[Expression],
    ) -> Result<String, TranslationError> {
        let Expression::Member { object, property } = callee else {
            return Err(TranslationError::UnsupportedExpression(call.describe()));
        };
        let column = self.map(object)?;

        match property.as_str() {
            "startsWith" => Ok(format!("{} LIKE \"{}%\"", column, like_operand(call, args)?)),
            "endsWith" => Ok(format!("{} LIKE \"%{}\"", column, like_operand(call, args)?)),
            "contains" | "includes" => {
                Ok(format!("{} LIKE \"%{}%\"", column, like_operand(call, args)?))
            }
            "toLowerCase" | "toUpperCase" => {
                if !args.is_empty() {
                    return Err(TranslationError::UnsupportedExpression(format!(
                        "{} with arguments",
                        call.describe()
                    )));
                }
                let function = if property == "toLowerCase" { "LOWER" } else { "UPPER" };
                Ok(format!("{}({})", function, column))
            }
            _ => Err(TranslationError::UnsupportedExpression(call.describe())),
        }
    }
}

/// The text spliced into a LIKE pattern: one string or number literal
fn like_operand(call: &Expression, args: &[Expression]) -> Result<String, TranslationError> {
    match args {
        [Expression::Literal(lit)] => match &lit.value {
            LiteralValue::String(text) => Ok(text.clone()),
            LiteralValue::Number(_) => Ok(lit.raw.clone()),
            _ => Err(TranslationError::UnsupportedExpression(format!(
                "{} with argument {}",
                call.describe(),
                lit.raw
            ))),
        },
        [other] => Err(TranslationError::UnsupportedExpression(format!(
            "{} with non-literal argument {}",
            call.describe(),
            other.describe()
        ))),
        _ => Err(TranslationError::UnsupportedExpression(format!(
            "{} with {} arguments",
            call.describe(),
            args.len()
        ))),
    }
}
