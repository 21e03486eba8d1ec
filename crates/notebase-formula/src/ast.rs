//! Formula Abstract Syntax Tree types

use notebase_core::{format_number, Value};
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Text, number, boolean or null literal
    Literal(Value),

    /// `prop("Name")`, holding the name as written
    PropertyRef(String),

    /// Function call. `name` is kept as written; lookup is case-insensitive.
    Call { name: String, args: Vec<Expression> },

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// `if(condition, then, else)`; only the taken branch is evaluated
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Not,
}

impl BinaryOperator {
    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Equal | BinaryOperator::NotEqual => 3,
            BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 4,
            BinaryOperator::Add | BinaryOperator::Subtract => 5,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 6,
            BinaryOperator::Power => 7,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOperator::Power)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "^",
        }
    }
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
        }
    }
}

impl Expression {
    /// Text literal
    pub fn text<S: Into<String>>(s: S) -> Self {
        Expression::Literal(Value::Text(s.into()))
    }

    /// Number literal
    pub fn number(n: f64) -> Self {
        Expression::Literal(Value::Number(n))
    }

    /// Property names referenced through `prop()`, in source order, with
    /// duplicates kept
    pub fn property_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Literal(_) => {}
            Expression::PropertyRef(name) => out.push(name),
            Expression::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_references(out),
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_references(out);
                then_branch.collect_references(out);
                else_branch.collect_references(out);
            }
        }
    }

    /// Visit every function call, outermost first
    pub fn for_each_call<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a str, &'a [Expression]),
    {
        match self {
            Expression::Literal(_) | Expression::PropertyRef(_) => {}
            Expression::Call { name, args } => {
                f(name, args);
                for arg in args {
                    arg.for_each_call(f);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.for_each_call(f);
                right.for_each_call(f);
            }
            Expression::UnaryOp { operand, .. } => operand.for_each_call(f),
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.for_each_call(f);
                then_branch.for_each_call(f);
                else_branch.for_each_call(f);
            }
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    expr: &Expression,
    parent: BinaryOperator,
    right_side: bool,
) -> fmt::Result {
    let needs_parens = match expr {
        Expression::BinaryOp { op, .. } => {
            let (child, outer) = (op.precedence(), parent.precedence());
            child < outer
                || (child == outer && right_side != parent.is_right_associative())
        }
        _ => false,
    };
    if needs_parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Prints canonical formula text that parses back to an equal tree
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::Text(s)) => write_string_literal(f, s),
            Expression::Literal(Value::Number(n)) => f.write_str(&format_number(*n)),
            Expression::Literal(Value::Boolean(b)) => write!(f, "{}", b),
            Expression::Literal(Value::Null) => f.write_str("null"),
            // Not produced by the parser
            Expression::Literal(other) => write_string_literal(f, &other.to_text()),
            Expression::PropertyRef(name) => {
                f.write_str("prop(")?;
                write_string_literal(f, name)?;
                f.write_str(")")
            }
            Expression::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expression::BinaryOp { op, left, right } => {
                write_operand(f, left, *op, false)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, *op, true)
            }
            Expression::UnaryOp { op, operand } => {
                f.write_str(op.symbol())?;
                if matches!(**operand, Expression::BinaryOp { .. })
                    || (matches!(**operand, Expression::Literal(Value::Number(n)) if n < 0.0))
                {
                    write!(f, "({})", operand)
                } else {
                    write!(f, "{}", operand)
                }
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "if({}, {}, {})", condition, then_branch, else_branch),
        }
    }
}
