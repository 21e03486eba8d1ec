//! # notebase-formula
//!
//! Formula parser, dependency resolver and evaluator for notebase databases.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Formula evaluation (AST → value)
//! - Built-in functions (logic, math, text and date)
//! - Dependency ordering and cycle detection between formula properties
//! - A [`Runtime`] that compiles a schema once and recomputes rows
//!
//! ## Example
//!
//! ```rust
//! use notebase_formula::{evaluate, parse_formula, EvaluationContext};
//! use notebase_core::Value;
//!
//! let ast = parse_formula("if(2 > 1, \"yes\", \"no\")").unwrap();
//! let result = evaluate(&ast, &EvaluationContext::simple()).unwrap();
//! assert_eq!(result, Value::text("yes"));
//! ```

pub mod ast;
mod compiler;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod references;
pub mod runtime;

pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use dependency::{DependencyGraph, EvaluationOrder};
pub use error::{ErrorKind, FormulaError, FormulaResult};
pub use evaluator::{evaluate, EvaluationContext, PropertyResolver};
pub use functions::{registry, FunctionCategory, FunctionRegistry};
pub use parser::parse_formula;
pub use runtime::{preview_formula, EvaluationResult, RecomputeResult, Runtime, RuntimeOptions};
