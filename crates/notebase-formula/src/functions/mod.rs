//! Built-in formula functions

pub mod date;
pub mod logical;
pub mod math;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use notebase_core::{Value, ValueTag};
use std::fmt;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Arguments have already been checked against the definition's arity and
/// tag sets when the implementation runs.
pub type FunctionImpl = fn(&[Value], &CallContext) -> FormulaResult<Value>;

/// Per-call environment available to implementations
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    /// Instant returned by `now()`
    pub now: DateTime<Utc>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self { now: Utc::now() }
    }
}

/// A set of accepted value tags
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagSet(u8);

impl TagSet {
    pub const TEXT: TagSet = TagSet(1);
    pub const NUMBER: TagSet = TagSet(1 << 1);
    pub const BOOLEAN: TagSet = TagSet(1 << 2);
    pub const DATE: TagSet = TagSet(1 << 3);
    pub const LIST: TagSet = TagSet(1 << 4);
    pub const NULL: TagSet = TagSet(1 << 5);
    pub const ANY: TagSet = TagSet(0b11_1111);

    /// Tags that have a total order
    pub const ORDERED: TagSet = Self::TEXT
        .union(Self::NUMBER)
        .union(Self::BOOLEAN)
        .union(Self::DATE)
        .union(Self::NULL);

    /// Anything a date argument can be read from
    pub const DATE_LIKE: TagSet = Self::DATE.union(Self::TEXT).union(Self::NUMBER);

    pub const fn union(self, other: TagSet) -> TagSet {
        TagSet(self.0 | other.0)
    }

    pub fn of(tag: ValueTag) -> TagSet {
        match tag {
            ValueTag::Text => Self::TEXT,
            ValueTag::Number => Self::NUMBER,
            ValueTag::Boolean => Self::BOOLEAN,
            ValueTag::Date => Self::DATE,
            ValueTag::List => Self::LIST,
            ValueTag::Null => Self::NULL,
        }
    }

    pub fn contains(&self, tag: ValueTag) -> bool {
        self.0 & Self::of(tag).0 != 0
    }

    pub fn tags(&self) -> impl Iterator<Item = ValueTag> {
        let set = *self;
        ValueTag::ALL.into_iter().filter(move |t| set.contains(*t))
    }
}

impl std::ops::BitOr for TagSet {
    type Output = TagSet;

    fn bitor(self, rhs: TagSet) -> TagSet {
        self.union(rhs)
    }
}

/// Renders as `number`, `number or text`, `any value`
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            return f.write_str("any value");
        }
        let names: Vec<&str> = self
            .tags()
            .filter(|t| *t != ValueTag::Null)
            .map(|t| t.as_str())
            .collect();
        match names.as_slice() {
            [] => f.write_str("null"),
            [one] => f.write_str(one),
            [init @ .., last] => write!(f, "{} or {}", init.join(", "), last),
        }
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagSet({})", self)
    }
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Range(usize, usize),
    Variadic { min: usize },
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Fixed(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Variadic { min } => count >= min,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            Arity::Fixed(n) => n.to_string(),
            Arity::Range(min, max) => format!("{} to {}", min, max),
            Arity::Variadic { min } => format!("at least {}", min),
        }
    }
}

/// Function group, for editor UIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionCategory {
    Logic,
    Math,
    Text,
    Date,
}

impl FunctionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionCategory::Logic => "Logic & Comparison",
            FunctionCategory::Math => "Math",
            FunctionCategory::Text => "Text",
            FunctionCategory::Date => "Date",
        }
    }
}

/// Function definition
pub struct FunctionDef {
    /// Canonical name
    pub name: &'static str,
    pub category: FunctionCategory,
    pub arity: Arity,
    /// Accepted tags per position; the last entry covers any further arguments
    pub arg_tags: &'static [TagSet],
    /// Tags the implementation can return
    pub return_tags: TagSet,
    /// Return `Null` without calling the implementation when an argument is `Null`
    pub propagates_null: bool,
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Accepted tags at a zero-based position
    pub fn tags_at(&self, index: usize) -> TagSet {
        self.arg_tags
            .get(index)
            .or_else(|| self.arg_tags.last())
            .copied()
            .unwrap_or(TagSet::ANY)
    }

    /// Check the argument count
    pub fn check_arity(&self, count: usize) -> FormulaResult<()> {
        if self.arity.accepts(count) {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                function: self.name.to_string(),
                expected: self.arity.describe(),
                actual: count,
            })
        }
    }

    /// Type-check and invoke
    pub fn call(&self, args: &[Value], ctx: &CallContext) -> FormulaResult<Value> {
        self.check_arity(args.len())?;

        for (i, arg) in args.iter().enumerate() {
            if arg.is_null() && self.propagates_null {
                return Ok(Value::Null);
            }
            let accepted = self.tags_at(i);
            if !accepted.contains(arg.tag()) {
                return Err(FormulaError::type_mismatch(
                    format!("{}() argument {}", self.name, i + 1),
                    accepted.to_string(),
                    arg.tag(),
                ));
            }
        }

        match (self.implementation)(args, ctx)? {
            Value::Number(n) if !n.is_finite() => Err(FormulaError::numeric(format!(
                "{}() result is not a finite number",
                self.name
            ))),
            value => Ok(value),
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_logical_functions();
        registry.register_math_functions();
        registry.register_text_functions();
        registry.register_date_functions();

        registry
    }

    /// Look up a function by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_lowercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_lowercase(), def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Function names grouped by category, each group sorted
    pub fn groups(&self) -> Vec<(FunctionCategory, Vec<&'static str>)> {
        let mut groups: Vec<(FunctionCategory, Vec<&'static str>)> = Vec::new();
        for def in self.functions.values() {
            match groups.iter_mut().find(|(cat, _)| *cat == def.category) {
                Some((_, names)) => names.push(def.name),
                None => groups.push((def.category, vec![def.name])),
            }
        }
        groups.sort_by_key(|(cat, _)| *cat);
        for (_, names) in &mut groups {
            names.sort_unstable();
        }
        groups
    }

    fn register_logical_functions(&mut self) {
        use FunctionCategory::Logic;
        const BOOL: &[TagSet] = &[TagSet::BOOLEAN];
        const OPTIONAL_BOOL: &[TagSet] = &[TagSet::BOOLEAN.union(TagSet::NULL)];
        const ANY: &[TagSet] = &[TagSet::ANY];
        const TWO_ANY: &[TagSet] = &[TagSet::ANY, TagSet::ANY];
        const TWO_ORDERED: &[TagSet] = &[TagSet::ORDERED, TagSet::ORDERED];

        // AND (null is unknown, as with the operator)
        self.register(FunctionDef {
            name: "and",
            category: Logic,
            arity: Arity::Variadic { min: 1 },
            arg_tags: OPTIONAL_BOOL,
            return_tags: TagSet::BOOLEAN.union(TagSet::NULL),
            propagates_null: false,
            implementation: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "or",
            category: Logic,
            arity: Arity::Variadic { min: 1 },
            arg_tags: OPTIONAL_BOOL,
            return_tags: TagSet::BOOLEAN.union(TagSet::NULL),
            propagates_null: false,
            implementation: logical::fn_or,
        });

        // NOT
        self.register(FunctionDef {
            name: "not",
            category: Logic,
            arity: Arity::Fixed(1),
            arg_tags: BOOL,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: logical::fn_not,
        });

        // EQUAL
        self.register(FunctionDef {
            name: "equal",
            category: Logic,
            arity: Arity::Fixed(2),
            arg_tags: TWO_ANY,
            return_tags: TagSet::BOOLEAN,
            propagates_null: false,
            implementation: logical::fn_equal,
        });

        // UNEQUAL
        self.register(FunctionDef {
            name: "unequal",
            category: Logic,
            arity: Arity::Fixed(2),
            arg_tags: TWO_ANY,
            return_tags: TagSet::BOOLEAN,
            propagates_null: false,
            implementation: logical::fn_unequal,
        });

        // LARGER
        self.register(FunctionDef {
            name: "larger",
            category: Logic,
            arity: Arity::Fixed(2),
            arg_tags: TWO_ORDERED,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: logical::fn_larger,
        });

        // LARGEREQ
        self.register(FunctionDef {
            name: "largerEq",
            category: Logic,
            arity: Arity::Fixed(2),
            arg_tags: TWO_ORDERED,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: logical::fn_larger_eq,
        });

        // SMALLER
        self.register(FunctionDef {
            name: "smaller",
            category: Logic,
            arity: Arity::Fixed(2),
            arg_tags: TWO_ORDERED,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: logical::fn_smaller,
        });

        // SMALLEREQ
        self.register(FunctionDef {
            name: "smallerEq",
            category: Logic,
            arity: Arity::Fixed(2),
            arg_tags: TWO_ORDERED,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: logical::fn_smaller_eq,
        });

        // EMPTY
        self.register(FunctionDef {
            name: "empty",
            category: Logic,
            arity: Arity::Fixed(1),
            arg_tags: ANY,
            return_tags: TagSet::BOOLEAN,
            propagates_null: false,
            implementation: logical::fn_empty,
        });

        // COALESCE
        self.register(FunctionDef {
            name: "coalesce",
            category: Logic,
            arity: Arity::Variadic { min: 1 },
            arg_tags: ANY,
            return_tags: TagSet::ANY,
            propagates_null: false,
            implementation: logical::fn_coalesce,
        });
    }

    fn register_math_functions(&mut self) {
        use FunctionCategory::Math;
        const NUM: &[TagSet] = &[TagSet::NUMBER];
        const NUM_NUM: &[TagSet] = &[TagSet::NUMBER, TagSet::NUMBER];
        const ANY: &[TagSet] = &[TagSet::ANY];
        const AGGREGATE: &[TagSet] = &[TagSet::NUMBER.union(TagSet::LIST).union(TagSet::NULL)];
        const NUMBER: TagSet = TagSet::NUMBER;
        const OPTIONAL_NUMBER: TagSet = TagSet::NUMBER.union(TagSet::NULL);

        // Single-number functions
        let unary: [(&'static str, FunctionImpl); 14] = [
            ("abs", math::fn_abs),
            ("floor", math::fn_floor),
            ("ceil", math::fn_ceil),
            ("cbrt", math::fn_cbrt),
            ("exp", math::fn_exp),
            ("ln", math::fn_ln),
            ("log10", math::fn_log10),
            ("sqrt", math::fn_sqrt),
            ("sign", math::fn_sign),
            ("sin", math::fn_sin),
            ("cos", math::fn_cos),
            ("tan", math::fn_tan),
            ("asin", math::fn_asin),
            ("acos", math::fn_acos),
        ];
        for (name, implementation) in unary {
            self.register(FunctionDef {
                name,
                category: Math,
                arity: Arity::Fixed(1),
                arg_tags: NUM,
                return_tags: NUMBER,
                propagates_null: true,
                implementation,
            });
        }

        // ATAN
        self.register(FunctionDef {
            name: "atan",
            category: Math,
            arity: Arity::Fixed(1),
            arg_tags: NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_atan,
        });

        // ROUND
        self.register(FunctionDef {
            name: "round",
            category: Math,
            arity: Arity::Range(1, 2),
            arg_tags: NUM_NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_round,
        });

        // ROUNDUP
        self.register(FunctionDef {
            name: "roundup",
            category: Math,
            arity: Arity::Range(1, 2),
            arg_tags: NUM_NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_roundup,
        });

        // ROUNDDOWN
        self.register(FunctionDef {
            name: "rounddown",
            category: Math,
            arity: Arity::Range(1, 2),
            arg_tags: NUM_NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_rounddown,
        });

        // LOG
        self.register(FunctionDef {
            name: "log",
            category: Math,
            arity: Arity::Range(1, 2),
            arg_tags: NUM_NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_log,
        });

        // POW
        self.register(FunctionDef {
            name: "pow",
            category: Math,
            arity: Arity::Fixed(2),
            arg_tags: NUM_NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_pow,
        });

        // MOD (floored)
        self.register(FunctionDef {
            name: "mod",
            category: Math,
            arity: Arity::Fixed(2),
            arg_tags: NUM_NUM,
            return_tags: NUMBER,
            propagates_null: true,
            implementation: math::fn_mod,
        });

        // MAX
        self.register(FunctionDef {
            name: "max",
            category: Math,
            arity: Arity::Variadic { min: 1 },
            arg_tags: AGGREGATE,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: false,
            implementation: math::fn_max,
        });

        // MIN
        self.register(FunctionDef {
            name: "min",
            category: Math,
            arity: Arity::Variadic { min: 1 },
            arg_tags: AGGREGATE,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: false,
            implementation: math::fn_min,
        });

        // SUM
        self.register(FunctionDef {
            name: "sum",
            category: Math,
            arity: Arity::Variadic { min: 1 },
            arg_tags: AGGREGATE,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: false,
            implementation: math::fn_sum,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "average",
            category: Math,
            arity: Arity::Variadic { min: 1 },
            arg_tags: AGGREGATE,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: false,
            implementation: math::fn_average,
        });

        // PI
        self.register(FunctionDef {
            name: "pi",
            category: Math,
            arity: Arity::Fixed(0),
            arg_tags: &[],
            return_tags: NUMBER,
            propagates_null: false,
            implementation: math::fn_pi,
        });

        // E
        self.register(FunctionDef {
            name: "e",
            category: Math,
            arity: Arity::Fixed(0),
            arg_tags: &[],
            return_tags: NUMBER,
            propagates_null: false,
            implementation: math::fn_e,
        });

        // TONUMBER
        self.register(FunctionDef {
            name: "toNumber",
            category: Math,
            arity: Arity::Fixed(1),
            arg_tags: ANY,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: false,
            implementation: math::fn_to_number,
        });
    }

    fn register_text_functions(&mut self) {
        use FunctionCategory::Text;
        const ANY: &[TagSet] = &[TagSet::ANY];
        const TEXT: &[TagSet] = &[TagSet::TEXT];
        const TEXT_TEXT: &[TagSet] = &[TagSet::TEXT, TagSet::TEXT];
        const TEXT3: &[TagSet] = &[TagSet::TEXT, TagSet::TEXT, TagSet::TEXT];
        const OPTIONAL_TEXT: TagSet = TagSet::TEXT.union(TagSet::NULL);
        const FORMAT_TAGS: &[TagSet] = &[TagSet::ANY, OPTIONAL_TEXT];
        const CONTAINS_TAGS: &[TagSet] =
            &[TagSet::TEXT.union(TagSet::LIST).union(TagSet::NULL), TagSet::ANY];
        const SLICE_TAGS: &[TagSet] = &[TagSet::TEXT, TagSet::NUMBER, TagSet::NUMBER];
        const JOIN_TAGS: &[TagSet] =
            &[TagSet::LIST.union(TagSet::TEXT).union(TagSet::NULL), OPTIONAL_TEXT];

        // CONCAT
        self.register(FunctionDef {
            name: "concat",
            category: Text,
            arity: Arity::Variadic { min: 0 },
            arg_tags: ANY,
            return_tags: TagSet::TEXT,
            propagates_null: false,
            implementation: text::fn_concat,
        });

        // FORMAT
        self.register(FunctionDef {
            name: "format",
            category: Text,
            arity: Arity::Range(1, 2),
            arg_tags: FORMAT_TAGS,
            return_tags: TagSet::TEXT,
            propagates_null: false,
            implementation: text::fn_format,
        });

        // TOSTRING
        self.register(FunctionDef {
            name: "toString",
            category: Text,
            arity: Arity::Fixed(1),
            arg_tags: ANY,
            return_tags: TagSet::TEXT,
            propagates_null: false,
            implementation: text::fn_to_string,
        });

        // LENGTH
        self.register(FunctionDef {
            name: "length",
            category: Text,
            arity: Arity::Fixed(1),
            arg_tags: ANY,
            return_tags: TagSet::NUMBER,
            propagates_null: false,
            implementation: text::fn_length,
        });

        // CONTAINS (text or list haystack)
        self.register(FunctionDef {
            name: "contains",
            category: Text,
            arity: Arity::Fixed(2),
            arg_tags: CONTAINS_TAGS,
            return_tags: TagSet::BOOLEAN,
            propagates_null: false,
            implementation: text::fn_contains,
        });

        // LOWER
        self.register(FunctionDef {
            name: "lower",
            category: Text,
            arity: Arity::Fixed(1),
            arg_tags: TEXT,
            return_tags: TagSet::TEXT,
            propagates_null: true,
            implementation: text::fn_lower,
        });

        // UPPER
        self.register(FunctionDef {
            name: "upper",
            category: Text,
            arity: Arity::Fixed(1),
            arg_tags: TEXT,
            return_tags: TagSet::TEXT,
            propagates_null: true,
            implementation: text::fn_upper,
        });

        // TRIM
        self.register(FunctionDef {
            name: "trim",
            category: Text,
            arity: Arity::Fixed(1),
            arg_tags: TEXT,
            return_tags: TagSet::TEXT,
            propagates_null: true,
            implementation: text::fn_trim,
        });

        // REPLACE
        self.register(FunctionDef {
            name: "replace",
            category: Text,
            arity: Arity::Fixed(3),
            arg_tags: TEXT3,
            return_tags: TagSet::TEXT,
            propagates_null: true,
            implementation: text::fn_replace,
        });

        // REPLACEALL
        self.register(FunctionDef {
            name: "replaceAll",
            category: Text,
            arity: Arity::Fixed(3),
            arg_tags: TEXT3,
            return_tags: TagSet::TEXT,
            propagates_null: true,
            implementation: text::fn_replace_all,
        });

        // SLICE
        self.register(FunctionDef {
            name: "slice",
            category: Text,
            arity: Arity::Range(2, 3),
            arg_tags: SLICE_TAGS,
            return_tags: TagSet::TEXT,
            propagates_null: true,
            implementation: text::fn_slice,
        });

        // STARTSWITH
        self.register(FunctionDef {
            name: "startsWith",
            category: Text,
            arity: Arity::Fixed(2),
            arg_tags: TEXT_TEXT,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: text::fn_starts_with,
        });

        // ENDSWITH
        self.register(FunctionDef {
            name: "endsWith",
            category: Text,
            arity: Arity::Fixed(2),
            arg_tags: TEXT_TEXT,
            return_tags: TagSet::BOOLEAN,
            propagates_null: true,
            implementation: text::fn_ends_with,
        });

        // JOIN
        self.register(FunctionDef {
            name: "join",
            category: Text,
            arity: Arity::Range(1, 2),
            arg_tags: JOIN_TAGS,
            return_tags: TagSet::TEXT,
            propagates_null: false,
            implementation: text::fn_join,
        });
    }

    fn register_date_functions(&mut self) {
        use FunctionCategory::Date;
        const OPTIONAL_UNIT: TagSet = TagSet::TEXT.union(TagSet::NULL);
        const NUM: &[TagSet] = &[TagSet::NUMBER];
        const DATE_ARG: &[TagSet] = &[TagSet::DATE_LIKE];
        const BETWEEN: &[TagSet] = &[TagSet::DATE_LIKE, TagSet::DATE_LIKE, OPTIONAL_UNIT];
        const SHIFT: &[TagSet] = &[TagSet::DATE_LIKE, TagSet::NUMBER, OPTIONAL_UNIT];
        const OPTIONAL_DATE: TagSet = TagSet::DATE.union(TagSet::NULL);
        const OPTIONAL_NUMBER: TagSet = TagSet::NUMBER.union(TagSet::NULL);

        // NOW (fixed per recompute)
        self.register(FunctionDef {
            name: "now",
            category: Date,
            arity: Arity::Fixed(0),
            arg_tags: &[],
            return_tags: TagSet::DATE,
            propagates_null: false,
            implementation: date::fn_now,
        });

        // DATEBETWEEN
        self.register(FunctionDef {
            name: "dateBetween",
            category: Date,
            arity: Arity::Range(2, 3),
            arg_tags: BETWEEN,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: true,
            implementation: date::fn_date_between,
        });

        // DATEADD
        self.register(FunctionDef {
            name: "dateAdd",
            category: Date,
            arity: Arity::Range(2, 3),
            arg_tags: SHIFT,
            return_tags: OPTIONAL_DATE,
            propagates_null: true,
            implementation: date::fn_date_add,
        });

        // DATESUBTRACT
        self.register(FunctionDef {
            name: "dateSubtract",
            category: Date,
            arity: Arity::Range(2, 3),
            arg_tags: SHIFT,
            return_tags: OPTIONAL_DATE,
            propagates_null: true,
            implementation: date::fn_date_subtract,
        });

        // TIMESTAMP
        self.register(FunctionDef {
            name: "timestamp",
            category: Date,
            arity: Arity::Range(0, 1),
            arg_tags: DATE_ARG,
            return_tags: OPTIONAL_NUMBER,
            propagates_null: true,
            implementation: date::fn_timestamp,
        });

        // FROMTIMESTAMP
        self.register(FunctionDef {
            name: "fromTimestamp",
            category: Date,
            arity: Arity::Fixed(1),
            arg_tags: NUM,
            return_tags: OPTIONAL_DATE,
            propagates_null: true,
            implementation: date::fn_from_timestamp,
        });
    }
}

/// The shared built-in registry
pub fn registry() -> &'static FunctionRegistry {
    static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FunctionRegistry::new)
}

// === Argument accessors ===
// Tags are checked before implementations run, so a mismatch here means the
// definition's tag set and the implementation disagree.

pub(crate) fn number_arg(args: &[Value], index: usize, function: &str) -> FormulaResult<f64> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        other => Err(arg_mismatch(function, index, "number", other)),
    }
}

pub(crate) fn opt_number_arg(
    args: &[Value],
    index: usize,
    function: &str,
) -> FormulaResult<Option<f64>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(*n)),
        other => Err(arg_mismatch(function, index, "number", other)),
    }
}

pub(crate) fn text_arg<'a>(
    args: &'a [Value],
    index: usize,
    function: &str,
) -> FormulaResult<&'a str> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s),
        other => Err(arg_mismatch(function, index, "text", other)),
    }
}

pub(crate) fn opt_text_arg<'a>(
    args: &'a [Value],
    index: usize,
    function: &str,
) -> FormulaResult<Option<&'a str>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(s)) => Ok(Some(s)),
        other => Err(arg_mismatch(function, index, "text", other)),
    }
}

pub(crate) fn bool_arg(args: &[Value], index: usize, function: &str) -> FormulaResult<bool> {
    match args.get(index) {
        Some(Value::Boolean(b)) => Ok(*b),
        other => Err(arg_mismatch(function, index, "boolean", other)),
    }
}

fn arg_mismatch(
    function: &str,
    index: usize,
    expected: &str,
    actual: Option<&Value>,
) -> FormulaError {
    FormulaError::type_mismatch(
        format!("{}() argument {}", function, index + 1),
        expected,
        actual.map_or(ValueTag::Null, Value::tag),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let reg = registry();
        assert!(reg.get("ROUND").is_some());
        assert!(reg.get("largereq").is_some());
        assert_eq!(reg.get("LargerEq").map(|d| d.name), Some("largerEq"));
        assert!(reg.get("vlookup").is_none());
    }

    #[test]
    fn test_tagset_display() {
        assert_eq!(TagSet::NUMBER.to_string(), "number");
        assert_eq!((TagSet::NUMBER | TagSet::NULL).to_string(), "number");
        assert_eq!(TagSet::DATE_LIKE.to_string(), "text, number or date");
        assert_eq!(TagSet::ANY.to_string(), "any value");
    }

    #[test]
    fn test_call_checks_arity_and_tags() {
        let ctx = CallContext::default();
        let abs = registry().get("abs").unwrap();

        assert_eq!(abs.call(&[Value::Number(-2.0)], &ctx).unwrap(), Value::Number(2.0));
        assert!(matches!(
            abs.call(&[], &ctx),
            Err(FormulaError::Arity { actual: 0, .. })
        ));
        let err = abs.call(&[Value::text("x")], &ctx).unwrap_err();
        assert_eq!(err.to_string(), "abs() argument 1: expected number, got text");
    }

    #[test]
    fn test_null_propagation() {
        let ctx = CallContext::default();
        let upper = registry().get("upper").unwrap();
        assert_eq!(upper.call(&[Value::Null], &ctx).unwrap(), Value::Null);

        // concat renders null as empty text instead
        let concat = registry().get("concat").unwrap();
        assert_eq!(
            concat.call(&[Value::text("a"), Value::Null], &ctx).unwrap(),
            Value::text("a")
        );
    }

    #[test]
    fn test_non_finite_result_is_error() {
        let ctx = CallContext::default();
        let asin = registry().get("asin").unwrap();
        assert!(matches!(
            asin.call(&[Value::Number(2.0)], &ctx),
            Err(FormulaError::Numeric(_))
        ));
    }

    #[test]
    fn test_groups_cover_registry() {
        let reg = registry();
        let groups = reg.groups();
        let total: usize = groups.iter().map(|(_, names)| names.len()).sum();
        assert_eq!(total, reg.len());
        assert_eq!(groups[0].0, FunctionCategory::Logic);
        assert!(groups
            .iter()
            .any(|(cat, names)| *cat == FunctionCategory::Text && names.contains(&"concat")));
    }
}
