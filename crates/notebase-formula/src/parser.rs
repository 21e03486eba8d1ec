//! Formula parser
//!
//! A recursive descent parser for formula text with operator precedence.
//! Parsing is total: any input yields either an [`Expression`] or a
//! [`FormulaError::Syntax`]/[`FormulaError::Arity`], never a panic.

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use notebase_core::Value;

/// Maximum depth of the expression tree (nesting plus chained operators)
pub const MAX_DEPTH: usize = 128;

/// Parse formula text into an AST
///
/// # Example
/// ```rust
/// use notebase_formula::parse_formula;
///
/// let ast = parse_formula("prop(\"Price\") * prop(\"Quantity\")").unwrap();
/// let ast = parse_formula("if(prop(\"Status\") = \"Done\", \"Complete\", \"Pending\")").unwrap();
/// assert!(parse_formula("1 +").is_err());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Expression> {
    let mut parser = FormulaParser::new(formula)?;
    if parser.current_token() == &Token::Eof {
        return Err(FormulaError::syntax("Empty formula", 0));
    }
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if parser.current_token() != &Token::Eof {
        return Err(FormulaError::syntax(
            format!(
                "Unexpected {} after expression",
                parser.current_token().describe()
            ),
            parser.token_start,
        ));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),

    // Function names and keywords
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Caret,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    AndAnd,
    OrOr,
    Bang,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    // End of input
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::String(s) => format!("string \"{}\"", s),
            Token::Identifier(name) => format!("'{}'", name),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::StarStar => "'**'".into(),
            Token::Slash => "'/'".into(),
            Token::Percent => "'%'".into(),
            Token::Caret => "'^'".into(),
            Token::Equal => "'='".into(),
            Token::NotEqual => "'!='".into(),
            Token::LessThan => "'<'".into(),
            Token::LessEqual => "'<='".into(),
            Token::GreaterThan => "'>'".into(),
            Token::GreaterEqual => "'>='".into(),
            Token::AndAnd => "'&&'".into(),
            Token::OrOr => "'||'".into(),
            Token::Bang => "'!'".into(),
            Token::Comma => "','".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::Eof => "end of formula".into(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Identifier(name) if name.eq_ignore_ascii_case(keyword))
    }
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
    /// Byte offset where `current_token` starts
    token_start: usize,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
            token_start: 0,
            depth: 0,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '^' => Some(Token::Caret),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // One- or two-character operators
        match c {
            '*' => {
                self.advance();
                return Ok(if self.eat_char('*') {
                    Token::StarStar
                } else {
                    Token::Star
                });
            }
            '=' => {
                self.advance();
                self.eat_char('=');
                return Ok(Token::Equal);
            }
            '!' => {
                self.advance();
                return Ok(if self.eat_char('=') {
                    Token::NotEqual
                } else {
                    Token::Bang
                });
            }
            '<' => {
                self.advance();
                if self.eat_char('=') {
                    return Ok(Token::LessEqual);
                }
                if self.eat_char('>') {
                    return Ok(Token::NotEqual);
                }
                return Ok(Token::LessThan);
            }
            '>' => {
                self.advance();
                return Ok(if self.eat_char('=') {
                    Token::GreaterEqual
                } else {
                    Token::GreaterThan
                });
            }
            '&' => {
                self.advance();
                if self.eat_char('&') {
                    return Ok(Token::AndAnd);
                }
                return Err(FormulaError::syntax("Expected '&&'", self.token_start));
            }
            '|' => {
                self.advance();
                if self.eat_char('|') {
                    return Ok(Token::OrOr);
                }
                return Err(FormulaError::syntax("Expected '||'", self.token_start));
            }
            _ => {}
        }

        // String literal
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier or keyword
        if c.is_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        Err(FormulaError::syntax(
            format!("Unexpected character '{}'", c),
            self.pos,
        ))
    }

    fn scan_string(&mut self, quote: char) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::syntax("Unterminated string literal", start));
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::String(s));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => {
                            return Err(FormulaError::syntax(
                                "Unterminated string literal",
                                start,
                            ));
                        }
                    };
                    s.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let signed = matches!(self.peek_char_at(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::syntax(format!("Invalid number '{}'", num_str), start))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected.describe())))
        }
    }

    fn unexpected(&self, wanted: &str) -> FormulaError {
        FormulaError::syntax(
            format!("Unexpected {}, {}", self.current_token().describe(), wanted),
            self.token_start,
        )
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Logical or: ||, or
    // 2. Logical and: &&, and
    // 3. Equality: =, ==, !=, <>
    // 4. Relational: <, <=, >, >=
    // 5. Addition/Subtraction: +, -
    // 6. Multiplication/Division/Modulo: *, /, %
    // 7. Exponentiation: ^, ** (right associative)
    // 8. Prefix: -, +, !, not
    // 9. Primary: literals, prop(), if(), function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_and()?;
        let depth = self.depth;

        while matches!(self.current_token(), Token::OrOr) || self.current_token().is_keyword("or")
        {
            self.consume()?;
            self.enter()?;
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_equality()?;
        let depth = self.depth;

        while matches!(self.current_token(), Token::AndAnd)
            || self.current_token().is_keyword("and")
        {
            self.consume()?;
            self.enter()?;
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::And, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_equality(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_relational()?;
        let depth = self.depth;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_relational(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_additive()?;
        let depth = self.depth;

        loop {
            let op = match self.current_token() {
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        let depth = self.depth;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expression> {
        let mut left = self.parse_exponent()?;
        let depth = self.depth;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            let right = self.parse_exponent()?;
            left = binary(op, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<Expression> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret | Token::StarStar) {
            self.consume()?;
            self.enter()?;
            let right = self.parse_exponent(); // Right associative
            self.depth -= 1;
            return Ok(binary(BinaryOperator::Power, left, right?));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expression> {
        let op = match self.current_token() {
            Token::Minus => Some(UnaryOperator::Negate),
            Token::Plus => Some(UnaryOperator::Plus),
            Token::Bang => Some(UnaryOperator::Not),
            // `not(x)` is the library function, `not x` the operator
            token if token.is_keyword("not") && !self.next_is_left_paren() => {
                Some(UnaryOperator::Not)
            }
            _ => None,
        };

        match op {
            Some(op) => {
                self.consume()?;
                self.enter()?;
                let operand = self.parse_unary();
                self.depth -= 1;
                Ok(Expression::UnaryOp {
                    op,
                    operand: Box::new(operand?),
                })
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<Expression> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume()?;
                Ok(Expression::Literal(Value::Number(n)))
            }

            Token::String(s) => {
                self.consume()?;
                Ok(Expression::Literal(Value::Text(s)))
            }

            Token::LeftParen => {
                self.consume()?;
                self.enter()?;
                let expr = self.parse_expression();
                self.depth -= 1;
                let expr = expr?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                let start = self.token_start;
                self.consume()?;
                // Check if it's a function call
                if matches!(self.current_token(), Token::LeftParen) {
                    return self.parse_call(name, start);
                }
                match name.to_ascii_lowercase().as_str() {
                    "true" => Ok(Expression::Literal(Value::Boolean(true))),
                    "false" => Ok(Expression::Literal(Value::Boolean(false))),
                    "null" => Ok(Expression::Literal(Value::Null)),
                    _ => Err(FormulaError::syntax(
                        format!("Unknown identifier '{}'", name),
                        start,
                    )),
                }
            }

            _ => Err(self.unexpected("expected a value")),
        }
    }

    fn parse_call(&mut self, name: String, start: usize) -> FormulaResult<Expression> {
        self.enter()?;
        let args = self.parse_arguments();
        self.depth -= 1;
        let args = args?;

        if name.eq_ignore_ascii_case("prop") {
            return match args.as_slice() {
                [Expression::Literal(Value::Text(prop_name))] => {
                    Ok(Expression::PropertyRef(prop_name.clone()))
                }
                _ => Err(FormulaError::syntax(
                    "prop() requires a single quoted property name",
                    start,
                )),
            };
        }

        if name.eq_ignore_ascii_case("if") {
            let count = args.len();
            let mut args = args.into_iter();
            return match (args.next(), args.next(), args.next(), args.next()) {
                (Some(condition), Some(then_branch), Some(else_branch), None) => {
                    Ok(Expression::Conditional {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                    })
                }
                _ => Err(FormulaError::Arity {
                    function: "if".into(),
                    expected: "3".into(),
                    actual: count,
                }),
            };
        }

        Ok(Expression::Call { name, args })
    }

    fn parse_arguments(&mut self) -> FormulaResult<Vec<Expression>> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume()?;
                args.push(self.parse_expression()?);
            }
        }

        if !matches!(self.current_token(), Token::RightParen) {
            return Err(self.unexpected("expected ',' or ')'"));
        }
        self.consume()?;

        Ok(args)
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.depth -= 1;
            return Err(FormulaError::syntax(
                "Formula is nested too deeply",
                self.token_start,
            ));
        }
        Ok(())
    }

    fn next_is_left_paren(&self) -> bool {
        self.input[self.pos..].trim_start().starts_with('(')
    }
}

fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prop(name: &str) -> Expression {
        Expression::PropertyRef(name.into())
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("42").unwrap(), Expression::number(42.0));
        assert_eq!(parse_formula("3.14").unwrap(), Expression::number(3.14));
        assert_eq!(parse_formula("1e10").unwrap(), Expression::number(1e10));
        assert_eq!(parse_formula(".5").unwrap(), Expression::number(0.5));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_formula("\"Hello\"").unwrap(), Expression::text("Hello"));
        assert_eq!(parse_formula("'single'").unwrap(), Expression::text("single"));
        assert_eq!(
            parse_formula(r#""say \"hi\"""#).unwrap(),
            Expression::text("say \"hi\"")
        );
        assert_eq!(parse_formula(r#""a\nb""#).unwrap(), Expression::text("a\nb"));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_formula("true").unwrap(),
            Expression::Literal(Value::Boolean(true))
        );
        assert_eq!(
            parse_formula("FALSE").unwrap(),
            Expression::Literal(Value::Boolean(false))
        );
        assert_eq!(parse_formula("null").unwrap(), Expression::Literal(Value::Null));
    }

    #[test]
    fn test_parse_prop() {
        assert_eq!(parse_formula("prop(\"Price\")").unwrap(), prop("Price"));
        assert_eq!(parse_formula("prop('Due date')").unwrap(), prop("Due date"));
        assert!(parse_formula("prop(Price)").is_err());
        assert!(parse_formula("prop(\"A\", \"B\")").is_err());
        assert!(parse_formula("prop(1)").is_err());
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        // 1 + (2 * 3)
        let ast = parse_formula("1+2*3").unwrap();
        if let Expression::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Add);
            assert_eq!(*left, Expression::number(1.0));
            assert!(matches!(
                *right,
                Expression::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let ast = parse_formula("2 ^ 3 ** 2").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Power,
                Expression::number(2.0),
                binary(
                    BinaryOperator::Power,
                    Expression::number(3.0),
                    Expression::number(2.0)
                )
            )
        );
    }

    #[test]
    fn test_parse_comparison_and_logic() {
        let ast = parse_formula("prop(\"A\") > 1 and prop(\"B\") <> \"x\" || not prop(\"C\")")
            .unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Or,
                binary(
                    BinaryOperator::And,
                    binary(
                        BinaryOperator::GreaterThan,
                        prop("A"),
                        Expression::number(1.0)
                    ),
                    binary(BinaryOperator::NotEqual, prop("B"), Expression::text("x")),
                ),
                Expression::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(prop("C")),
                }
            )
        );
    }

    #[test]
    fn test_single_and_double_equals() {
        assert_eq!(parse_formula("1 = 1").unwrap(), parse_formula("1 == 1").unwrap());
        assert_eq!(parse_formula("1 != 2").unwrap(), parse_formula("1 <> 2").unwrap());
    }

    #[test]
    fn test_parse_conditional() {
        let ast = parse_formula("if(prop(\"Status\") = \"Done\", \"Complete\", \"Pending\")")
            .unwrap();
        assert_eq!(
            ast,
            Expression::Conditional {
                condition: Box::new(binary(
                    BinaryOperator::Equal,
                    prop("Status"),
                    Expression::text("Done")
                )),
                then_branch: Box::new(Expression::text("Complete")),
                else_branch: Box::new(Expression::text("Pending")),
            }
        );
        assert!(matches!(
            parse_formula("if(true, 1)"),
            Err(FormulaError::Arity { actual: 2, .. })
        ));
    }

    #[test]
    fn test_parse_function_call() {
        let ast = parse_formula("ROUND(prop(\"X\"), 2)").unwrap();
        assert_eq!(
            ast,
            Expression::Call {
                name: "ROUND".into(),
                args: vec![prop("X"), Expression::number(2.0)],
            }
        );
        assert_eq!(
            parse_formula("pi()").unwrap(),
            Expression::Call {
                name: "pi".into(),
                args: vec![],
            }
        );
        // not(...) stays a library call
        assert!(matches!(
            parse_formula("not(true)").unwrap(),
            Expression::Call { .. }
        ));
    }

    #[test]
    fn test_unary_binds_tighter_than_power() {
        let ast = parse_formula("-2 ^ 2").unwrap();
        assert!(matches!(
            ast,
            Expression::BinaryOp {
                op: BinaryOperator::Power,
                ..
            }
        ));
    }

    #[test]
    fn test_syntax_errors() {
        for text in [
            "",
            "   ",
            "1 +",
            "(1 + 2",
            "1 2",
            "\"unterminated",
            "foo",
            "prop(\"A\"",
            "1 & 2",
            "#",
            "max(1,)",
        ] {
            let err = parse_formula(text).unwrap_err();
            assert!(
                matches!(err, FormulaError::Syntax { .. }),
                "{:?} gave {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_error_position() {
        match parse_formula("1 + * 2") {
            Err(FormulaError::Syntax { position, .. }) => assert_eq!(position, Some(4)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse_formula(&deep),
            Err(FormulaError::Syntax { .. })
        ));

        let ok = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_formula(&ok).unwrap(), Expression::number(1.0));

        let negations = format!("{}1", "-".repeat(10_000));
        assert!(parse_formula(&negations).is_err());

        let chain = vec!["1"; 10_000].join(" + ");
        assert!(parse_formula(&chain).is_err());
        let short_chain = vec!["1"; 50].join(" + ");
        assert!(parse_formula(&short_chain).is_ok());
    }

    #[test]
    fn test_display_reparses() {
        for text in [
            "prop(\"Price\") * prop(\"Quantity\")",
            "if(prop(\"Status\") == \"Done\", \"Complete\", \"Pending\")",
            "(1 + 2) * 3 - 4 / 5 % 6",
            "2 ^ 3 ^ 2",
            "(2 ^ 3) ^ 2",
            "not (true and false) or 1 < 2",
            "-(1 + 2)",
            "concat(\"a\\\"b\", lower(\"X\"))",
        ] {
            let ast = parse_formula(text).unwrap();
            let printed = ast.to_string();
            assert_eq!(parse_formula(&printed).unwrap(), ast, "via {}", printed);
        }
    }
}
