use super::ExpressionError;
use vigil_common::types::State;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Parsed trigger expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    State(State),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

const OPERATORS: [&str; 16] = [
    "||", "&&", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "!", "?", ":", "=",
];

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{text}'"))?;
            tokens.push(Token::Number(number));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| format!("unexpected character '{c}'"))?;
            if *op == "=" {
                return Err("use '==' for comparison".to_string());
            }
            tokens.push(Token::Op(*op));
            i += op.len();
        }
    }
    Ok(tokens)
}

/// Deepest nesting of parentheses, unary operators and conditionals accepted.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Recursive-descent parser, lowest precedence first:
/// ternary, `||`, `&&`, equality, comparison, additive, multiplicative, unary.
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

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    /// Runs `rule` one nesting level deeper.
    fn nested(&mut self, rule: fn(&mut Self) -> Result<Expr, ExpressionError>) -> Result<Expr, ExpressionError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(parse_error("expression is nested too deeply"));
        }
        self.depth += 1;
        let expr = rule(self);
        self.depth -= 1;
        expr
    }

    fn ternary(&mut self) -> Result<Expr, ExpressionError> {
        let cond = self.or()?;
        if self.eat_op(&["?"]).is_none() {
            return Ok(cond);
        }
        let then = self.nested(Self::ternary)?;
        if self.eat_op(&[":"]).is_none() {
            return Err(parse_error("expected ':' in conditional"));
        }
        let otherwise = self.nested(Self::ternary)?;
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn binary_level(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> Result<Expr, ExpressionError>,
    ) -> Result<Expr, ExpressionError> {
        let mut lhs = next(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = next(self)?;
            lhs = Expr::Binary(binary_op(op), Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&["||"], Self::and)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&["&&"], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&["==", "!="], Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&["<=", ">=", "<", ">"], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&["+", "-"], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&["*", "/"], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat_op(&["-"]).is_some() {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.nested(Self::unary)?)));
        }
        if self.eat_op(&["!"]).is_some() {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.nested(Self::unary)?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(ExpressionError::UnknownFunction(name));
                }
                Ok(match name.parse::<State>() {
                    Ok(state) if is_state_literal(&name) => Expr::State(state),
                    _ => Expr::Var(name),
                })
            }
            Some(Token::LParen) => {
                let inner = self.nested(Self::ternary)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(parse_error("expected ')'")),
                }
            }
            Some(Token::RParen) => Err(parse_error("unexpected ')'")),
            Some(Token::Op(op)) => Err(parse_error(&format!("unexpected operator '{op}'"))),
            None => Err(parse_error("unexpected end of expression")),
        }
    }
}

fn is_state_literal(name: &str) -> bool {
    matches!(name, "OK" | "WARN" | "WARNING" | "ERROR" | "CRIT" | "NODATA")
}

fn binary_op(op: &str) -> BinaryOp {
    match op {
        "||" => BinaryOp::Or,
        "&&" => BinaryOp::And,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        _ => BinaryOp::Div,
    }
}

fn parse_error(reason: &str) -> ExpressionError {
    ExpressionError::Invalid(reason.to_string())
}

/// Parses a trigger expression such as `t1 > 10 ? ERROR : OK`.
pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(source).map_err(ExpressionError::Invalid)?;
    if tokens.is_empty() {
        return Err(parse_error("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.ternary()?;
    if let Some(token) = parser.peek() {
        return Err(parse_error(&format!("unexpected trailing token {token:?}")));
    }
    Ok(expr)
}
