//! Arithmetic evaluator for `nth-child` position expressions.
//!
//! Supports `n`, integer literals, `+`, `-`, `*`, parentheses, and the
//! implicit multiplication in forms like `2n`. Nothing else.

/// A parsed `nth-child` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct NthExpr {
    root: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(i64),
    Var,
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(i64),
    Var,
    Plus,
    Minus,
    Star,
    Open,
    Close,
}

impl NthExpr {
    /// Parse an expression, returning `None` when it is not in the
    /// supported grammar.
    pub fn parse(input: &str) -> Option<NthExpr> {
        let tokens = lex(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return None;
        }
        Some(NthExpr { root })
    }

    /// Evaluate the expression with `n` bound to the given value.
    pub fn eval(&self, n: i64) -> i64 {
        eval(&self.root, n)
    }

    /// Which of `len` sibling positions the expression selects.
    ///
    /// The expression is evaluated for every `n` in `0..len` and each
    /// produced value is read as a 1-based target position. Returned
    /// indices are 0-based, in document order.
    pub fn keep_indices(&self, len: usize) -> Vec<usize> {
        let len = len as i64;
        let mut targets = vec![false; len as usize];
        for n in 0..len {
            let position = self.eval(n);
            if position >= 1 && position <= len {
                targets[(position - 1) as usize] = true;
            }
        }
        targets
            .into_iter()
            .enumerate()
            .filter_map(|(index, keep)| keep.then_some(index))
            .collect()
    }
}

fn eval(expr: &Expr, n: i64) -> i64 {
    match expr {
        Expr::Num(value) => *value,
        Expr::Var => n,
        Expr::Neg(inner) => -eval(inner, n),
        Expr::Add(lhs, rhs) => eval(lhs, n) + eval(rhs, n),
        Expr::Sub(lhs, rhs) => eval(lhs, n) - eval(rhs, n),
        Expr::Mul(lhs, rhs) => eval(lhs, n) * eval(rhs, n),
    }
}

fn lex(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            'n' | 'N' => {
                chars.next();
                tokens.push(Token::Var);
            }
            '0'..='9' => {
                let mut value: i64 = 0;
                while let Some(&d) = chars.peek() {
                    let Some(digit) = d.to_digit(10) else { break };
                    value = value.checked_mul(10)?.checked_add(digit as i64)?;
                    chars.next();
                }
                tokens.push(Token::Num(value));
            }
            _ => return None,
        }
    }
    if tokens.is_empty() { None } else { Some(tokens) }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn expr(&mut self) -> Option<Expr> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.bump();
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.term()?));
                }
                Token::Minus => {
                    self.bump();
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.term()?));
                }
                _ => break,
            }
        }
        Some(lhs)
    }

    fn term(&mut self) -> Option<Expr> {
        let mut lhs = self.factor()?;
        while self.peek() == Some(Token::Star) {
            self.bump();
            lhs = Expr::Mul(Box::new(lhs), Box::new(self.factor()?));
        }
        Some(lhs)
    }

    fn factor(&mut self) -> Option<Expr> {
        match self.bump()? {
            Token::Minus => Some(Expr::Neg(Box::new(self.factor()?))),
            Token::Open => {
                let inner = self.expr()?;
                if self.bump()? != Token::Close {
                    return None;
                }
                Some(inner)
            }
            Token::Var => Some(Expr::Var),
            Token::Num(value) => {
                // `2n` is multiplication with the coefficient written first
                if self.peek() == Some(Token::Var) {
                    self.bump();
                    Some(Expr::Mul(Box::new(Expr::Num(value)), Box::new(Expr::Var)))
                } else {
                    Some(Expr::Num(value))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeps(expr: &str, len: usize) -> Vec<usize> {
        NthExpr::parse(expr).unwrap().keep_indices(len)
    }

    #[test]
    fn literal_selects_one_position() {
        assert_eq!(keeps("1", 3), vec![0]);
        assert_eq!(keeps("2", 3), vec![1]);
        assert_eq!(keeps("5", 3), Vec::<usize>::new());
    }

    #[test]
    fn even_positions() {
        assert_eq!(keeps("2n", 3), vec![1]);
        assert_eq!(keeps("2n", 6), vec![1, 3, 5]);
    }

    #[test]
    fn odd_positions() {
        assert_eq!(keeps("2n+1", 3), vec![0, 2]);
    }

    #[test]
    fn first_k_positions() {
        assert_eq!(keeps("-n+2", 3), vec![0, 1]);
        assert_eq!(keeps("-n+3", 3), vec![0, 1, 2]);
    }

    #[test]
    fn parentheses_and_explicit_multiplication() {
        assert_eq!(keeps("2*(n+1)", 6), vec![1, 3, 5]);
    }

    #[test]
    fn eval_binds_n() {
        let expr = NthExpr::parse("3n-2").unwrap();
        assert_eq!(expr.eval(0), -2);
        assert_eq!(expr.eval(4), 10);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(NthExpr::parse("").is_none());
        assert!(NthExpr::parse("odd").is_none());
        assert!(NthExpr::parse("2n+").is_none());
        assert!(NthExpr::parse("(2n+1").is_none());
        assert!(NthExpr::parse("n/2").is_none());
    }
}
