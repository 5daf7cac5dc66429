use crate::{
    ast::{
        BinaryOperator, Block, Expr, ExprKind, Function, Ident, Param, Program, Stmt, StmtKind,
        TypeName,
    },
    lexer::Lexer,
    token::{Spanned, Token, TokenKind},
    types::Ty,
};

type Result<T, E = ()> = std::result::Result<T, E>;

pub type ParseResult<T> = Result<T, (T, Vec<Spanned<Error>>)>;

/// Parses a whole program. On failure, the statements which could be parsed
/// are returned alongside the diagnostics.
pub fn parse_program(src: &str) -> ParseResult<Program> {
    let mut p = Parser::new(src);
    let parse_result = p.parse_program();

    let success = parse_result.is_ok();
    let program = parse_result.unwrap_or_default();
    if p.errors.is_empty() {
        debug_assert!(success);
        Ok(program)
    } else {
        Err((program, p.errors))
    }
}

/// Parses a single expression, which must span the entire source.
pub fn parse_expr(src: &str) -> Result<Expr, Vec<Spanned<Error>>> {
    let mut p = Parser::new(src);
    let parse_result = p.parse_expr().and_then(|expr| {
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    });
    match parse_result {
        Ok(expr) if p.errors.is_empty() => Ok(expr),
        _ => Err(p.errors),
    }
}

/// Binding strength of infix operators, from the loosest to the tightest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    /// `==`, `!=`
    Equals,
    /// `<`, `>`, `<=`, `>=`
    LessGreater,
    /// `+`, `-`
    Sum,
    /// `*`, `/`, `%`
    Product,
    /// `^`
    Exponent,
    /// `(` in infix position
    Call,
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    token: Token<'src>,
    lookahead: Token<'src>,
    errors: Vec<Spanned<Error>>,
}

impl<'src> Parser<'src> {
    fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::with_capacity(16);
        while self.except([]) {
            if let Ok(stmt) = self.synchronize(
                &[TokenKind::Semicolon],
                &[],
                Parser::parse_statement,
            ) {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::Eof)?;
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::Let => self.parse_let(),
            TokenKind::Def => self.parse_function(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Stmt {
                    span: block.span,
                    kind: StmtKind::Block(block),
                })
            }
            TokenKind::Identifier if self.peek_second().kind == TokenKind::Assign => {
                self.parse_assign()
            }
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        let start = self.consume(TokenKind::Let)?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        self.consume(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        let end = self.consume(TokenKind::Semicolon)?;

        Ok(Stmt {
            kind: StmtKind::Let { name, ty, value },
            span: start.span.to(end.span),
        })
    }

    fn parse_function(&mut self) -> Result<Stmt> {
        let start = self.consume(TokenKind::Def)?;
        let name = self.parse_ident()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_param)?;
        self.consume(TokenKind::RParen)?;

        self.consume(TokenKind::Arrow)?;
        let return_ty = self.parse_type()?;
        let body = self.parse_block()?;

        let span = start.span.to(body.span);
        let function = Function {
            name,
            params,
            return_ty,
            body,
        };
        Ok(Stmt {
            kind: StmtKind::Function(function),
            span,
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(Param { name, ty })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let start = self.consume(TokenKind::Return)?;
        let value = self.parse_expr()?;
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span: start.span.to(end.span),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.consume(TokenKind::If)?;
        let condition = self.parse_expr()?;
        self.consume(TokenKind::Do)?;
        let consequence = self.parse_block()?;

        let alternative = if self.take(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let end = alternative.as_ref().map_or(consequence.span, |alt| alt.span);
        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                consequence,
                alternative,
            },
            span: start.span.to(end),
        })
    }

    fn parse_assign(&mut self) -> Result<Stmt> {
        let target = self.parse_ident()?;
        self.consume(TokenKind::Assign)?;
        let value = self.parse_expr()?;

        let mut span = target.span.to(value.span);
        if self.is(TokenKind::Semicolon) {
            span = span.to(self.advance().span);
        }
        Ok(Stmt {
            kind: StmtKind::Assign { target, value },
            span,
        })
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt> {
        let expr = self.parse_expr()?;

        let mut span = expr.span;
        if self.is(TokenKind::Semicolon) {
            span = span.to(self.advance().span);
        }
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }

    /// Parses `{ stmt* }`. Statement errors are recovered from inside the
    /// block, so that a single bad statement doesn't discard its siblings.
    fn parse_block(&mut self) -> Result<Block> {
        let start = self.consume(TokenKind::LBrace)?;

        let mut statements = Vec::new();
        while self.except([TokenKind::RBrace]) {
            if let Ok(stmt) = self.synchronize(
                &[TokenKind::Semicolon],
                &[TokenKind::RBrace],
                Parser::parse_statement,
            ) {
                statements.push(stmt);
            }
        }
        let end = self.consume(TokenKind::RBrace)?;

        Ok(Block {
            statements,
            span: start.span.to(end.span),
        })
    }

    fn parse_type(&mut self) -> Result<TypeName> {
        let token = self.consume(TokenKind::Type)?;
        // The lexer only produces `Type` for names in the type table.
        let ty = Ty::from_name(token.text).ok_or(())?;
        Ok(TypeName {
            ty,
            span: token.span,
        })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: token.text.into(),
            span: token.span,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_prec(Precedence::Lowest)
    }

    fn parse_expr_prec(&mut self, prec: Precedence) -> Result<Expr> {
        let lhs_token = self.peek();
        // Delimiters are left in place for the error recovery.
        if !matches!(
            lhs_token.kind,
            TokenKind::Semicolon | TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof
        ) {
            self.advance();
        }
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();
            match Self::infix_precedence(op_token.kind) {
                // An operator of the same precedence is left for the caller's
                // loop, which makes every binary operator left-associative.
                Some(next) if next > prec => {
                    self.advance(); // Operator
                    lhs = self.parse_led(op_token, lhs, next)?;
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression (literals, identifiers and
    /// grouping).
    fn parse_nud(&mut self, token: Token<'src>) -> Result<Expr> {
        let kind = match token.kind {
            TokenKind::Identifier => ExprKind::Ident(Ident {
                name: token.text.into(),
                span: token.span,
            }),
            TokenKind::Int => {
                let Ok(parsed) = token.text.parse::<i32>() else {
                    self.error(token.span.wrap(Error::ParseInt));
                    return Err(());
                };
                ExprKind::Int(parsed)
            }
            TokenKind::Float => match token.text.parse::<f32>() {
                Ok(parsed) if parsed.is_finite() => ExprKind::Float(parsed),
                _ => {
                    self.error(token.span.wrap(Error::ParseFloat));
                    return Err(());
                }
            },
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),

            // Grouping: ( expr ). No node is created, the inner expression
            // just grows to cover the parentheses.
            TokenKind::LParen => {
                let mut expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                expr.span = token.span.to(end.span);
                return Ok(expr);
            }

            TokenKind::Illegal => {
                self.error(token.span.wrap(Error::Illegal(token.text.into())));
                return Err(());
            }
            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                self.error(token.span.wrap(error));
                return Err(());
            }
        };

        Ok(Expr {
            kind,
            span: token.span,
        })
    }

    /// led: Parses tokens that follow a left-hand-side expression (binary
    /// operators and calls).
    fn parse_led(&mut self, op_token: Token<'src>, lhs: Expr, prec: Precedence) -> Result<Expr> {
        let op = match op_token.kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Sub,
            TokenKind::Star => BinaryOperator::Mul,
            TokenKind::Slash => BinaryOperator::Div,
            TokenKind::Percent => BinaryOperator::Rem,
            TokenKind::Caret => BinaryOperator::Pow,
            TokenKind::Less => BinaryOperator::Lt,
            TokenKind::Greater => BinaryOperator::Gt,
            TokenKind::LessEq => BinaryOperator::Le,
            TokenKind::GreaterEq => BinaryOperator::Ge,
            TokenKind::EqEq => BinaryOperator::Eq,
            TokenKind::NotEq => BinaryOperator::Ne,

            // Call: ID ( [expr [, expr]*] )
            TokenKind::LParen => {
                let ExprKind::Ident(callee) = lhs.kind else {
                    self.error(lhs.span.wrap(Error::InvalidCallee));
                    return Err(());
                };
                // LParen was already consumed by the caller.
                let args =
                    self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RParen)?;
                return Ok(Expr {
                    span: lhs.span.to(end.span),
                    kind: ExprKind::Call { callee, args },
                });
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                self.error(op_token.span.wrap(error));
                return Err(());
            }
        };

        // Parse right operand with the operator's own precedence.
        let rhs = self.parse_expr_prec(prec)?;
        Ok(Expr {
            span: lhs.span.to(rhs.span),
            kind: ExprKind::Infix {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        })
    }

    /// Parses `[item (separator item)*]` until `end_delim` is found. A
    /// separator must be followed by another item. Does **NOT** consume the
    /// end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        if !self.except([end_delim]) {
            return Ok(items);
        }
        loop {
            let item = self.synchronize(&[separator], &[end_delim], &parse_item)?;
            items.push(item);

            // After consuming an item, we must consume the separator.
            if self.take(separator) {
                continue;
            }
            if self.is(end_delim) {
                break;
            }
            let c = self.peek();
            self.error(c.span.wrap(Error::UnexpectedAny {
                actual: c.kind,
                expected: Box::from([separator, end_delim]),
            }));
            return Err(());
        }

        Ok(items)
    }

    fn infix_precedence(kind: TokenKind) -> Option<Precedence> {
        let prec = match kind {
            TokenKind::EqEq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::Less | TokenKind::Greater | TokenKind::LessEq | TokenKind::GreaterEq => {
                Precedence::LessGreater
            }
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
            TokenKind::Caret => Precedence::Exponent,
            TokenKind::LParen => Precedence::Call,
            _ => return None,
        };
        Some(prec)
    }
}

impl<'src> Parser<'src> {
    fn new(src: &'src str) -> Parser<'src> {
        let mut lexer = Lexer::new(src);
        let token = lexer.next_token();
        let lookahead = lexer.next_token();
        Parser {
            lexer,
            token,
            lookahead,
            errors: Vec::with_capacity(8),
        }
    }

    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token<'src> {
        self.token
    }

    /// Returns the token after the current one.
    #[inline]
    fn peek_second(&self) -> Token<'src> {
        self.lookahead
    }

    /// Returns the current token and pulls the next one from the lexer.
    fn advance(&mut self) -> Token<'src> {
        let c = self.token;
        self.token = self.lookahead;
        self.lookahead = self.lexer.next_token();
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one, returning it.
    /// If not, records an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token<'src>> {
        let c = self.peek();
        if self.is(expect) {
            return Ok(self.advance());
        }
        let error = if c.kind == TokenKind::Illegal {
            Error::Illegal(c.text.into())
        } else {
            Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }
        };
        self.error(c.span.wrap(error));
        Err(())
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek().kind;
        c != TokenKind::Eof && except.into_iter().all(|e| c != e)
    }

    fn synchronize<T>(
        &mut self,
        cont_cond: &[TokenKind],
        stop_cond: &[TokenKind],
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<T> {
        'outer: loop {
            if let Ok(val) = f(self) {
                break Ok(val);
            }
            // In the case of an error, try to advance until find a token
            // specified in `cont_cond` (in which case we retry) or in
            // `stop_cond` (in which case we stop).
            loop {
                let c = self.peek().kind;
                if c == TokenKind::Eof || stop_cond.contains(&c) {
                    break 'outer Err(());
                }
                // The token advancement must be AFTER stopping. If we break
                // out, the caller should advance (to follow the convention).
                self.advance();
                if cont_cond.contains(&c) {
                    // Don't retry on an exhausted region.
                    if self.except(stop_cond.iter().copied()) {
                        continue 'outer;
                    }
                    break 'outer Err(());
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    /// No expression may start with the given token.
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    InvalidCallee,
    ParseInt,
    ParseFloat,
    /// An illegal token, with its source text.
    Illegal(Box<str>),
}
