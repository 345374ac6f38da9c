//! Recursive-descent parser producing [`crate::query::ast`] statements.

use super::keywords::Keyword;
use super::lexer::{tokenize, Token, TokenWithLocation};
use crate::error::Result;
use crate::query::ast::{ColumnDef, Expr, Ident, JoinArg, Literal, SetOp, Statement};
use crate::relation::ColumnType;

/// Parses a whole program.
pub fn parse_program(text: &str) -> Result<Vec<Statement>> {
    Parser::with_tokens(tokenize(text)?).parse_program()
}

/// Parses a single expression, e.g. `DISTINCT Emp`.
pub fn parse_expr(text: &str) -> Result<Expr> {
    let mut parser = Parser::with_tokens(tokenize(text)?);
    let expr = parser.parse_expr()?;
    parser.expect_eof()?;
    Ok(expr)
}

#[derive(Debug)]
struct Parser {
    toks: Vec<TokenWithLocation>,
    /// Index of token we should process next.
    idx: usize,
}

impl Parser {
    fn with_tokens(toks: Vec<TokenWithLocation>) -> Self {
        Parser { toks, idx: 0 }
    }

    fn parse_program(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.at_eof() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let statement = if self.parse_keyword(Keyword::DUMP) {
            Statement::Dump(self.parse_expr()?)
        } else if self.parse_keyword(Keyword::DESCRIBE) {
            Statement::Describe(self.parse_ident()?)
        } else if self.parse_keyword(Keyword::EXPLAIN) {
            Statement::Explain(self.parse_ident()?)
        } else if self.parse_keyword(Keyword::DO) {
            let mut body = Vec::new();
            while !self.parse_keyword(Keyword::WHILE) {
                if self.at_eof() {
                    return Err(self.peek().error("expected WHILE to close DO"));
                }
                body.push(self.parse_statement()?);
            }
            let condition = self.parse_expr()?;
            Statement::DoWhile { body, condition }
        } else {
            let target = self.parse_ident()?;
            self.expect_token(Token::Eq)?;
            Statement::Assign {
                target,
                expr: self.parse_expr()?,
            }
        };
        self.expect_token(Token::SemiColon)?;
        Ok(statement)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        if self.parse_keyword(Keyword::LOAD) {
            let path = self.parse_string()?;
            self.expect_keyword(Keyword::AS)?;
            let schema = self.parse_schema()?;
            Ok(Expr::Load { path, schema })
        } else if self.parse_keyword(Keyword::TABLE) {
            let rows = self.parse_rows()?;
            self.expect_keyword(Keyword::AS)?;
            let schema = self.parse_schema()?;
            Ok(Expr::Table { rows, schema })
        } else if self.parse_keyword(Keyword::DISTINCT) {
            Ok(Expr::distinct(self.parse_expr()?))
        } else if self.parse_keyword(Keyword::LIMIT) {
            let input = self.parse_ident()?;
            self.expect_token(Token::Comma)?;
            let tok = self.next_token().clone();
            let count = match tok.token {
                Token::Number(n) => u64::try_from(n)
                    .map_err(|_| tok.error("LIMIT count must not be negative"))?,
                _ => return Err(tok.error(format!("expected a LIMIT count, found {}", tok.token))),
            };
            Ok(Expr::Limit { input, count })
        } else if let Some(op) = self.parse_set_op() {
            let left = self.parse_ident()?;
            self.expect_token(Token::Comma)?;
            let right = self.parse_ident()?;
            Ok(Expr::SetOp { op, left, right })
        } else if self.parse_keyword(Keyword::FOREACH) {
            let input = self.parse_ident()?;
            self.expect_keyword(Keyword::EMIT)?;
            let columns = self.parse_parenthesized(Self::parse_column_name)?;
            let rename = if self.parse_keyword(Keyword::AS) {
                Some(self.parse_schema()?)
            } else {
                None
            };
            Ok(Expr::Foreach {
                input,
                columns,
                rename,
            })
        } else if self.parse_keyword(Keyword::JOIN) {
            let left = self.parse_join_arg()?;
            self.expect_token(Token::Comma)?;
            let right = self.parse_join_arg()?;
            Ok(Expr::Join { left, right })
        } else {
            Ok(Expr::Alias(self.parse_ident()?))
        }
    }

    fn parse_set_op(&mut self) -> Option<SetOp> {
        if self.parse_keyword(Keyword::UNION) {
            Some(SetOp::Union)
        } else if self.parse_keyword(Keyword::INTERSECT) {
            Some(SetOp::Intersect)
        } else if self.parse_keyword(Keyword::DIFF) {
            Some(SetOp::Diff)
        } else {
            None
        }
    }

    /// `<id> BY (<col>, ...)` or `<id> BY <col>`.
    fn parse_join_arg(&mut self) -> Result<JoinArg> {
        let ident = self.parse_ident()?;
        self.expect_keyword(Keyword::BY)?;
        let columns = if self.peek().token == Token::LeftParen {
            self.parse_parenthesized(Self::parse_column_name)?
        } else {
            vec![self.parse_column_name()?]
        };
        Ok(JoinArg { ident, columns })
    }

    /// `[ (<lit>, ...), ... ]`, possibly empty.
    fn parse_rows(&mut self) -> Result<Vec<Vec<Literal>>> {
        self.expect_token(Token::LeftBracket)?;
        let mut rows = Vec::new();
        if self.consume_token(&Token::RightBracket) {
            return Ok(rows);
        }
        loop {
            rows.push(self.parse_parenthesized(Self::parse_literal)?);
            if self.consume_token(&Token::RightBracket) {
                return Ok(rows);
            }
            self.expect_token(Token::Comma)?;
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let tok = self.next_token();
        match &tok.token {
            Token::Number(n) => Ok(Literal::Int(*n)),
            Token::String(s) => Ok(Literal::String(s.clone())),
            other => Err(tok.error(format!("expected a literal, found {other}"))),
        }
    }

    /// `(<name>:<type>, ...)`.
    fn parse_schema(&mut self) -> Result<Vec<ColumnDef>> {
        self.parse_parenthesized(|p| {
            let name = p.parse_column_name()?;
            p.expect_token(Token::Colon)?;
            let tok = p.next_token().clone();
            let ty = match &tok.token {
                Token::Word(w) if w.keyword.is_none() => w
                    .value
                    .parse::<ColumnType>()
                    .map_err(|err| tok.error(err.to_string()))?,
                other => return Err(tok.error(format!("expected a column type, found {other}"))),
            };
            Ok(ColumnDef::new(name, ty))
        })
    }

    /// Comma-separated, non-empty list inside parentheses.
    fn parse_parenthesized<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.expect_token(Token::LeftParen)?;
        let mut items = vec![item(self)?];
        while self.consume_token(&Token::Comma) {
            items.push(item(self)?);
        }
        self.expect_token(Token::RightParen)?;
        Ok(items)
    }

    /// Column name, dotted when it refers to a join prefix.
    fn parse_column_name(&mut self) -> Result<String> {
        let mut name = self.parse_word()?;
        while self.consume_token(&Token::Period) {
            name.push('.');
            name.push_str(&self.parse_word()?);
        }
        Ok(name)
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let tok = self.next_token();
        match &tok.token {
            Token::Word(w) if w.keyword.is_none() => Ok(Ident(w.value.clone())),
            other => Err(tok.error(format!("expected an identifier, found {other}"))),
        }
    }

    fn parse_word(&mut self) -> Result<String> {
        self.parse_ident().map(|ident| ident.0)
    }

    fn parse_string(&mut self) -> Result<String> {
        let tok = self.next_token();
        match &tok.token {
            Token::String(s) => Ok(s.clone()),
            other => Err(tok.error(format!("expected a quoted string, found {other}"))),
        }
    }

    /// Parse a single keyword.
    fn parse_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_keyword(keyword) {
            self.idx += 1;
            return true;
        }
        false
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.parse_keyword(keyword) {
            return Ok(());
        }
        let tok = self.peek();
        Err(tok.error(format!("expected {}, found {}", keyword.as_str(), tok.token)))
    }

    fn consume_token(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.idx += 1;
            return true;
        }
        false
    }

    fn expect_token(&mut self, token: Token) -> Result<()> {
        if self.consume_token(&token) {
            return Ok(());
        }
        let tok = self.peek();
        Err(tok.error(format!("expected {token}, found {}", tok.token)))
    }

    fn expect_eof(&self) -> Result<()> {
        let tok = self.peek();
        match tok.token {
            Token::Eof => Ok(()),
            _ => Err(tok.error(format!("unexpected {} after expression", tok.token))),
        }
    }

    fn at_eof(&self) -> bool {
        self.peek().token == Token::Eof
    }

    fn peek(&self) -> &TokenWithLocation {
        // The tokenizer always terminates the stream with Eof.
        let last = self.toks.len().saturating_sub(1);
        &self.toks[self.idx.min(last)]
    }

    fn next_token(&mut self) -> &TokenWithLocation {
        let idx = self.idx.min(self.toks.len().saturating_sub(1));
        if self.idx < self.toks.len() {
            self.idx += 1;
        }
        &self.toks[idx]
    }
}
