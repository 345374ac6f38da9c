//! Tokenizer for program text.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::keywords::{keyword_from_str, Keyword};
use crate::error::{MyrialError, Result};

/// Identifier or keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Text as written.
    pub value: String,
    /// Keyword when `value` is reserved.
    pub keyword: Option<Keyword>,
}

/// Lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword.
    Word(Word),
    /// Integer literal, sign included.
    Number(i64),
    /// Quoted string literal with escapes resolved.
    String(String),
    /// `=`
    Eq,
    /// `;`
    SemiColon,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `:`
    Colon,
    /// `.`
    Period,
    /// End of input.
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => write!(f, "'{}'", word.value),
            Token::Number(n) => write!(f, "{n}"),
            Token::String(s) => write!(f, "{s:?}"),
            Token::Eq => f.write_str("'='"),
            Token::SemiColon => f.write_str("';'"),
            Token::Comma => f.write_str("','"),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::LeftBracket => f.write_str("'['"),
            Token::RightBracket => f.write_str("']'"),
            Token::Colon => f.write_str("':'"),
            Token::Period => f.write_str("'.'"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Token plus the 1-based position of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithLocation {
    /// The token.
    pub token: Token,
    /// Line number.
    pub line: usize,
    /// Column number.
    pub col: usize,
}

impl TokenWithLocation {
    /// Whether this token is `keyword`.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.token, Token::Word(w) if w.keyword == Some(keyword))
    }

    /// Syntax error positioned at this token.
    pub fn error(&self, message: impl Into<String>) -> MyrialError {
        MyrialError::Syntax {
            line: self.line,
            column: self.col,
            message: message.into(),
        }
    }
}

/// Splits program text into tokens, ending with [`Token::Eof`].
pub fn tokenize(text: &str) -> Result<Vec<TokenWithLocation>> {
    Tokenizer::new(text).run()
}

struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn run(mut self) -> Result<Vec<TokenWithLocation>> {
        let mut toks = Vec::new();
        loop {
            self.skip_trivia();
            let (line, col) = (self.line, self.col);
            let token = self.next_token(line, col)?;
            let done = token == Token::Eof;
            toks.push(TokenWithLocation { token, line, col });
            if done {
                return Ok(toks);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, col: usize, message: impl Into<String>) -> MyrialError {
        MyrialError::Syntax {
            line,
            column: col,
            message: message.into(),
        }
    }

    /// Whitespace and `--` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.peek() != Some(&'-') {
                        return;
                    }
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self, line: usize, col: usize) -> Result<Token> {
        let Some(c) = self.bump() else {
            return Ok(Token::Eof);
        };
        let token = match c {
            '=' => Token::Eq,
            ';' => Token::SemiColon,
            ',' => Token::Comma,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ':' => Token::Colon,
            '.' => Token::Period,
            '"' | '\'' => Token::String(self.string(c, line, col)?),
            '-' => match self.chars.peek() {
                Some(d) if d.is_ascii_digit() => self.number(String::from('-'), line, col)?,
                _ => return Err(self.error(line, col, "expected a digit after '-'")),
            },
            c if c.is_ascii_digit() => self.number(String::from(c), line, col)?,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut value = String::from(c);
                while let Some(&n) = self.chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        value.push(n);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let keyword = keyword_from_str(&value);
                Token::Word(Word { value, keyword })
            }
            other => return Err(self.error(line, col, format!("unexpected character {other:?}"))),
        };
        Ok(token)
    }

    fn number(&mut self, mut digits: String, line: usize, col: usize) -> Result<Token> {
        while let Some(&d) = self.chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            self.bump();
        }
        digits
            .parse::<i64>()
            .map(Token::Number)
            .map_err(|_| self.error(line, col, format!("integer {digits} out of range")))
    }

    fn string(&mut self, quote: char, line: usize, col: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(line, col, "unterminated string literal")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                    Some(other) => {
                        return Err(self.error(
                            self.line,
                            self.col - 1,
                            format!("unknown escape '\\{other}'"),
                        ))
                    }
                    None => return Err(self.error(line, col, "unterminated string literal")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}
