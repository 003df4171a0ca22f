//! Python tokenizer
//!
//! Splits source text into logical lines: physical lines joined across open
//! brackets and backslash continuations, with comments and blank lines
//! dropped. Indentation is measured on the first physical line of each
//! logical line. Tokenizing stops at the first lexical problem.

use std::fmt;

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Name,
    Number,
    /// String literal, prefix and quotes included
    Str,
    /// Operator or delimiter
    Op,
}

/// One token with the physical line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Name && self.text == keyword
    }

    /// Identifier that is not a reserved word
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Name && !is_keyword(&self.text)
    }

    pub fn is_open_bracket(&self) -> bool {
        self.kind == TokenKind::Op && matches!(self.text.as_str(), "(" | "[" | "{")
    }

    pub fn is_close_bracket(&self) -> bool {
        self.kind == TokenKind::Op && matches!(self.text.as_str(), ")" | "]" | "}")
    }
}

/// A complete statement line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Physical line the statement starts on
    pub line: usize,
    /// Indentation width, tabs expanded to multiples of 8
    pub indent: usize,
    pub tokens: Vec<Token>,
}

impl LogicalLine {
    /// Line ends with `:` and opens an indented block
    pub fn is_block_header(&self) -> bool {
        self.tokens.last().map_or(false, |t| t.is_op(":"))
    }
}

/// First syntax problem found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxProblem {
    pub line: usize,
    pub message: String,
}

impl SyntaxProblem {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

const OPERATORS_3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];

const OPERATORS_2: &[&str] = &[
    "->", ":=", "==", "!=", "<=", ">=", "**", "//", "<<", ">>", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];

const OPERATORS_1: &str = "+-*/%@&|^~<>()[]{},:;.=!";

/// Reserved word check
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Tokenize source into logical lines
pub fn tokenize(source: &str) -> Result<Vec<LogicalLine>, SyntaxProblem> {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    Lexer::new(&normalized).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    brackets: Vec<(char, usize)>,
    current: Option<LogicalLine>,
    lines: Vec<LogicalLine>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            brackets: Vec::new(),
            current: None,
            lines: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Vec<LogicalLine>, SyntaxProblem> {
        let mut at_line_start = true;

        while self.pos < self.chars.len() {
            if at_line_start {
                at_line_start = false;
                // Continuation lines keep the statement's indentation
                if self.current.is_none() {
                    let indent = self.measure_indent();
                    match self.peek() {
                        None | Some('\n') | Some('#') => {}
                        Some(_) => {
                            self.current = Some(LogicalLine {
                                line: self.line,
                                indent,
                                tokens: Vec::new(),
                            })
                        }
                    }
                    continue;
                }
            }

            let c = self.chars[self.pos];
            match c {
                ' ' | '\t' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\n' => {
                    self.pos += 1;
                    self.line += 1;
                    if self.brackets.is_empty() {
                        self.finish_line();
                    }
                    at_line_start = true;
                }
                '\\' => match self.peek_at(1) {
                    Some('\n') => {
                        self.pos += 2;
                        self.line += 1;
                        at_line_start = true;
                    }
                    None => self.pos += 1,
                    Some(_) => {
                        return Err(SyntaxProblem::new(
                            self.line,
                            "unexpected character after line continuation character",
                        ))
                    }
                },
                '\'' | '"' => {
                    let token = self.lex_string(String::new())?;
                    self.push(token);
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_at(1).map_or(false, |n| n.is_ascii_digit())) =>
                {
                    let token = self.lex_number();
                    self.push(token);
                }
                c if c == '_' || c.is_alphabetic() => {
                    let token = self.lex_name()?;
                    self.push(token);
                }
                _ => {
                    let token = self.lex_operator()?;
                    self.push(token);
                }
            }
        }

        if let Some(&(open, line)) = self.brackets.last() {
            return Err(SyntaxProblem::new(line, format!("'{}' was never closed", open)));
        }

        self.finish_line();
        Ok(self.lines)
    }

    fn measure_indent(&mut self) -> usize {
        let mut width = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }
        width
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn push(&mut self, token: Token) {
        if let Some(current) = self.current.as_mut() {
            current.tokens.push(token);
        }
    }

    fn finish_line(&mut self) {
        if let Some(line) = self.current.take() {
            if !line.tokens.is_empty() {
                self.lines.push(line);
            }
        }
    }

    fn lex_name(&mut self) -> Result<Token, SyntaxProblem> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('\'') | Some('"'))
            && STRING_PREFIXES.contains(&text.to_ascii_lowercase().as_str())
        {
            return self.lex_string(text);
        }

        Ok(Token {
            kind: TokenKind::Name,
            text,
            line: self.line,
        })
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        let is_hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X'));

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
            } else if (c == '+' || c == '-')
                && !is_hex
                && matches!(self.chars.get(self.pos - 1), Some('e') | Some('E'))
            {
                self.pos += 1;
            } else {
                break;
            }
        }

        Token {
            kind: TokenKind::Number,
            text: self.chars[start..self.pos].iter().collect(),
            line: self.line,
        }
    }

    fn lex_string(&mut self, prefix: String) -> Result<Token, SyntaxProblem> {
        let start_line = self.line;
        let quote = self.chars[self.pos];
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let mut text = prefix;

        if triple {
            text.extend([quote; 3]);
            self.pos += 3;
            loop {
                match self.peek() {
                    None => {
                        return Err(SyntaxProblem::new(
                            start_line,
                            "unterminated triple-quoted string literal",
                        ))
                    }
                    Some('\\') => {
                        text.push('\\');
                        self.pos += 1;
                        if let Some(escaped) = self.peek() {
                            if escaped == '\n' {
                                self.line += 1;
                            }
                            text.push(escaped);
                            self.pos += 1;
                        }
                    }
                    Some(c)
                        if c == quote
                            && self.peek_at(1) == Some(quote)
                            && self.peek_at(2) == Some(quote) =>
                    {
                        text.extend([quote; 3]);
                        self.pos += 3;
                        break;
                    }
                    Some(c) => {
                        if c == '\n' {
                            self.line += 1;
                        }
                        text.push(c);
                        self.pos += 1;
                    }
                }
            }
        } else {
            text.push(quote);
            self.pos += 1;
            loop {
                match self.peek() {
                    None | Some('\n') => {
                        return Err(SyntaxProblem::new(start_line, "unterminated string literal"))
                    }
                    Some('\\') => {
                        text.push('\\');
                        self.pos += 1;
                        if let Some(escaped) = self.peek() {
                            if escaped == '\n' {
                                self.line += 1;
                            }
                            text.push(escaped);
                            self.pos += 1;
                        }
                    }
                    Some(c) => {
                        text.push(c);
                        self.pos += 1;
                        if c == quote {
                            break;
                        }
                    }
                }
            }
        }

        Ok(Token {
            kind: TokenKind::Str,
            text,
            line: start_line,
        })
    }

    fn lex_operator(&mut self) -> Result<Token, SyntaxProblem> {
        let line = self.line;
        let rest: String = self.chars[self.pos..(self.pos + 3).min(self.chars.len())]
            .iter()
            .collect();

        for candidates in [OPERATORS_3, OPERATORS_2] {
            if let Some(op) = candidates.iter().find(|op| rest.starts_with(**op)) {
                self.pos += op.chars().count();
                return Ok(Token {
                    kind: TokenKind::Op,
                    text: op.to_string(),
                    line,
                });
            }
        }

        let c = self.chars[self.pos];
        if !OPERATORS_1.contains(c) {
            return Err(SyntaxProblem::new(line, format!("invalid character '{}'", c)));
        }
        self.pos += 1;

        match c {
            '(' | '[' | '{' => self.brackets.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(SyntaxProblem::new(
                            line,
                            format!(
                                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                c, open
                            ),
                        ))
                    }
                    None => return Err(SyntaxProblem::new(line, format!("unmatched '{}'", c))),
                }
            }
            _ => {}
        }

        Ok(Token {
            kind: TokenKind::Op,
            text: c.to_string(),
            line,
        })
    }
}
