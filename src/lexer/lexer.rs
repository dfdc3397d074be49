use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, &Regex) -> Result<(), Error>;

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

/// Tab stops for indentation width.
const TAB_WIDTH: usize = 8;

lazy_static! {
    static ref PATTERNS: Vec<RegexPattern> = vec![
        RegexPattern { regex: Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*").unwrap(), handler: symbol_handler },
        RegexPattern { regex: Regex::new("^[0-9]+").unwrap(), handler: number_handler },
        RegexPattern { regex: Regex::new("^[ \t\r\x0c]+").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new("^#.*").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new(r#"^"(?:[^"\\\n]|\\.)*""#).unwrap(), handler: string_handler },
        RegexPattern { regex: Regex::new(r#"^'(?:[^'\\\n]|\\.)*'"#).unwrap(), handler: string_handler },
        RegexPattern { regex: Regex::new(r#"^["']"#).unwrap(), handler: unterminated_string_handler },
        RegexPattern { regex: Regex::new("^\\(").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(") },
        RegexPattern { regex: Regex::new("^\\)").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")") },
        RegexPattern { regex: Regex::new("^\\[").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[") },
        RegexPattern { regex: Regex::new("^\\]").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]") },
        RegexPattern { regex: Regex::new("^==").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Equals, "==") },
        RegexPattern { regex: Regex::new("^!=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=") },
        RegexPattern { regex: Regex::new("^=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=") },
        RegexPattern { regex: Regex::new("^<=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=") },
        RegexPattern { regex: Regex::new("^<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Less, "<") },
        RegexPattern { regex: Regex::new("^>=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=") },
        RegexPattern { regex: Regex::new("^>").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Greater, ">") },
        RegexPattern { regex: Regex::new("^->").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Arrow, "->") },
        RegexPattern { regex: Regex::new("^\\.").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dot, ".") },
        RegexPattern { regex: Regex::new("^:").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Colon, ":") },
        RegexPattern { regex: Regex::new("^,").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Comma, ",") },
        RegexPattern { regex: Regex::new("^\\+").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+") },
        RegexPattern { regex: Regex::new("^-").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dash, "-") },
        RegexPattern { regex: Regex::new("^\\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Star, "*") },
        RegexPattern { regex: Regex::new("^//").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::DoubleSlash, "//") },
        RegexPattern { regex: Regex::new("^%").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Percent, "%") },
    ];
}

pub struct Lexer {
    tokens: Vec<Token>,
    text: String,
    line: u32,
    col: usize,
    /// Open indentation columns, innermost last. Always starts with 0.
    indents: Vec<usize>,
    /// Unclosed `(` and `[`; line breaks inside them are not significant.
    depth: usize,
}

impl Lexer {
    pub fn new() -> Lexer {
        Lexer {
            tokens: vec![],
            text: String::new(),
            line: 0,
            col: 0,
            indents: vec![0],
            depth: 0,
        }
    }

    pub fn advance_n(&mut self, n: usize) {
        self.col += n;
    }

    pub fn push(&mut self, token: Token) {
        match token.kind {
            TokenKind::OpenParen | TokenKind::OpenBracket => self.depth += 1,
            TokenKind::CloseParen | TokenKind::CloseBracket => {
                self.depth = self.depth.saturating_sub(1)
            }
            _ => {}
        }

        self.tokens.push(token);
    }

    pub fn position_here(&self, len: usize) -> Position {
        Position::new(self.line, self.col as u32, len as u32)
    }

    pub fn remainder(&self) -> &str {
        &self.text[self.col..]
    }

    pub fn at(&self) -> char {
        self.remainder().chars().next().unwrap_or(' ')
    }

    pub fn at_line_end(&self) -> bool {
        self.col >= self.text.len()
    }

    fn start_line(&mut self, line: u32, text: &str) {
        self.line = line;
        self.text = text.to_string();
        self.col = 0;
    }

    /// Matches the text at the current column against `regex`.
    fn matched(&self, regex: &Regex) -> Result<String, Error> {
        regex
            .find(self.remainder())
            .map(|found| found.as_str().to_string())
            .ok_or_else(|| Error::internal(format!("pattern `{}` did not match", regex.as_str())))
    }

    /// Emits INDENT/DEDENT tokens to move the indentation level to `width`.
    fn indent_to(&mut self, width: usize) -> Result<(), Error> {
        let mut top = self.indents.last().copied().unwrap_or(0);

        if width > top {
            self.indents.push(width);
            let position = Position::new(self.line, 0, width as u32);
            self.push(MK_TOKEN!(TokenKind::Indent, String::new(), position));
            return Ok(());
        }

        while width < top {
            self.indents.pop();
            let position = Position::new(self.line, width as u32, 0);
            self.push(MK_TOKEN!(TokenKind::Dedent, String::new(), position));
            top = self.indents.last().copied().unwrap_or(0);
        }

        if width != top {
            return Err(Error::new(
                ErrorImpl::InconsistentDedent,
                Position::new(self.line, 0, width as u32),
            ));
        }

        Ok(())
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new()
    }
}

/// Returns the indentation width of `line` and how many bytes it occupies.
fn measure_indent(line: &str) -> (usize, usize) {
    let mut width = 0;
    let mut bytes = 0;

    for byte in line.bytes() {
        match byte {
            b' ' => width += 1,
            b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
            b'\x0c' => {}
            _ => break,
        }
        bytes += 1;
    }

    (width, bytes)
}

fn number_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex)?;
    let position = lexer.position_here(matched.len());

    lexer.advance_n(matched.len());
    lexer.push(MK_TOKEN!(TokenKind::Number, matched, position));
    Ok(())
}

fn skip_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex)?;
    lexer.advance_n(matched.len());
    Ok(())
}

fn string_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex)?;
    let position = lexer.position_here(matched.len());
    let body = &matched[1..matched.len() - 1];

    let mut result = String::new();
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.peek() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some('0') => result.push('\0'),
            // Unknown escapes keep their backslash
            Some(other) => {
                result.push('\\');
                result.push(*other);
            }
            None => {
                result.push('\\');
                continue;
            }
        }
        chars.next();
    }

    lexer.advance_n(matched.len());
    lexer.push(MK_TOKEN!(TokenKind::String, result, position));
    Ok(())
}

fn unterminated_string_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    let len = lexer.remainder().len();
    Err(Error::new(
        ErrorImpl::UnterminatedString,
        lexer.position_here(len),
    ))
}

fn symbol_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let value = lexer.matched(regex)?;
    let position = lexer.position_here(value.len());
    let kind = RESERVED_LOOKUP
        .get(value.as_str())
        .copied()
        .unwrap_or(TokenKind::Identifier);

    lexer.advance_n(value.len());
    lexer.push(MK_TOKEN!(kind, value, position));
    Ok(())
}

/// Splits `source` into tokens, turning leading whitespace into
/// INDENT/DEDENT tokens and line breaks into NEWLINE tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut lex = Lexer::new();
    let mut last_line = (1, 0);

    for (index, raw_line) in source.split('\n').enumerate() {
        let line = index as u32 + 1;
        lex.start_line(line, raw_line);

        let (width, skip) = measure_indent(raw_line);
        let content = raw_line[skip..].trim_end();

        if content.is_empty() || content.starts_with('#') {
            continue;
        }

        last_line = (line, raw_line.len());

        if lex.depth == 0 {
            lex.indent_to(width)?;
        }
        lex.advance_n(skip);

        while !lex.at_line_end() {
            let pattern = PATTERNS
                .iter()
                .find(|pattern| pattern.regex.is_match(lex.remainder()));

            match pattern {
                Some(pattern) => (pattern.handler)(&mut lex, &pattern.regex)?,
                None => {
                    return Err(Error::new(
                        ErrorImpl::UnrecognisedToken {
                            token: lex.at().to_string(),
                        },
                        lex.position_here(lex.at().len_utf8()),
                    ))
                }
            }
        }

        if lex.depth == 0 {
            let position = lex.position_here(0);
            lex.push(MK_TOKEN!(TokenKind::Newline, String::new(), position));
        }
    }

    let end = Position::new(last_line.0, last_line.1 as u32, 0);
    while lex.indents.len() > 1 {
        lex.indents.pop();
        lex.push(MK_TOKEN!(TokenKind::Dedent, String::new(), end));
    }

    lex.push(MK_TOKEN!(TokenKind::EOF, String::from("EOF"), end));
    trace!(count = lex.tokens.len(), "tokenized source");

    Ok(lex.tokens)
}
