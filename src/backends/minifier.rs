// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reference minification engine for JavaScript-like source.
//!
//! This is the bridge's built-in [`TransformEngine`]: a deterministic,
//! idempotent compactor with three independent passes selected by
//! [`TransformOptions`]:
//!
//! * **whitespace** — strips comments and re-emits tokens with a separator
//!   only where two adjacent tokens would otherwise fuse;
//! * **identifiers** — renames function parameters to the shortest free
//!   names when the rename is provably capture-free at token level;
//! * **syntax** — peephole rewrites (`true` → `!0`, `false` → `!1`,
//!   semicolons directly before `}` are dropped).
//!
//! With every pass disabled the engine reproduces its input byte for byte.
//! Running any combination of passes on its own output is a fixed point.
//!
//! Known limits, deliberate for a reference engine: regex literals are not
//! recognized (they lex as operators and may mis-tokenize an embedded
//! quote), and identifier renaming conservatively skips any parameter whose
//! usage pattern it cannot prove safe.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::config::TransformOptions;
use crate::traits::{EngineDiagnostics, TransformEngine};

/// The built-in engine. Stateless; one instance serves all requests.
pub struct MinifyEngine;

#[async_trait]
impl TransformEngine for MinifyEngine {
    async fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> Result<String, EngineDiagnostics> {
        let mut stream = tokenize(source)?;
        if options.minify_identifiers {
            rename_parameters(&mut stream.tokens);
        }
        if options.minify_syntax {
            rewrite_syntax(&mut stream.tokens);
        }
        Ok(emit(&stream, options.minify_whitespace))
    }

    fn name(&self) -> &'static str {
        "minify"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    /// Identifier, keyword, or number.
    Word,
    /// String or template literal, quotes included.
    Str,
    /// Operator or separator, greedily munched (`>>>=` is one token).
    Punct,
}

#[derive(Debug, Clone)]
struct Token {
    /// Original whitespace and comments preceding this token. Kept so the
    /// engine can reproduce the input exactly when whitespace minification
    /// is off.
    leading: String,
    text: String,
    kind: TokenKind,
}

struct TokenStream {
    tokens: Vec<Token>,
    /// Trivia after the last token.
    trailing: String,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Multi-char operators, longest first for maximal munch.
const OPERATORS: &[&str] = &[
    ">>>=", "===", "!==", ">>>", "**=", "<<=", ">>=", "&&=", "||=", "??=", "...", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "<<", ">>", "**",
];

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    rest: &'a str,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            rest: source,
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.rest = &self.rest[c.len_utf8()..];
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes whitespace and comments, returning them verbatim.
    fn take_trivia(&mut self) -> Result<String, EngineDiagnostics> {
        let mut trivia = String::new();
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    trivia.push(c);
                    self.bump();
                }
                Some('/') if self.rest.starts_with("//") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        trivia.push(c);
                        self.bump();
                    }
                }
                Some('/') if self.rest.starts_with("/*") => {
                    let (line, column) = (self.line, self.column);
                    trivia.push(self.bump().unwrap());
                    trivia.push(self.bump().unwrap());
                    loop {
                        if self.rest.starts_with("*/") {
                            trivia.push(self.bump().unwrap());
                            trivia.push(self.bump().unwrap());
                            break;
                        }
                        match self.bump() {
                            Some(c) => trivia.push(c),
                            None => {
                                return Err(EngineDiagnostics::single(
                                    "unterminated block comment",
                                    line,
                                    column,
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(trivia),
            }
        }
    }

    fn take_string(&mut self, quote: char) -> Result<String, EngineDiagnostics> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        text.push(self.bump().unwrap());
        loop {
            match self.peek() {
                None => {
                    return Err(EngineDiagnostics::single(
                        "unterminated string literal",
                        line,
                        column,
                    ));
                }
                Some('\\') => {
                    text.push(self.bump().unwrap());
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some('\n') if quote != '`' => {
                    return Err(EngineDiagnostics::single(
                        "unterminated string literal",
                        line,
                        column,
                    ));
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                    if c == quote {
                        return Ok(text);
                    }
                }
            }
        }
    }
}

fn tokenize(source: &str) -> Result<TokenStream, EngineDiagnostics> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let leading = lexer.take_trivia()?;
        let Some(c) = lexer.peek() else {
            return Ok(TokenStream {
                tokens,
                trailing: leading,
            });
        };
        let (text, kind) = if is_word_char(c) {
            let mut word = String::new();
            while let Some(c) = lexer.peek() {
                if !is_word_char(c) {
                    break;
                }
                word.push(c);
                lexer.bump();
            }
            (word, TokenKind::Word)
        } else if c == '\'' || c == '"' || c == '`' {
            (lexer.take_string(c)?, TokenKind::Str)
        } else if let Some(op) = OPERATORS.iter().find(|op| lexer.rest.starts_with(**op)) {
            let op = op.to_string();
            for _ in 0..op.len() {
                lexer.bump();
            }
            (op, TokenKind::Punct)
        } else {
            lexer.bump();
            (c.to_string(), TokenKind::Punct)
        };
        tokens.push(Token {
            leading,
            text,
            kind,
        });
    }
}

fn is_punct(token: &Token, text: &str) -> bool {
    token.kind == TokenKind::Punct && token.text == text
}

fn is_word(token: &Token, text: &str) -> bool {
    token.kind == TokenKind::Word && token.text == text
}

/// Renames function parameters to the shortest free single-letter names.
///
/// The rename is all-or-nothing per parameter: if any occurrence looks like
/// something other than a plain reference (property access, object key or
/// shorthand), the parameter keeps its name. A fresh name is only used if it
/// appears nowhere in the function, which makes the uniform rename safe even
/// across nested scopes.
fn rename_parameters(tokens: &mut [Token]) {
    let mut i = 0;
    while i < tokens.len() {
        let is_function_kw = is_word(&tokens[i], "function")
            && (i == 0 || !is_punct(&tokens[i - 1], "."));
        if is_function_kw {
            rename_one_function(tokens, i);
        }
        i += 1;
    }
}

fn rename_one_function(tokens: &mut [Token], fn_idx: usize) {
    // Optional name, then the parameter list.
    let mut idx = fn_idx + 1;
    if idx < tokens.len() && tokens[idx].kind == TokenKind::Word {
        idx += 1;
    }
    if idx >= tokens.len() || !is_punct(&tokens[idx], "(") {
        return;
    }
    let params_start = idx + 1;

    // Only plain `name, name, ...` lists are eligible; defaults, rest args
    // and destructuring disqualify the whole function.
    let mut params = Vec::new();
    let mut close_paren = None;
    let mut expect_word = true;
    for j in params_start..tokens.len() {
        if is_punct(&tokens[j], ")") {
            close_paren = Some(j);
            break;
        }
        if expect_word && tokens[j].kind == TokenKind::Word {
            params.push((j, tokens[j].text.clone()));
            expect_word = false;
        } else if !expect_word && is_punct(&tokens[j], ",") {
            expect_word = true;
        } else {
            return;
        }
    }
    let Some(close_paren) = close_paren else {
        return;
    };

    let body_open = close_paren + 1;
    if body_open >= tokens.len() || !is_punct(&tokens[body_open], "{") {
        return;
    }
    let mut depth = 0usize;
    let mut body_close = None;
    for j in body_open..tokens.len() {
        if is_punct(&tokens[j], "{") {
            depth += 1;
        } else if is_punct(&tokens[j], "}") {
            depth -= 1;
            if depth == 0 {
                body_close = Some(j);
                break;
            }
        }
    }
    let Some(body_close) = body_close else {
        return;
    };

    let mut used: HashSet<String> = tokens[params_start..body_close]
        .iter()
        .filter(|t| t.kind == TokenKind::Word)
        .map(|t| t.text.clone())
        .collect();

    for (_, param) in &params {
        if param.len() <= 1 {
            continue;
        }
        let Some(fresh) = ('a'..='z')
            .map(|c| c.to_string())
            .find(|name| !used.contains(name))
        else {
            continue;
        };
        if !rename_is_safe(tokens, body_open, body_close, param) {
            continue;
        }
        for token in &mut tokens[params_start..body_close] {
            if token.kind == TokenKind::Word && token.text == *param {
                token.text = fresh.clone();
            }
        }
        used.insert(fresh);
    }
}

/// A parameter occurrence is only a plain reference if it is not a property
/// access (`x.param`), not an object key or ternary-ambiguous use
/// (`param:`), and not a shorthand property (`{param}` / `, param,`).
fn rename_is_safe(tokens: &[Token], body_open: usize, body_close: usize, name: &str) -> bool {
    for j in body_open..body_close {
        if !is_word(&tokens[j], name) {
            continue;
        }
        if j > 0 && is_punct(&tokens[j - 1], ".") {
            return false;
        }
        if j + 1 < tokens.len() && is_punct(&tokens[j + 1], ":") {
            return false;
        }
        let shorthand_before =
            j > 0 && (is_punct(&tokens[j - 1], "{") || is_punct(&tokens[j - 1], ","));
        let shorthand_after = j + 1 < tokens.len()
            && (is_punct(&tokens[j + 1], "}") || is_punct(&tokens[j + 1], ","));
        if shorthand_before && shorthand_after {
            return false;
        }
    }
    true
}

/// Peephole rewrites: boolean literals shrink, statement-final semicolons
/// before a closing brace disappear unless the semicolon is itself an
/// empty statement.
fn rewrite_syntax(tokens: &mut Vec<Token>) {
    for j in 0..tokens.len() {
        let guarded = (j > 0 && is_punct(&tokens[j - 1], "."))
            || (j + 1 < tokens.len() && is_punct(&tokens[j + 1], ":"));
        if guarded {
            continue;
        }
        if is_word(&tokens[j], "true") {
            tokens[j].text = "!0".to_string();
            tokens[j].kind = TokenKind::Punct;
        } else if is_word(&tokens[j], "false") {
            tokens[j].text = "!1".to_string();
            tokens[j].kind = TokenKind::Punct;
        }
    }

    let mut j = tokens.len();
    while j > 0 {
        j -= 1;
        if !is_punct(&tokens[j], ";") {
            continue;
        }
        // A semicolon right after `)`, `;`, or `{` is an entire empty
        // statement (`while (x--);`); removing it changes what the
        // preceding construct governs.
        let empty_statement = j == 0
            || is_punct(&tokens[j - 1], ")")
            || is_punct(&tokens[j - 1], ";")
            || is_punct(&tokens[j - 1], "{");
        if empty_statement {
            continue;
        }
        let at_block_end = j + 1 == tokens.len() || is_punct(&tokens[j + 1], "}");
        if at_block_end {
            let dropped = tokens.remove(j);
            // Keep the dropped token's trivia so the whitespace-preserving
            // mode stays faithful.
            if j < tokens.len() {
                let merged = format!("{}{}", dropped.leading, tokens[j].leading);
                tokens[j].leading = merged;
            }
        }
    }
}

/// True when two adjacent emitted tokens would fuse into a different token.
fn needs_separator(last: char, next: char) -> bool {
    (is_word_char(last) && is_word_char(next))
        || (last == '+' && next == '+')
        || (last == '-' && next == '-')
        || (last == '/' && (next == '/' || next == '*'))
}

fn emit(stream: &TokenStream, minify_whitespace: bool) -> String {
    if !minify_whitespace {
        let mut out = String::new();
        for token in &stream.tokens {
            out.push_str(&token.leading);
            out.push_str(&token.text);
        }
        out.push_str(&stream.trailing);
        return out;
    }

    let mut out = String::new();
    for token in &stream.tokens {
        if let (Some(last), Some(next)) = (out.chars().last(), token.text.chars().next()) {
            if needs_separator(last, next) {
                out.push(' ');
            }
        }
        out.push_str(&token.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn minify(source: &str, options: TransformOptions) -> Result<String, EngineDiagnostics> {
        MinifyEngine.transform(source, &options).await
    }

    fn whitespace_only() -> TransformOptions {
        TransformOptions {
            minify_whitespace: true,
            minify_identifiers: false,
            minify_syntax: false,
        }
    }

    #[tokio::test]
    async fn whitespace_pass_collapses_and_strips_comments() {
        let out = minify(
            "function add(a, b) { // sum\n  return a + b\n}",
            whitespace_only(),
        )
        .await
        .unwrap();
        assert_eq!(out, "function add(a,b){return a+b}");
    }

    #[tokio::test]
    async fn no_passes_reproduces_input_exactly() {
        let source = "function add(a, b) { /* keep me */ return a + b;\n}\n";
        let out = minify(source, TransformOptions::none()).await.unwrap();
        assert_eq!(out, source);
    }

    #[tokio::test]
    async fn identifier_pass_renames_parameters() {
        let options = TransformOptions::default();
        let out = minify(
            "function add(first, second) { return first + second }",
            options,
        )
        .await
        .unwrap();
        assert_eq!(out, "function add(a,b){return a+b}");
    }

    #[tokio::test]
    async fn identifier_pass_skips_property_accesses() {
        let options = TransformOptions {
            minify_whitespace: true,
            minify_identifiers: true,
            minify_syntax: false,
        };
        let out = minify(
            "function pick(record) { return other.record + record.field }",
            options,
        )
        .await
        .unwrap();
        // `record.field` is a plain reference but `other.record` is a
        // property named like the parameter; the rename must not happen.
        assert_eq!(out, "function pick(record){return other.record+record.field}");
    }

    #[tokio::test]
    async fn identifier_pass_avoids_captured_names() {
        let options = TransformOptions {
            minify_whitespace: true,
            minify_identifiers: true,
            minify_syntax: false,
        };
        let out = minify("function inc(value) { return value + a }", options)
            .await
            .unwrap();
        // `a` is taken by an outer binding, so the fresh name must skip it.
        assert_eq!(out, "function inc(b){return b+a}");
    }

    #[tokio::test]
    async fn syntax_pass_shrinks_booleans_and_semicolons() {
        let options = TransformOptions {
            minify_whitespace: true,
            minify_identifiers: false,
            minify_syntax: true,
        };
        let out = minify("function yes() { return true; }", options)
            .await
            .unwrap();
        assert_eq!(out, "function yes(){return!0}");
    }

    #[tokio::test]
    async fn syntax_pass_keeps_empty_statement_semicolons() {
        let options = TransformOptions {
            minify_whitespace: true,
            minify_identifiers: false,
            minify_syntax: true,
        };
        // The semicolon is the entire loop body; dropping it would leave
        // `while(x--)}` with nothing to govern.
        let out = minify("function f(x) { while (x--); }", options)
            .await
            .unwrap();
        assert_eq!(out, "function f(x){while(x--);}");
    }

    #[tokio::test]
    async fn syntax_pass_leaves_object_keys_alone() {
        let options = TransformOptions {
            minify_whitespace: true,
            minify_identifiers: false,
            minify_syntax: true,
        };
        let out = minify("x = { true: 1 }.true", options).await.unwrap();
        assert_eq!(out, "x={true:1}.true");
    }

    #[tokio::test]
    async fn increment_operators_never_fuse() {
        let out = minify("a + ++b", whitespace_only()).await.unwrap();
        assert_eq!(out, "a+ ++b");
    }

    #[tokio::test]
    async fn string_contents_are_untouched() {
        let out = minify("x = 'a  +  b' + \"  //not a comment  \"", whitespace_only())
            .await
            .unwrap();
        assert_eq!(out, "x='a  +  b'+\"  //not a comment  \"");
    }

    #[tokio::test]
    async fn minified_output_is_a_fixed_point() {
        let options = TransformOptions::default();
        let source = "function add(first, second) {\n  // add them\n  return first + second;\n}";
        let once = minify(source, options).await.unwrap();
        let twice = minify(&once, options).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn unterminated_string_reports_position() {
        let err = minify("let x = 1\nlet s = 'oops", TransformOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.messages.len(), 1);
        assert_eq!(err.messages[0].text, "unterminated string literal");
        assert_eq!(err.messages[0].line, 2);
        assert_eq!(err.messages[0].column, 9);
    }

    #[tokio::test]
    async fn unterminated_comment_is_rejected() {
        let err = minify("a /* never closed", TransformOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.messages[0].text, "unterminated block comment");
    }

    #[tokio::test]
    async fn template_literals_keep_newlines() {
        let out = minify("x = `line\nline`", whitespace_only()).await.unwrap();
        assert_eq!(out, "x=`line\nline`");
    }
}
