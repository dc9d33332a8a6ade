//! Version tokens
//!
//! A version component such as `2rc1` is split into maximal runs of ASCII
//! digits and ASCII letters: `[2, "rc", 1]`. Every other character is dropped.

use std::cmp::Ordering;
use std::fmt;

/// A single numeric or alphabetic run inside a version component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Digit run with leading zeros stripped ("0" for zero)
    Number(String),
    /// Letter run, case-sensitive
    Word(String),
}

impl Token {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Token::Number("0".to_string())
        } else {
            Token::Number(trimmed.to_string())
        }
    }

    /// Render the token, left-padding numbers with zeros up to `zero_pad` digits
    pub fn render(&self, zero_pad: usize) -> String {
        match self {
            Token::Number(digits) if zero_pad > 0 => format!("{:0>width$}", digits, width = zero_pad),
            Token::Number(digits) => digits.clone(),
            Token::Word(word) => word.clone(),
        }
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Canonical digit strings: longer means larger, same length compares lexically
            (Token::Number(a), Token::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Token::Word(a), Token::Word(b)) => a.cmp(b),
            (Token::Number(_), Token::Word(_)) => Ordering::Less,
            (Token::Word(_), Token::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}

/// Split a component string into tokens
///
/// Examples:
/// - "02" -> [2]
/// - "2rc1" -> [2, "rc", 1]
/// - "-" -> []
pub fn tokenize(component: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = component.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let is_digit = c.is_ascii_digit();
        if !is_digit && !c.is_ascii_alphabetic() {
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            let same_kind = if is_digit {
                next.is_ascii_digit()
            } else {
                next.is_ascii_alphabetic()
            };
            if !same_kind {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }

        let run = &component[start..end];
        tokens.push(if is_digit {
            Token::number(run)
        } else {
            Token::Word(run.to_string())
        });
    }

    tokens
}
