//! Tokenizer for calculator input.
//!
//! Validation happens in two passes over the raw text, mirroring the two
//! rejection kinds: first every character must belong to the calculator
//! alphabet (`InvalidInput`), then every identifier must name a known function
//! or constant (`InvalidFunction`). Only then is the token stream handed to
//! the parser.

use crate::{EvalError, is_constant, is_function};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Bang,
    LParen,
    RParen,
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '.' | '+' | '-' | '*' | '/' | '^' | '%' | '!' | '(' | ')' | 'π')
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    if input.chars().any(|c| !is_allowed(c)) {
        return Err(EvalError::InvalidInput);
    }

    let mut tokens = Vec::new();
    // Reported only after identifiers have been checked.
    let mut malformed = None;
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '%' => Token::Percent,
            '!' => Token::Bang,
            '(' => Token::LParen,
            ')' => Token::RParen,
            'π' => Token::Ident("π".to_string()),
            '0'..='9' | '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = i + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let exponent = exponent_len(&input[end..]);
                if exponent > 0 {
                    end += exponent;
                    while chars.next_if(|&(i, _)| i < end).is_some() {}
                }
                let literal = &input[start..end];
                match literal.parse::<f64>() {
                    Ok(value) => Token::Number(value),
                    Err(e) => {
                        malformed.get_or_insert_with(|| {
                            EvalError::Generic(format!("malformed number '{}': {}", literal, e))
                        });
                        Token::Number(f64::NAN)
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = start + 1;
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() {
                        end = i + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(input[start..end].to_string())
            }
            other => {
                malformed.get_or_insert_with(|| EvalError::Generic(format!("unexpected '{}'", other)));
                continue;
            }
        };
        tokens.push(token);
    }

    if let Some(name) = tokens.iter().find_map(|t| match t {
        Token::Ident(name) if !is_function(name) && !is_constant(name) => Some(name),
        _ => None,
    }) {
        return Err(EvalError::InvalidFunction(name.clone()));
    }

    match malformed {
        Some(err) => Err(err),
        None => Ok(tokens),
    }
}

/// Length of an `e[+-]digits` suffix at the start of `rest`, or 0 when there is none.
/// A bare `e` is left alone so it still reads as the constant.
fn exponent_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'e') {
        return 0;
    }
    let sign = usize::from(matches!(bytes.get(1), Some(b'+' | b'-')));
    let digits = bytes[1 + sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 { 0 } else { 1 + sign + digits }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_and_operators() {
        let tokens = tokenize("12.5 + .5*3.").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(12.5),
                Token::Plus,
                Token::Number(0.5),
                Token::Star,
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_exp_is_not_split_around_e() {
        let tokens = tokenize("exp(e)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("exp".into()),
                Token::LParen,
                Token::Ident("e".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_pi_symbol() {
        assert_eq!(tokenize("π").unwrap(), vec![Token::Ident("π".into())]);
    }

    #[test]
    fn test_character_check_runs_first() {
        // Both an unknown name and a foreign character: the character wins.
        assert_eq!(tokenize("foo(1)&2"), Err(EvalError::InvalidInput));
        assert_eq!(
            tokenize("foo(1)"),
            Err(EvalError::InvalidFunction("foo".into()))
        );
    }

    #[test]
    fn test_exponent_literals() {
        assert_eq!(tokenize("1e21").unwrap(), vec![Token::Number(1e21)]);
        assert_eq!(
            tokenize("2*1.5e-8").unwrap(),
            vec![Token::Number(2.0), Token::Star, Token::Number(1.5e-8)]
        );
        // `e` with no digits after it is still the constant.
        assert_eq!(
            tokenize("2e").unwrap(),
            vec![Token::Number(2.0), Token::Ident("e".into())]
        );
        assert_eq!(
            tokenize("2e-x"),
            Err(EvalError::InvalidFunction("x".into()))
        );
    }

    #[test]
    fn test_double_dot_is_malformed() {
        assert!(matches!(tokenize("1.2.3"), Err(EvalError::Generic(_))));
    }
}
