//! Token sources the grammar driver can pull from.

use crate::error::ParseError;
use crate::location::Location;
use crate::token::Token;
use crate::tokenizer::Tokenizer;

/// Anything that yields tokens one at a time, ending with END.
pub trait TokenSource {
    /// Produce the next token. Once END is returned, keep returning END.
    ///
    /// # Errors
    ///
    /// Returns a lexical [`ParseError`] if the input cannot be tokenized.
    fn next_token(&mut self) -> Result<Token, ParseError>;
}

impl TokenSource for Tokenizer {
    fn next_token(&mut self) -> Result<Token, ParseError> {
        Self::next_token(self)
    }
}

/// Replays previously collected tokens.
///
/// END is synthesized once the tokens run out, located where the last token
/// was, so a recorded stream without its END token still terminates.
#[derive(Debug)]
pub struct TokenReplay<I> {
    tokens: I,
    last: Location,
    offset: usize,
    done: bool,
}

impl<I: Iterator<Item = Token>> TokenReplay<I> {
    /// Replay `tokens`, using `filename` for END if the stream is empty.
    pub fn new(filename: &str, tokens: impl IntoIterator<Item = Token, IntoIter = I>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            last: Location::new(filename, 1),
            offset: 0,
            done: false,
        }
    }
}

impl<I: Iterator<Item = Token>> TokenSource for TokenReplay<I> {
    fn next_token(&mut self) -> Result<Token, ParseError> {
        if !self.done {
            if let Some(token) = self.tokens.next() {
                self.last = token.location.clone();
                self.offset = token.span.end;
                self.done = token.is_end();
                return Ok(token);
            }
            self.done = true;
        }
        Ok(Token::end(self.last.clone(), self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenKind;

    #[test]
    fn test_replay_appends_end() {
        let tokens = vec![
            Token::synthetic(TokenKind::Eol, Location::new("r", 4)),
            Token::synthetic(TokenKind::Eol, Location::new("r", 5)),
        ];
        let mut replay = TokenReplay::new("r", tokens);
        assert_eq!(replay.next_token().unwrap().kind, TokenKind::Eol);
        assert_eq!(replay.next_token().unwrap().kind, TokenKind::Eol);
        let end = replay.next_token().unwrap();
        assert!(end.is_end());
        assert_eq!(end.line(), 5);
        assert!(replay.next_token().unwrap().is_end());
    }

    #[test]
    fn test_replay_empty_stream() {
        let mut replay = TokenReplay::new("empty", Vec::new());
        let end = replay.next_token().unwrap();
        assert!(end.is_end());
        assert_eq!(end.location, Location::new("empty", 1));
    }

    #[test]
    fn test_tokenizer_is_a_source() {
        fn drain(source: &mut dyn TokenSource) -> usize {
            let mut n = 0;
            while !source.next_token().unwrap().is_end() {
                n += 1;
            }
            n
        }
        let mut tokenizer = Tokenizer::new("t", "2024-01-01 close Assets:Cash\n");
        assert_eq!(drain(&mut tokenizer), 4);
    }
}
