//! Positional argument popper for whitespace-tokenized choices.
//!
//! Choice text is split on whitespace and resolved left-to-right; every
//! consumer pops exactly the tokens it needs and rejects with
//! [`ActionError::InvalidArguments`] when a token is missing or malformed.

use std::collections::VecDeque;

use crate::dex::Id;
use crate::error::ActionError;
use crate::mechanics::Stat;

/// A left-to-right view over the whitespace tokens of a choice.
#[derive(Debug, Clone)]
pub struct Args<'a> {
    tokens: VecDeque<&'a str>,
}

impl<'a> Args<'a> {
    /// Tokenize raw choice text. No quoting; whitespace only.
    pub fn tokenize(text: &'a str) -> Args<'a> {
        Args { tokens: text.split_whitespace().collect() }
    }

    /// Pop the next raw token, if any.
    pub fn next(&mut self) -> Option<&'a str> {
        self.tokens.pop_front()
    }

    /// Pop the next token or reject.
    pub fn expect(&mut self, what: &str) -> Result<&'a str, ActionError> {
        self.next()
            .ok_or_else(|| ActionError::InvalidArguments(format!("expected {what}")))
    }

    /// Pop a zero-based list index.
    pub fn expect_index(&mut self, what: &str) -> Result<usize, ActionError> {
        let token = self.expect(what)?;
        token
            .parse()
            .map_err(|_| ActionError::InvalidArguments(format!("'{token}' is not a valid {what}")))
    }

    /// Pop a small unsigned number.
    pub fn expect_u16(&mut self, what: &str) -> Result<u16, ActionError> {
        let token = self.expect(what)?;
        token
            .parse()
            .map_err(|_| ActionError::InvalidArguments(format!("'{token}' is not a valid {what}")))
    }

    /// Pop a normalized identifier (species, move, item, nature).
    pub fn expect_id(&mut self, what: &str) -> Result<Id, ActionError> {
        Ok(Id::new(self.expect(what)?))
    }

    /// Pop a stat token.
    pub fn expect_stat(&mut self) -> Result<Stat, ActionError> {
        let token = self.expect("stat")?;
        Stat::from_token(token)
            .ok_or_else(|| ActionError::InvalidArguments(format!("'{token}' is not a stat")))
    }

    /// Number of unconsumed tokens.
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    /// Whether all tokens have been consumed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_and_pop() {
        let mut args = Args::tokenize("  train  0   atk ");
        assert_eq!(args.next(), Some("train"));
        assert_eq!(args.expect_index("trainer").unwrap(), 0);
        assert_eq!(args.expect_stat().unwrap(), Stat::Atk);
        assert!(args.is_empty());
    }

    #[test]
    fn test_missing_token_rejects() {
        let mut args = Args::tokenize("");
        assert!(matches!(args.expect("verb"), Err(ActionError::InvalidArguments(_))));
    }

    #[test]
    fn test_bad_index_rejects() {
        let mut args = Args::tokenize("seven");
        assert!(args.expect_index("trainer").is_err());
    }
}
