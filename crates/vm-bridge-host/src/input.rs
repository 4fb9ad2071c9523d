//! Input queue behind the `env.input` import.
//!
//! The queue is filled from the input panel's text when an assemble call
//! succeeds and is drained one value per guest request. An empty queue
//! answers 0 forever.

use std::collections::VecDeque;

/// Modulus that reduces a value to the guest's 16-bit word.
const WORD_MODULUS: u32 = 1 << 16;

/// FIFO of pending 16-bit input values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputQueue {
    values: VecDeque<u16>,
}

impl InputQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from whitespace-separated tokens.
    ///
    /// Runs of whitespace separate tokens and never produce empty tokens,
    /// so blank text gives an empty queue. Each token is converted with
    /// [`parse_token`].
    pub fn from_text(text: &str) -> Self {
        text.split_whitespace().map(parse_token).collect()
    }

    /// Remove and return the front value, or 0 if the queue is empty.
    pub fn next_input(&mut self) -> u16 {
        self.values.pop_front().unwrap_or(0)
    }

    /// Number of values not yet consumed.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if every value has been consumed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pending values, front first.
    pub fn pending(&self) -> impl Iterator<Item = u16> + '_ {
        self.values.iter().copied()
    }
}

impl FromIterator<u16> for InputQueue {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Convert one input token to a 16-bit word.
///
/// The token is first read as a number, rounded to the nearest `f64` the
/// way the editor page's numeric conversion does, then truncated toward
/// zero and reduced modulo 65536 (negative values wrap). Accepted forms:
/// - decimal integers with an optional sign: `42`, `-1`, `+7`
/// - `0x`, `0o` and `0b` prefixed integers: `0xFF`, `0o17`, `0b101`
/// - decimal fractions and exponents: `2.9`, `1e3`
///
/// Anything else, including `NaN` and infinities, converts to 0. Integers
/// past 2^53 lose their low bits in the `f64` rounding, so e.g.
/// `9007199254740993` converts to 0, not 1.
pub fn parse_token(token: &str) -> u16 {
    let radix = match token.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };

    let value = match radix {
        Some(radix) => parse_radix(&token[2..], radix),
        None => token.parse::<f64>().ok(),
    };

    value.filter(|value| value.is_finite()).map_or(0, wrap_float)
}

/// Read an unsigned digit string as the nearest `f64`.
///
/// Values past `u128` are returned as infinity; every `f64` that large is
/// a multiple of 65536 anyway.
#[allow(clippy::cast_precision_loss)]
fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }

    let mut value = Some(0u128);
    for c in digits.chars() {
        let digit = c.to_digit(radix)?;
        value = value
            .and_then(|acc| acc.checked_mul(u128::from(radix)))
            .and_then(|acc| acc.checked_add(u128::from(digit)));
    }

    Some(value.map_or(f64::INFINITY, |value| value as f64))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wrap_float(value: f64) -> u16 {
    value.trunc().rem_euclid(f64::from(WORD_MODULUS)) as u16
}
