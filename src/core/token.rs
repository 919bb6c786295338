//! Purpose: Character-level JSON token boundary used by every representation.
//! Exports: `JsonReader`, `JsonWriter`, `JsonNumber`, `DEFAULT_MAX_DEPTH`.
//! Role: Reads/writes booleans, numbers, strings, and structural characters.
//! Invariants: Reader never backtracks; `cur_char` peeks without consuming.
//! Invariants: Writer output is compact JSON (no whitespace between tokens).
//! Notes: Reader failures are protocol errors carrying the byte offset.
use crate::core::error::{Error, ErrorKind};

/// Matches serde_json's default recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug)]
pub struct JsonReader<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> JsonReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn cur_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    pub fn skip_white_space(&mut self) -> &mut Self {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        self.pos += rest.len() - trimmed.len();
        self
    }

    pub fn consume(&mut self, expected: char) -> Result<(), Error> {
        match self.cur_char() {
            Some(found) if found == expected => {
                self.pos += found.len_utf8();
                Ok(())
            }
            Some(found) => Err(self.protocol(format!("expected '{expected}', found '{found}'"))),
            None => Err(self.protocol(format!("expected '{expected}', found end of input"))),
        }
    }

    pub fn read_boolean(&mut self) -> Result<bool, Error> {
        self.skip_white_space();
        let rest = &self.input[self.pos..];
        if rest.starts_with("true") {
            self.pos += 4;
            Ok(true)
        } else if rest.starts_with("false") {
            self.pos += 5;
            Ok(false)
        } else {
            Err(self.protocol("expected boolean literal"))
        }
    }

    pub fn read_number(&mut self) -> Result<JsonNumber, Error> {
        self.skip_white_space();
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut end = start;
        if bytes.get(end) == Some(&b'-') {
            end += 1;
        }
        let int_start = end;
        end += count_digits(&bytes[end..]);
        if end == int_start {
            return Err(self.protocol("expected number"));
        }
        if bytes[int_start] == b'0' && end - int_start > 1 {
            return Err(self.protocol("leading zeros are not allowed"));
        }
        if bytes.get(end) == Some(&b'.') {
            end += 1;
            let digits = count_digits(&bytes[end..]);
            if digits == 0 {
                return Err(Error::new(ErrorKind::Protocol)
                    .with_message("expected digit after decimal point")
                    .with_offset(end));
            }
            end += digits;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            end += 1;
            if matches!(bytes.get(end), Some(b'+' | b'-')) {
                end += 1;
            }
            let digits = count_digits(&bytes[end..]);
            if digits == 0 {
                return Err(Error::new(ErrorKind::Protocol)
                    .with_message("expected digit in exponent")
                    .with_offset(end));
            }
            end += digits;
        }
        let lexeme = &self.input[start..end];
        let number = lexeme.parse::<serde_json::Number>().map_err(|err| {
            Error::new(ErrorKind::Protocol)
                .with_message(format!("invalid number '{lexeme}'"))
                .with_offset(start)
                .with_source(err)
        })?;
        self.pos = end;
        Ok(JsonNumber {
            number,
            lexeme: lexeme.to_string(),
            offset: start,
        })
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        self.skip_white_space();
        self.consume('"')?;
        let mut out = String::new();
        loop {
            let Some(ch) = self.cur_char() else {
                return Err(self.protocol("unterminated string"));
            };
            match ch {
                '"' => {
                    self.pos += 1;
                    return Ok(out);
                }
                '\\' => {
                    self.pos += 1;
                    let escaped = self.read_escape()?;
                    out.push(escaped);
                }
                ch if (ch as u32) < 0x20 => {
                    return Err(self.protocol("control character in string"));
                }
                ch => {
                    self.pos += ch.len_utf8();
                    out.push(ch);
                }
            }
        }
    }

    /// Fails unless only whitespace remains.
    pub fn expect_end(&mut self) -> Result<(), Error> {
        self.skip_white_space();
        if self.pos < self.input.len() {
            return Err(self.protocol("trailing characters after value"));
        }
        Ok(())
    }

    /// Marks entry into a nested array/object.
    pub fn enter(&mut self) -> Result<(), Error> {
        if self.depth >= self.max_depth {
            return Err(self
                .protocol(format!("nesting depth exceeds {}", self.max_depth))
                .with_hint("Raise the reader max depth if deeper documents are expected."));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn read_escape(&mut self) -> Result<char, Error> {
        let Some(code) = self.cur_char() else {
            return Err(self.protocol("unterminated escape"));
        };
        self.pos += code.len_utf8();
        let decoded = match code {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => return self.read_unicode_escape(),
            other => return Err(self.protocol(format!("invalid escape '\\{other}'"))),
        };
        Ok(decoded)
    }

    fn read_unicode_escape(&mut self) -> Result<char, Error> {
        let high = self.read_hex4()?;
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high).ok_or_else(|| self.protocol("lone low surrogate"));
        }
        if !self.input[self.pos..].starts_with("\\u") {
            return Err(self.protocol("unpaired high surrogate"));
        }
        self.pos += 2;
        let low = self.read_hex4()?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(self.protocol("invalid low surrogate"));
        }
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(combined).ok_or_else(|| self.protocol("invalid surrogate pair"))
    }

    fn read_hex4(&mut self) -> Result<u32, Error> {
        let digits = self
            .input
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.protocol("truncated unicode escape"))?;
        if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(self.protocol("invalid unicode escape"));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|_| self.protocol("invalid unicode escape"))?;
        self.pos += 4;
        Ok(value)
    }

    fn protocol(&self, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Protocol)
            .with_message(message)
            .with_offset(self.pos)
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}

/// A decoded JSON number exposing both integral and floating extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonNumber {
    number: serde_json::Number,
    lexeme: String,
    offset: usize,
}

impl JsonNumber {
    /// Integral value, failing when the number has a fractional part or does not fit.
    ///
    /// Exactness is decided on the decimal digits of the source text, never on a
    /// rounded float.
    pub fn as_i64_exact(&self) -> Result<i64, Error> {
        if let Some(value) = self.number.as_i64() {
            return Ok(value);
        }
        let (negative, unsigned) = match self.lexeme.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, self.lexeme.as_str()),
        };
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(idx) => (&unsigned[..idx], parse_exponent(&unsigned[idx + 1..])),
            None => (unsigned, 0),
        };
        let (int_digits, frac_digits) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{int_digits}{frac_digits}");
        let significant = digits.trim_start_matches('0');
        let trimmed = significant.trim_end_matches('0');
        if trimmed.is_empty() {
            return Ok(0);
        }
        // Value is `trimmed * 10^scale`.
        let scale = exponent
            .saturating_add((significant.len() - trimmed.len()) as i64)
            .saturating_sub(frac_digits.len() as i64);
        if scale < 0 {
            return Err(self.semantic(format!("{} is not an exact integer", self.lexeme)));
        }
        let overflow = || {
            self.semantic(format!(
                "{} does not fit in a signed 64-bit integer",
                self.lexeme
            ))
        };
        if trimmed.len() as i64 + scale > 19 {
            return Err(overflow());
        }
        let mut magnitude: i128 = trimmed.parse().map_err(|_| overflow())?;
        for _ in 0..scale {
            magnitude *= 10;
        }
        let value = if negative { -magnitude } else { magnitude };
        i64::try_from(value).map_err(|_| overflow())
    }

    pub fn as_f64(&self) -> Result<f64, Error> {
        match self.number.as_f64() {
            Some(value) if value.is_finite() => Ok(value),
            _ => Err(self.semantic(format!("{} is not a finite double", self.number))),
        }
    }

    fn semantic(&self, message: String) -> Error {
        Error::new(ErrorKind::Semantic)
            .with_message(message)
            .with_offset(self.offset)
    }
}

/// Exponent digits of an already validated lexeme; saturates far beyond any i64 scale.
fn parse_exponent(text: &str) -> i64 {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = digits.trim_start_matches('0');
    let magnitude = if digits.len() > 18 {
        i64::MAX / 2
    } else if digits.is_empty() {
        0
    } else {
        digits.parse::<i64>().unwrap_or(i64::MAX / 2)
    };
    if negative { -magnitude } else { magnitude }
}

#[derive(Debug, Default)]
pub struct JsonWriter {
    out: String,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    /// Structural delimiters (`[`, `]`, `{`, `}`, `,`, `:`).
    pub fn append(&mut self, ch: char) {
        self.out.push(ch);
    }

    pub fn write_boolean(&mut self, value: bool) {
        self.out.push_str(if value { "true" } else { "false" });
    }

    pub fn write_long(&mut self, value: i64) {
        self.out.push_str(&value.to_string());
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), Error> {
        let number = serde_json::Number::from_f64(value).ok_or_else(|| {
            Error::new(ErrorKind::Semantic).with_message(format!("{value} has no JSON representation"))
        })?;
        self.out.push_str(&number.to_string());
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), Error> {
        let encoded = serde_json::to_string(value).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("string encoding failed")
                .with_source(err)
        })?;
        self.out.push_str(&encoded);
        Ok(())
    }
}
