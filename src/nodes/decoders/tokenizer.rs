//! Sniffer trace tokenizer
//!
//! Splits the ASCII stream written by the bus sniffer into primitive tokens:
//!
//! ```text
//! tNNNN.    microseconds since the previous chip select (tNNNN! = data lost during flush)
//! wNNNN     sniffer flushed a buffer of NNNN bus events
//! [ ]       chip select asserted / released
//! !         sniffer dropped data
//! MMSS      master and slave byte, hex (legacy spelling MM/SS)
//! ```
//!
//! `.` and whitespace separate tokens and are skipped. The tokenizer works on
//! a byte slice that may end in the middle of a token; unless the caller says
//! the input is complete, a partial token yields [`Scan::NeedMore`] so the
//! result never depends on where the input was split.

/// Banner line printed by the sniffer when it starts
pub const BANNER: &[u8] = b"SPI Sniffer";

/// One master/slave byte pair clocked during a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytePair {
    pub master: u8,
    pub slave: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Time delta; `lost` is set for the `tNNNN!` spelling
    Elapsed { micros: u64, lost: bool },
    BufferWrite(u32),
    Select,
    Deselect,
    DataLoss,
    Pair(BytePair),
    Banner,
}

/// Result of scanning for the next token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A token occupying `input[start..end]`
    Token {
        token: Token,
        start: usize,
        end: usize,
    },
    /// Input ends inside a token (or holds only separators); feed more
    NeedMore,
    /// Input is complete and exhausted
    End,
}

/// Why a token failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformation {
    #[error("bad time format")]
    Time,
    #[error("bad buffer write numevents format")]
    BufferCount,
    #[error("bad hex data")]
    Hex,
    #[error("unexpected character {0:?}")]
    Unexpected(char),
    #[error("input ended inside a token")]
    Truncated,
}

/// A token that failed to parse, starting at `at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {at}")]
pub struct MalformedToken {
    pub kind: Malformation,
    pub at: usize,
}

impl MalformedToken {
    fn new(kind: Malformation, at: usize) -> Self {
        Self { kind, at }
    }
}

type ScanResult = Result<Scan, MalformedToken>;

/// Scan for the next token at or after `pos`
///
/// `at_eof` declares that no more input will follow, turning partial tokens
/// into [`Malformation::Truncated`] and exhausted input into [`Scan::End`].
pub fn next_token(input: &[u8], mut pos: usize, at_eof: bool) -> ScanResult {
    while let Some(&c) = input.get(pos) {
        match c {
            b'.' | b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'[' => return Ok(single(Token::Select, pos)),
            b']' => return Ok(single(Token::Deselect, pos)),
            b'!' => return Ok(single(Token::DataLoss, pos)),
            b't' => return lex_elapsed(input, pos, at_eof),
            b'w' => return lex_buffer_write(input, pos, at_eof),
            b'S' => return lex_banner(input, pos, at_eof),
            c if c.is_ascii_hexdigit() => return lex_pair(input, pos, at_eof),
            c => return Err(MalformedToken::new(Malformation::Unexpected(char::from(c)), pos)),
        }
    }
    Ok(if at_eof { Scan::End } else { Scan::NeedMore })
}

fn single(token: Token, pos: usize) -> Scan {
    Scan::Token {
        token,
        start: pos,
        end: pos + 1,
    }
}

/// Partial token at the end of the input
fn incomplete(start: usize, at_eof: bool) -> ScanResult {
    if at_eof {
        Err(MalformedToken::new(Malformation::Truncated, start))
    } else {
        Ok(Scan::NeedMore)
    }
}

/// Decimal digits from `from`; `Ok(None)` if they may continue past the input
fn lex_number(
    input: &[u8],
    from: usize,
    at_eof: bool,
    kind: Malformation,
    start: usize,
) -> Result<Option<(u64, usize)>, MalformedToken> {
    let digits = input[from..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count();
    let end = from + digits;

    if end == input.len() && !at_eof {
        return Ok(None);
    }
    if digits == 0 {
        return Err(MalformedToken::new(
            if end == input.len() {
                Malformation::Truncated
            } else {
                kind
            },
            start,
        ));
    }

    let mut value: u64 = 0;
    for &c in &input[from..end] {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(c - b'0')))
            .ok_or_else(|| MalformedToken::new(kind, start))?;
    }
    Ok(Some((value, end)))
}

fn lex_elapsed(input: &[u8], start: usize, at_eof: bool) -> ScanResult {
    let Some((micros, end)) = lex_number(input, start + 1, at_eof, Malformation::Time, start)?
    else {
        return Ok(Scan::NeedMore);
    };

    let lost = match input.get(end) {
        Some(b'.') => false,
        Some(b'!') => true,
        Some(_) => return Err(MalformedToken::new(Malformation::Time, start)),
        None => return incomplete(start, at_eof),
    };
    Ok(Scan::Token {
        token: Token::Elapsed { micros, lost },
        start,
        end: end + 1,
    })
}

fn lex_buffer_write(input: &[u8], start: usize, at_eof: bool) -> ScanResult {
    let Some((events, end)) =
        lex_number(input, start + 1, at_eof, Malformation::BufferCount, start)?
    else {
        return Ok(Scan::NeedMore);
    };
    let events = u32::try_from(events)
        .map_err(|_| MalformedToken::new(Malformation::BufferCount, start))?;
    Ok(Scan::Token {
        token: Token::BufferWrite(events),
        start,
        end,
    })
}

fn lex_banner(input: &[u8], start: usize, at_eof: bool) -> ScanResult {
    let rest = &input[start..];
    if rest.starts_with(BANNER) {
        return Ok(Scan::Token {
            token: Token::Banner,
            start,
            end: start + BANNER.len(),
        });
    }
    if BANNER.starts_with(rest) {
        return incomplete(start, at_eof);
    }
    Err(MalformedToken::new(Malformation::Unexpected('S'), start))
}

/// Two hex digits at `at`; `Ok(None)` if the input ends first
fn hex_byte(input: &[u8], at: usize, start: usize) -> Result<Option<u8>, MalformedToken> {
    let (Some(&hi), Some(&lo)) = (input.get(at), input.get(at + 1)) else {
        if input.get(at).is_some_and(|c| !c.is_ascii_hexdigit()) {
            return Err(MalformedToken::new(Malformation::Hex, start));
        }
        return Ok(None);
    };
    match (hex_value(hi), hex_value(lo)) {
        (Some(hi), Some(lo)) => Ok(Some(hi << 4 | lo)),
        _ => Err(MalformedToken::new(Malformation::Hex, start)),
    }
}

fn hex_value(c: u8) -> Option<u8> {
    char::from(c).to_digit(16).map(|d| d as u8)
}

fn lex_pair(input: &[u8], start: usize, at_eof: bool) -> ScanResult {
    let Some(master) = hex_byte(input, start, start)? else {
        return incomplete(start, at_eof);
    };
    let slave_at = match input.get(start + 2) {
        Some(b'/') => start + 3,
        Some(_) => start + 2,
        None => return incomplete(start, at_eof),
    };
    let Some(slave) = hex_byte(input, slave_at, start)? else {
        return incomplete(start, at_eof);
    };
    Ok(Scan::Token {
        token: Token::Pair(BytePair { master, slave }),
        start,
        end: slave_at + 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokenize complete input, collecting tokens until the first error
    fn tokens(input: &[u8]) -> (Vec<Token>, Option<MalformedToken>) {
        let mut pos = 0;
        let mut out = Vec::new();
        loop {
            match next_token(input, pos, true) {
                Ok(Scan::Token { token, end, .. }) => {
                    out.push(token);
                    pos = end;
                }
                Ok(Scan::End) => return (out, None),
                Ok(Scan::NeedMore) => panic!("NeedMore with complete input"),
                Err(e) => return (out, Some(e)),
            }
        }
    }

    fn pair(master: u8, slave: u8) -> Token {
        Token::Pair(BytePair { master, slave })
    }

    #[test]
    fn test_sniffer_dialect() {
        let (toks, err) = tokens(b"w3.t1234.[300F]\n");
        assert!(err.is_none());
        assert_eq!(
            toks,
            vec![
                Token::BufferWrite(3),
                Token::Elapsed {
                    micros: 1234,
                    lost: false
                },
                Token::Select,
                pair(0x30, 0x0F),
                Token::Deselect,
            ]
        );
    }

    #[test]
    fn test_legacy_dialect() {
        let (toks, err) = tokens(b"t10![7F/0F 01/0f]");
        assert!(err.is_none());
        assert_eq!(
            toks,
            vec![
                Token::Elapsed {
                    micros: 10,
                    lost: true
                },
                Token::Select,
                pair(0x7F, 0x0F),
                pair(0x01, 0x0F),
                Token::Deselect,
            ]
        );
    }

    #[test]
    fn test_banner_and_data_loss() {
        let (toks, err) = tokens(b"SPI Sniffer\n!");
        assert!(err.is_none());
        assert_eq!(toks, vec![Token::Banner, Token::DataLoss]);
    }

    #[test]
    fn test_partial_tokens_need_more() {
        for partial in [&b"t12"[..], b"t", b"w40", b"3", b"300", b"30/0", b"SPI Sn", b"  ."] {
            assert_eq!(
                next_token(partial, 0, false),
                Ok(Scan::NeedMore),
                "input {:?}",
                String::from_utf8_lossy(partial)
            );
        }
    }

    #[test]
    fn test_partial_tokens_at_eof_are_truncated() {
        for partial in [&b"t12"[..], b"3", b"300", b"SPI Sn"] {
            let err = next_token(partial, 0, true).unwrap_err();
            assert_eq!(err.kind, Malformation::Truncated);
            assert_eq!(err.at, 0);
        }
        // A buffer count needs no terminator
        assert_eq!(
            next_token(b"w40", 0, true),
            Ok(Scan::Token {
                token: Token::BufferWrite(40),
                start: 0,
                end: 3
            })
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let err = next_token(b"tx.", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Time);

        let err = next_token(b"t12[", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Time);

        let err = next_token(b"wz", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::BufferCount);

        let err = next_token(b"  3G0F", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Hex);
        assert_eq!(err.at, 2);

        let err = next_token(b"30Z", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Hex);

        let err = next_token(b"#", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Unexpected('#'));

        let err = next_token(b"SPX", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Unexpected('S'));
    }

    #[test]
    fn test_time_overflow_is_malformed() {
        let err = next_token(b"t99999999999999999999999.", 0, false).unwrap_err();
        assert_eq!(err.kind, Malformation::Time);
    }

    #[test]
    fn test_token_positions() {
        assert_eq!(
            next_token(b" . 0A05", 0, false),
            Ok(Scan::Token {
                token: pair(0x0A, 0x05),
                start: 3,
                end: 7
            })
        );
    }
}
