use thiserror::Error;
use tracing::warn;

use crate::WorldOffset;
use crate::node::MAX_DEPTH;
use crate::parse_util;
use crate::parse_util::ConvertError;
use crate::parse_util::ParseError;
use crate::rule_set::RuleError;
use crate::rule_set::RuleSet;

#[derive(Default)]
pub struct RleFile<'a> {
    pub name: Option<&'a [u8]>,
    pub author: Option<&'a [u8]>,

    /// Where the top left corner of the pattern lands
    pub offset: Option<(WorldOffset, WorldOffset)>,

    /// Width and height announced by the header line
    pub size: Option<(u64, u64)>,

    pub set: RuleSet,
}

#[derive(Debug, Error)]
pub enum RleError {
    #[error("Comment line error: {0}")]
    CommentLine(#[from] RleCommentLineError),

    #[error("Header line error: {0}")]
    HeaderLine(#[from] RleHeaderLineError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] RleEncodingError),
}

/// Parse the RLE file format, calling `f(x, y)` for every live cell. `y` grows downward, so the
/// first line of the pattern is its northern edge.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
pub fn read_rle<F>(mut bytes: &'_ [u8], f: F) -> Result<RleFile<'_>, RleError>
where
    F: FnMut(WorldOffset, WorldOffset),
{
    let mut file = RleFile::default();

    // Parse as many comment lines as possible
    loop {
        bytes = parse_util::take_ws(bytes);

        let (Some(line), rest) = read_line_comment(bytes)? else {
            break;
        };

        match line {
            RleCommentLine::Comment => {}
            RleCommentLine::Name { name } => {
                if file.name.is_some() {
                    warn!("RLE file name already defined. Using latest");
                }

                file.name = Some(name);
            }
            RleCommentLine::Author { author } => {
                if file.author.is_some() {
                    warn!("RLE author already defined. Using latest");
                }

                file.author = Some(author);
            }
            RleCommentLine::Offset { x, y } => {
                if file.offset.is_some() {
                    warn!("RLE offset already defined. Using latest");
                }

                file.offset = Some((x, y))
            }
            RleCommentLine::RuleSet { set } => {
                file.set = set;
            }
        }

        bytes = rest;
    }

    // Parse header line, if it's present
    if let (Some(header), rest) = read_line_header(bytes)? {
        let RleHeaderLine { width, height, set } = header;

        file.size = Some((width, height));
        if let Some(set) = set {
            file.set = set;
        }

        bytes = rest;
    }

    let (dx, dy) = file.offset.unwrap_or_default();

    read_encoding(bytes, (dx, dy), file.size, f)?;

    Ok(file)
}

enum RleCommentLine<'a> {
    Comment,
    Name { name: &'a [u8] },
    Author { author: &'a [u8] },
    Offset { x: WorldOffset, y: WorldOffset },
    RuleSet { set: RuleSet },
}

#[derive(Debug, Error)]
pub enum RleCommentLineError {
    #[error("No comment type")]
    NoType,

    #[error("Empty name line")]
    EmptyName,

    #[error("Empty author line")]
    EmptyAuthor,

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Expected two coordinates")]
    MissingCoord,

    #[error("Invalid coordinate: {0}")]
    InvalidCoord(#[from] ConvertError),

    #[error("Invalid comment type, found '{got}'")]
    InvalidType { got: char },
}

/// Attempt to parse a comment line, otherwise leaves `bytes` as-is.
fn read_line_comment(
    bytes: &'_ [u8],
) -> Result<(Option<RleCommentLine<'_>>, &'_ [u8]), RleCommentLineError> {
    let Ok(rest) = parse_util::expect(b'#', bytes) else {
        return Ok((None, bytes));
    };

    let (Some(b), rest) = parse_util::take_1(rest) else {
        return Err(RleCommentLineError::NoType);
    };

    let (line, rest) = parse_util::take_line(rest);
    let line = parse_util::take_blank(line.unwrap_or_default());

    let line = match b {
        // Comment line
        b'C' | b'c' => RleCommentLine::Comment,

        // Pattern name
        b'N' => {
            if line.is_empty() {
                return Err(RleCommentLineError::EmptyName);
            }

            RleCommentLine::Name { name: line }
        }

        // Pattern author
        b'O' => {
            if line.is_empty() {
                return Err(RleCommentLineError::EmptyAuthor);
            }

            RleCommentLine::Author { author: line }
        }

        // Pattern offset
        b'R' | b'P' => {
            let (Some(x), line) = parse_util::take_until_ws(line) else {
                return Err(RleCommentLineError::MissingCoord);
            };
            let (Some(y), _) = parse_util::take_until_ws(parse_util::take_blank(line)) else {
                return Err(RleCommentLineError::MissingCoord);
            };

            RleCommentLine::Offset {
                x: parse_util::convert(x)?,
                y: parse_util::convert(y)?,
            }
        }

        // Pattern rules
        b'r' => {
            let rule = String::from_utf8_lossy(line);

            RleCommentLine::RuleSet {
                set: rule.parse::<RuleSet>()?,
            }
        }

        b => return Err(RleCommentLineError::InvalidType { got: b as char }),
    };

    Ok((Some(line), rest))
}

struct RleHeaderLine {
    width: u64,
    height: u64,
    set: Option<RuleSet>,
}

#[derive(Debug, Error)]
pub enum RleHeaderLineError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Expected {axis} size, found end of input")]
    NoSize { axis: char },

    #[error("Failed to parse {axis} size: {source}")]
    Size {
        axis: char,
        #[source]
        source: ConvertError,
    },

    #[error("Invalid token: expected ',' or '\n', found '{got}'")]
    InvalidToken { got: char },

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// Attempt to parse a header line, otherwise leaves `bytes` as-is.
fn read_line_header(bytes: &[u8]) -> Result<(Option<RleHeaderLine>, &[u8]), RleHeaderLineError> {
    if parse_util::peek_1(bytes) != Some(b'x') {
        return Ok((None, bytes));
    }

    let (Some(line), rest) = parse_util::take_line(bytes) else {
        unreachable!("We peeked and found an 'x'")
    };

    let (width, line) = read_size(b'x', line)?;

    let line = parse_util::expect(b',', parse_util::take_ws(line))?;
    let (height, line) = read_size(b'y', parse_util::take_ws(line))?;

    let line = parse_util::take_ws(line);
    let set = match parse_util::take_1(line) {
        (None, _) => None,
        (Some(b','), line) => {
            let line = parse_util::take_ws(line);
            let line = parse_util::expect_slice(b"rule", line)?;
            let line = parse_util::take_ws(line);
            let line = parse_util::expect(b'=', line)?;

            let rule = String::from_utf8_lossy(parse_util::take_ws(line));
            Some(rule.parse::<RuleSet>()?)
        }
        (Some(b), _) => return Err(RleHeaderLineError::InvalidToken { got: b as char }),
    };

    let line = RleHeaderLine {
        width,
        height,
        set,
    };

    Ok((Some(line), rest))
}

/// Parse `axis = n`
fn read_size(axis: u8, bytes: &[u8]) -> Result<(u64, &[u8]), RleHeaderLineError> {
    let bytes = parse_util::expect(axis, bytes)?;
    let bytes = parse_util::take_ws(bytes);
    let bytes = parse_util::expect(b'=', bytes)?;
    let bytes = parse_util::take_ws(bytes);

    let (Some(n), bytes) = parse_util::take_until_fn(|b| !b.is_ascii_digit(), bytes) else {
        return Err(RleHeaderLineError::NoSize { axis: axis as char });
    };

    let n = parse_util::convert(n).map_err(|source| RleHeaderLineError::Size {
        axis: axis as char,
        source,
    })?;

    Ok((n, bytes))
}

#[derive(Debug, Error)]
pub enum RleEncodingError {
    #[error("Unexpected EOF")]
    UnexpectedEof,

    #[error("Failed to convert run length: {0}")]
    RunLength(#[from] ConvertError),

    #[error("Unrecognized byte: 0x{got:0X}")]
    UnrecognizedByte { got: u8 },

    #[error("Run of {run} cells goes past the pattern's {limit} {axis}")]
    RunTooLong {
        run: WorldOffset,
        limit: WorldOffset,
        axis: &'static str,
    },

    #[error("Cell coordinates overflow")]
    Overflow,
}

/// No universe reaches further than this from the origin.
const COORD_LIMIT: WorldOffset = 1 << (MAX_DEPTH - 1);

/// Move `cursor` forward by `run`, staying within `limit`.
fn advance(
    cursor: WorldOffset,
    run: WorldOffset,
    limit: WorldOffset,
    axis: &'static str,
) -> Result<WorldOffset, RleEncodingError> {
    match cursor.checked_add(run) {
        Some(next) if next <= limit => Ok(next),
        Some(_) => Err(RleEncodingError::RunTooLong { run, limit, axis }),
        None => Err(RleEncodingError::Overflow),
    }
}

fn read_encoding<F>(
    mut bytes: &[u8],
    (dx, dy): (WorldOffset, WorldOffset),
    size: Option<(u64, u64)>,
    mut f: F,
) -> Result<(), RleEncodingError>
where
    F: FnMut(WorldOffset, WorldOffset),
{
    // Runs may not leave the announced size, or the reachable universe without one
    let clamp = |n: u64| WorldOffset::try_from(n).map_or(COORD_LIMIT, |n| n.min(COORD_LIMIT));
    let (width, height) = size.map_or((COORD_LIMIT, COORD_LIMIT), |(w, h)| (clamp(w), clamp(h)));

    let mut rep: WorldOffset = 1;

    let (mut x, mut y): (WorldOffset, WorldOffset) = (0, 0);

    loop {
        let (Some(b), rest) = parse_util::take_1(bytes) else {
            return Err(RleEncodingError::UnexpectedEof);
        };

        match b {
            w if w.is_ascii_whitespace() => {}

            // End of input
            b'!' => break,

            // Dead cells
            b'b' => {
                x = advance(x, rep, width, "width")?;
                rep = 1;
            }

            // Live cells
            b'o' => {
                let next = advance(x, rep, width, "width")?;

                let cx = dx.checked_add(x).ok_or(RleEncodingError::Overflow)?;
                let cy = dy.checked_add(y).ok_or(RleEncodingError::Overflow)?;
                if cx.checked_add(rep).is_none() {
                    return Err(RleEncodingError::Overflow);
                }

                for i in 0..rep {
                    f(cx + i, cy)
                }

                x = next;
                rep = 1;
            }

            // End of line
            b'$' => {
                y = advance(y, rep, height, "height")?;
                x = 0;
                rep = 1;
            }

            n if n.is_ascii_digit() => {
                let (Some(n), rest) = parse_util::take_until_fn(|b| !b.is_ascii_digit(), bytes)
                else {
                    unreachable!("We peeked and found a digit")
                };

                rep = parse_util::convert(n)?;
                bytes = rest;

                continue;
            }

            b => return Err(RleEncodingError::UnrecognizedByte { got: b }),
        }

        bytes = rest;
    }

    Ok(())
}
