use std::str::FromStr;

use thiserror::Error;

/// Rules of Conway's Game of Life.
pub const B3S23: RuleSet = RuleSet::from_masks(0b1000, 0b1100);

/// # Representation
/// Life rules are represented as
/// ```notrust
/// |------birth------|
/// 0000_0000_0000_0000_0000_0000_0000_0000
///                     |----survival-----|
/// ```
///
/// Bit `n` of either half is set when a cell with `n` live neighbors is born (or survives).
///
/// # Examples
/// ```notrust
/// b3s23:                0000_0000_0000_1000_0000_0000_0000_1100
///
/// b0s0:                 0000_0000_0000_0000_0000_0000_0000_0000
/// b012345678s012345678: 0000_0001_1111_1111_0000_0001_1111_1111
/// ```
///
/// See: https://conwaylife.com/wiki/Rulestring
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSet {
    rule: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        B3S23
    }
}

impl RuleSet {
    /// Create a new `RuleSet` for the given births and survivals. For both `b` and
    /// `s`, numbers are set on a bit basis. For instance if bit `i` in `b` is on, it
    /// means `i` is included in the set of births. Any bit past the 8th is ignored.
    ///
    /// Rules where cells are born with no neighbors at all would light up every blank region of
    /// the universe at once, so they are rejected.
    pub fn new(b: u16, s: u16) -> Result<Self, RuleError> {
        if b & 1 != 0 {
            return Err(RuleError::UnsupportedB0);
        }

        Ok(Self::from_masks(b, s))
    }

    const fn from_masks(b: u16, s: u16) -> Self {
        let b = b & 0x1FF;
        let s = s & 0x1FF;

        Self {
            rule: (b as u32) << 16 | s as u32,
        }
    }

    pub fn births(&self) -> u16 {
        ((self.rule & 0x1FF0000) >> 0x10) as u16
    }

    pub fn survivals(&self) -> u16 {
        (self.rule & 0x1FF) as u16
    }

    /// State of a cell in the next generation, given its current state and its number of live
    /// neighbors among the surrounding eight.
    pub fn next_state(&self, alive: bool, neighbors: u8) -> bool {
        debug_assert!(neighbors <= 8);

        let mask = if alive {
            self.survivals()
        } else {
            self.births()
        };

        mask & (1 << neighbors) != 0
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::fmt::Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = |mask: u16| -> String {
            (0..=8u8)
                .filter(|n| mask & (1 << n) != 0)
                .map(|n| char::from(b'0' + n))
                .collect()
        };

        write!(f, "B{}/S{}", digits(self.births()), digits(self.survivals()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Empty rule")]
    Empty,

    #[error("Unexpected character '{got}' in rule")]
    InvalidChar { got: char },

    #[error("Neighbor count {got} is larger than 8")]
    InvalidCount { got: u8 },

    #[error("Expected exactly one '/' in \"{rule}\"")]
    MissingSeparator { rule: String },

    #[error("Rules with births on 0 neighbors (B0) are not supported")]
    UnsupportedB0,
}

impl FromStr for RuleSet {
    type Err = RuleError;

    /// Accepts `B3/S23`, `b3s23` and the letterless `23/3` form (survivals first, as written in
    /// RLE `#r` lines).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(RuleError::Empty);
        }

        if s.bytes().all(|b| b.is_ascii_digit() || b == b'/') {
            let Some((s_digits, b_digits)) = s.split_once('/') else {
                return Err(RuleError::MissingSeparator { rule: s.to_string() });
            };

            if b_digits.contains('/') {
                return Err(RuleError::MissingSeparator { rule: s.to_string() });
            }

            return RuleSet::new(counts(b_digits)?, counts(s_digits)?);
        }

        enum State {
            Birth,
            Survival,
        }

        let mut state = State::Birth;
        let (mut b, mut s_mask) = (0u16, 0u16);

        for c in s.chars() {
            match c {
                'b' | 'B' => state = State::Birth,
                's' | 'S' => state = State::Survival,
                '/' => {}
                c => {
                    let n = c.to_digit(10).ok_or(RuleError::InvalidChar { got: c })? as u8;

                    if n > 8 {
                        return Err(RuleError::InvalidCount { got: n });
                    }

                    match state {
                        State::Birth => b |= 1 << n,
                        State::Survival => s_mask |= 1 << n,
                    }
                }
            }
        }

        RuleSet::new(b, s_mask)
    }
}

/// Convert a run of human readable neighbor counts to a packed bit representation
fn counts(digits: &str) -> Result<u16, RuleError> {
    let mut n = 0;

    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            return Err(RuleError::InvalidChar { got: b as char });
        }

        let count = b - b'0';
        if count > 8 {
            return Err(RuleError::InvalidCount { got: count });
        }

        n |= 1 << count;
    }

    Ok(n)
}

#[cfg(test)]
mod test {
    use super::RuleError;
    use super::RuleSet;
    use super::B3S23;

    #[test]
    fn parse_forms() {
        for s in ["B3/S23", "b3s23", "B3S23", "23/3", " b3/s23 "] {
            let rules: RuleSet = s.parse().unwrap();
            assert_eq!(rules, B3S23, "failed on {s:?}");
        }

        let highlife: RuleSet = "B36/S23".parse().unwrap();
        assert_eq!(highlife.births(), 0b100_1000);
        assert_eq!(highlife.survivals(), 0b1100);
        assert_eq!(highlife.to_string(), "B36/S23");
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<RuleSet>(), Err(RuleError::Empty));
        assert_eq!("b9s23".parse::<RuleSet>(), Err(RuleError::InvalidCount { got: 9 }));
        assert_eq!("b3x23".parse::<RuleSet>(), Err(RuleError::InvalidChar { got: 'x' }));
        assert!(matches!(
            "233".parse::<RuleSet>(),
            Err(RuleError::MissingSeparator { .. })
        ));

        // B0
        assert_eq!("B03/S23".parse::<RuleSet>(), Err(RuleError::UnsupportedB0));
        assert_eq!("b0s".parse::<RuleSet>(), Err(RuleError::UnsupportedB0));
        assert_eq!("23/03".parse::<RuleSet>(), Err(RuleError::UnsupportedB0));
        assert_eq!(RuleSet::new(0b1001, 0b1100), Err(RuleError::UnsupportedB0));
        assert_eq!(RuleSet::new(0b1000, 0b1100), Ok(B3S23));
    }

    #[test]
    fn conway_transitions() {
        for n in 0..=8 {
            assert_eq!(B3S23.next_state(false, n), n == 3);
            assert_eq!(B3S23.next_state(true, n), n == 2 || n == 3);
        }
    }
}
