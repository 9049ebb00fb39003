//! Parse options, mirroring `System.Text.RegularExpressions.RegexOptions`.

use super::{Error, Result};

bitflags::bitflags! {
    /// The option bits consulted while parsing.
    ///
    /// Only [`IGNORE_PATTERN_WHITESPACE`](Options::IGNORE_PATTERN_WHITESPACE)
    /// and [`ECMASCRIPT`](Options::ECMASCRIPT) change the shape of the parse;
    /// the rest are accepted (and threaded through grouping constructs, since
    /// `(?imnsx-imnsx)` groups can flip them mid-pattern) so that option
    /// groups are validated the same way the .NET parser validates them.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Options: u32 {
        const IGNORE_CASE               = 1 << 0;
        const MULTILINE                 = 1 << 1;
        const EXPLICIT_CAPTURE          = 1 << 2;
        const SINGLELINE                = 1 << 3;
        const IGNORE_PATTERN_WHITESPACE = 1 << 4;
        const RIGHT_TO_LEFT             = 1 << 5;
        const ECMASCRIPT                = 1 << 6;
        const CULTURE_INVARIANT         = 1 << 7;
    }
}

impl Options {
    /// Rejects option combinations the .NET engine refuses up front.
    /// ECMAScript mode only combines with case folding, multiline and
    /// culture invariance.
    pub fn validate(self) -> Result<()> {
        if self.contains(Options::ECMASCRIPT)
            && self.intersects(
                Options::EXPLICIT_CAPTURE
                    | Options::SINGLELINE
                    | Options::IGNORE_PATTERN_WHITESPACE
                    | Options::RIGHT_TO_LEFT,
            )
        {
            return Err(Error::InvalidOptions(self));
        }
        Ok(())
    }

    /// The option named by a single `(?imnsx)` code letter, if any.
    #[must_use]
    pub fn from_code(ch: u16) -> Option<Options> {
        match ch {
            0x69 | 0x49 => Some(Options::IGNORE_CASE),                 // i I
            0x6D | 0x4D => Some(Options::MULTILINE),                   // m M
            0x6E | 0x4E => Some(Options::EXPLICIT_CAPTURE),            // n N
            0x73 | 0x53 => Some(Options::SINGLELINE),                  // s S
            0x78 | 0x58 => Some(Options::IGNORE_PATTERN_WHITESPACE),   // x X
            _ => None,
        }
    }

    /// Whether `ch` may appear in the options run of `(?opts)` / `(?opts:`.
    #[must_use]
    pub fn is_option_code_unit(ch: u16) -> bool {
        ch == u16::from(b'+') || ch == u16::from(b'-') || Options::from_code(ch).is_some()
    }

    /// Applies an options text run such as `i-msx` on top of `self`, the way
    /// the .NET parser folds `(?opts)` into its current options.
    #[must_use]
    pub fn apply_run(self, run: &[u16]) -> Options {
        let mut copy = self;
        let mut on = true;
        for &ch in run {
            match ch {
                0x2D => on = false, // -
                0x2B => on = true,  // +
                _ => {
                    // The lexer only produces known option letters here.
                    if let Some(option) = Options::from_code(ch) {
                        if on {
                            copy |= option;
                        } else {
                            copy &= !option;
                        }
                    }
                }
            }
        }
        copy
    }
}
