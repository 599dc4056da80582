//! Parser for PDS3 `FORMAT` strings.
//!
//! The `FORMAT` keyword of a column carries a Fortran-style edit descriptor such as
//! `"A12"`, `"I5"`, `"F10.4"` or `"E12.5"`. The decoder only needs it for one thing:
//! a fixed-point descriptor with decimals tells how to read a numeric field written
//! without a decimal point (`F6.2` reads `"001234"` as `12.34`).
use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt},
    sequence::preceded,
    IResult, Parser,
};
use serde::{Deserialize, Serialize};

/// A parsed Fortran-style edit descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatSpec {
    /// `Aw`
    Character { width: usize },
    /// `Iw`
    Integer { width: usize },
    /// `Fw.d`
    Fixed { width: usize, decimals: usize },
    /// `Ew.d`, `Dw.d`, `Ew.dEe`
    Exponential { width: usize, decimals: usize },
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>).parse(input)
}

fn decimals(input: &str) -> IResult<&str, usize> {
    map(opt(preceded(char('.'), number)), |d| d.unwrap_or(0)).parse(input)
}

/// Fortran scale factor such as `1P` in `1PE12.5`; it does not change how text is read.
fn scale_factor(input: &str) -> IResult<&str, ()> {
    map(opt((opt(char('-')), digit1, one_of("Pp"))), |_| ()).parse(input)
}

fn character(input: &str) -> IResult<&str, FormatSpec> {
    map(preceded(one_of("Aa"), number), |width| FormatSpec::Character { width }).parse(input)
}

fn integer(input: &str) -> IResult<&str, FormatSpec> {
    // Iw.m (minimum digits) reads like Iw.
    map((one_of("Ii"), number, decimals), |(_, width, _)| {
        FormatSpec::Integer { width }
    })
    .parse(input)
}

fn fixed(input: &str) -> IResult<&str, FormatSpec> {
    map((one_of("Ff"), number, decimals), |(_, width, decimals)| {
        FormatSpec::Fixed { width, decimals }
    })
    .parse(input)
}

fn exponential(input: &str) -> IResult<&str, FormatSpec> {
    map(
        (
            one_of("EeDdGg"),
            number,
            decimals,
            opt(preceded(one_of("Ee"), number)),
        ),
        |(_, width, decimals, _)| FormatSpec::Exponential { width, decimals },
    )
    .parse(input)
}

impl FormatSpec {
    /// Parse a `FORMAT` value. Surrounding whitespace and double quotes are ignored.
    pub fn parse(format: &str) -> Result<Self, String> {
        let input = format.trim().trim_matches('"').trim();
        all_consuming(preceded(
            scale_factor,
            alt((character, integer, fixed, exponential)),
        ))
        .parse(input)
        .map(|(_, spec)| spec)
        .map_err(|_| format!("unrecognized edit descriptor {input:?}"))
    }

    /// Field width in characters.
    pub fn width(&self) -> usize {
        match self {
            FormatSpec::Character { width }
            | FormatSpec::Integer { width }
            | FormatSpec::Fixed { width, .. }
            | FormatSpec::Exponential { width, .. } => *width,
        }
    }

    /// Number of digits after the decimal point, for real descriptors.
    pub fn decimals(&self) -> Option<usize> {
        match self {
            FormatSpec::Fixed { decimals, .. } | FormatSpec::Exponential { decimals, .. } => {
                Some(*decimals)
            }
            _ => None,
        }
    }

    /// Decimals implied by the descriptor when a field is written without a decimal point.
    pub(crate) fn implied_decimals(&self) -> Option<usize> {
        match self {
            FormatSpec::Fixed { decimals, .. } if *decimals > 0 => Some(*decimals),
            _ => None,
        }
    }
}

impl std::str::FromStr for FormatSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatSpec::parse(s)
    }
}

impl std::fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatSpec::Character { width } => write!(f, "A{width}"),
            FormatSpec::Integer { width } => write!(f, "I{width}"),
            FormatSpec::Fixed { width, decimals } => write!(f, "F{width}.{decimals}"),
            FormatSpec::Exponential { width, decimals } => write!(f, "E{width}.{decimals}"),
        }
    }
}
