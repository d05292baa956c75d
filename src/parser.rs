use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag};
use nom::character::complete::{char, digit1, none_of, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, rest, verify};
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::IResult;

use crate::header::Number;

/// Value part of a `##key=value` meta line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MetaValue<'a> {
    String(&'a str),
    Structured(Vec<(&'a str, &'a str)>),
}

/// POS column: ASCII digits only, no sign and no leading zeros, so the
/// value always prints back as it was read.
pub(crate) fn position(input: &str) -> IResult<&str, u64> {
    all_consuming(map_res(
        verify(digit1, |digits: &str| digits == "0" || !digits.starts_with('0')),
        str::parse::<u64>,
    ))(input)
}

pub(crate) fn number(input: &str) -> IResult<&str, Number> {
    alt((
        map(map_res(digit1, str::parse::<usize>), Number::Count),
        map(tag("A"), |_| Number::AlternateAlleles),
        map(tag("R"), |_| Number::Alleles),
        map(tag("G"), |_| Number::Genotypes),
        map(tag("."), |_| Number::Unknown),
    ))(input)
}

// quotes are kept out of the returned slice, escapes are left as written
fn string(input: &str) -> IResult<&str, &str> {
    delimited(
        char('"'),
        map(opt(escaped(none_of("\\\""), '\\', one_of("\\\""))), |s| {
            s.unwrap_or("")
        }),
        char('"'),
    )(input)
}

/// Resolves `\"` and `\\` in a quoted value returned by `string`.
pub(crate) fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            unescaped.extend(chars.next());
        } else {
            unescaped.push(c);
        }
    }
    unescaped
}

fn keys_and_values(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
        separated_pair(is_not("<,=>"), char('='), alt((string, is_not(",>"))))(input)
    }
    separated_list0(char(','), key_value)(input)
}

fn meta_value(input: &str) -> IResult<&str, MetaValue<'_>> {
    alt((
        map(
            all_consuming(delimited(char('<'), keys_and_values, char('>'))),
            MetaValue::Structured,
        ),
        map(rest, MetaValue::String),
    ))(input)
}

/// Parses one `##key=value` header line (without the trailing newline).
pub(crate) fn meta_line(input: &str) -> IResult<&str, (&str, MetaValue<'_>)> {
    preceded(tag("##"), separated_pair(is_not("="), char('='), meta_value))(input)
}
