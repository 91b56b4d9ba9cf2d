//! TLV record parser for BR Code payloads.
//!
//! A BR Code is a flat sequence of `TT LL VVVV…` records: a two-digit
//! decimal tag, a two-digit decimal length, then exactly that many bytes of
//! value. Three tags (`26`, `62`, `80`) carry nested TLV sequences with
//! their own child schemas; every other known tag is a scalar.
//!
//! Parsing is byte-oriented over the UTF-8 input. Slicing goes through
//! [`str::get`], so a declared length that lands inside a multi-byte
//! character is reported as a truncated record rather than panicking.

use std::collections::BTreeMap;

use crate::error::{PixError, Result};

/// A decoded TLV value: either a scalar string or a nested template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvValue {
    /// A scalar field.
    Value(String),
    /// A nested TLV sequence, keyed by child field name.
    Template(TlvMap),
}

impl TlvValue {
    /// Returns the scalar value, if this is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Value(s) => Some(s),
            Self::Template(_) => None,
        }
    }

    /// Returns the nested map, if this is a template.
    #[must_use]
    pub fn as_template(&self) -> Option<&TlvMap> {
        match self {
            Self::Value(_) => None,
            Self::Template(map) => Some(map),
        }
    }
}

/// Decoded BR Code mapping, keyed by canonical field name.
pub type TlvMap = BTreeMap<String, TlvValue>;

/// Schema entry for one tag at a given nesting level.
enum TagSchema {
    Scalar(&'static str),
    Template(&'static str, &'static [(&'static str, &'static str)]),
}

const MERCHANT_ACCOUNT_CHILDREN: &[(&str, &str)] =
    &[("00", "gui"), ("01", "chave"), ("02", "info_adicional"), ("25", "url")];

const ADDITIONAL_DATA_CHILDREN: &[(&str, &str)] = &[("05", "reference_label")];

const UNRESERVED_CHILDREN: &[(&str, &str)] = &[("00", "gui")];

fn top_level_schema(tag: &str) -> Option<TagSchema> {
    match tag {
        "00" => Some(TagSchema::Scalar("payload_format_indicator")),
        "01" => Some(TagSchema::Scalar("point_of_initiation_method")),
        "26" => Some(TagSchema::Template("merchant_account_information", MERCHANT_ACCOUNT_CHILDREN)),
        "52" => Some(TagSchema::Scalar("merchant_category_code")),
        "53" => Some(TagSchema::Scalar("transaction_currency")),
        "54" => Some(TagSchema::Scalar("transaction_amount")),
        "58" => Some(TagSchema::Scalar("country_code")),
        "59" => Some(TagSchema::Scalar("merchant_name")),
        "60" => Some(TagSchema::Scalar("merchant_city")),
        "61" => Some(TagSchema::Scalar("postal_code")),
        "62" => Some(TagSchema::Template("additional_data_field_template", ADDITIONAL_DATA_CHILDREN)),
        "63" => Some(TagSchema::Scalar("crc")),
        "80" => Some(TagSchema::Template("unreserved_templates", UNRESERVED_CHILDREN)),
        _ => None,
    }
}

/// Parses the full top-level TLV sequence of a CRC-checked BR Code.
///
/// With `strict` set, unknown tags (at any level) are skipped; otherwise
/// the first unknown tag fails the parse.
pub(crate) fn parse(input: &str, strict: bool) -> Result<TlvMap> {
    let mut map = TlvMap::new();
    for record in records(input) {
        let (tag, value) = record?;
        match top_level_schema(tag) {
            Some(TagSchema::Scalar(name)) => {
                map.insert(name.to_owned(), TlvValue::Value(value.to_owned()));
            }
            Some(TagSchema::Template(name, children)) => {
                let nested = parse_template(value, children, strict)?;
                map.insert(name.to_owned(), TlvValue::Template(nested));
            }
            None if strict => {}
            None => return Err(PixError::UnknownTag(tag.to_owned())),
        }
    }
    Ok(map)
}

fn parse_template(
    input: &str,
    children: &[(&str, &str)],
    strict: bool,
) -> Result<TlvMap> {
    let mut map = TlvMap::new();
    for record in records(input) {
        let (tag, value) = record?;
        match children.iter().find(|(t, _)| *t == tag) {
            Some((_, name)) => {
                map.insert((*name).to_owned(), TlvValue::Value(value.to_owned()));
            }
            None if strict => {}
            None => return Err(PixError::UnknownTag(tag.to_owned())),
        }
    }
    Ok(map)
}

/// Iterator over raw `(tag, value)` records of one TLV sequence.
fn records(input: &str) -> impl Iterator<Item = Result<(&str, &str)>> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos >= input.len() {
            return None;
        }
        Some(next_record(input, &mut pos))
    })
}

fn next_record<'a>(input: &'a str, pos: &mut usize) -> Result<(&'a str, &'a str)> {
    let tag = input.get(*pos..*pos + 2).ok_or(PixError::InvalidTagLengthValue)?;
    let size_digits = input.get(*pos + 2..*pos + 4).ok_or(PixError::InvalidTagLengthValue)?;
    let size: usize = size_digits.parse().map_err(|_| PixError::SizeNotAnInteger)?;
    let value = input
        .get(*pos + 4..*pos + 4 + size)
        .ok_or(PixError::InvalidTagLengthValue)?;
    *pos += 4 + size;
    Ok((tag, value))
}
