use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::utils::error::ParseError;

/// Markers stripped before number extraction. Thousands separators go last
/// so "₹9,999.00" collapses to "9999.00" before the regex runs.
const CURRENCY_MARKERS: [&str; 6] = ["₹", "INR", "Rs.", "Rs", "MRP", ","];

/// Expected price range for the tracked product. The check is soft: values
/// outside the band are flagged for a warning, never rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceBand {
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedPrice {
    pub amount: Decimal,
    pub in_expected_band: bool,
}

/// Turns raw element text into a validated numeric price. Pure: no I/O, no
/// shared state.
#[derive(Debug, Clone)]
pub struct PriceParser {
    number_regex: Regex,
    band: PriceBand,
}

impl PriceParser {
    pub fn new(band: PriceBand) -> Self {
        Self {
            number_regex: Regex::new(r"\d+(?:\.\d+)?").expect("price pattern is valid"),
            band,
        }
    }

    pub fn parse(&self, text: &str) -> Result<ParsedPrice, ParseError> {
        let mut cleaned = text.to_string();
        for marker in CURRENCY_MARKERS {
            cleaned = cleaned.replace(marker, "");
        }

        let candidate = self
            .number_regex
            .find(&cleaned)
            .ok_or_else(|| ParseError::NoNumberFound {
                text: text.to_string(),
            })?
            .as_str();

        let amount =
            Decimal::from_str(candidate).map_err(|_| ParseError::MalformedNumber {
                candidate: candidate.to_string(),
            })?;

        // A zero price is never real; treat it like a conversion failure so
        // the extractor moves on to the backup locator.
        if amount <= Decimal::ZERO {
            return Err(ParseError::MalformedNumber {
                candidate: candidate.to_string(),
            });
        }

        Ok(ParsedPrice {
            amount,
            in_expected_band: self.band.contains(amount),
        })
    }
}
