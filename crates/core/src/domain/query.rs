use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    pub text: String,
    pub quantity: u32,
}

impl QueryItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), quantity: 1 }
    }

    pub fn with_quantity(text: impl Into<String>, quantity: u32) -> Self {
        Self { text: text.into(), quantity }
    }
}

/// Splits free text on commas and newlines into query items.
///
/// Each piece may carry a quantity as `3x milch`, `3 x milch`, `3× milch`
/// or `milch x3`. A bare leading number stays part of the text, so
/// `10 eggs` is looked up as written.
pub fn parse_shopping_list(text: &str) -> Vec<QueryItem> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(parse_piece)
        .collect()
}

fn parse_piece(piece: &str) -> QueryItem {
    if let Some((quantity, rest)) = leading_quantity(piece) {
        return QueryItem::with_quantity(rest, quantity);
    }
    if let Some((rest, quantity)) = trailing_quantity(piece) {
        return QueryItem::with_quantity(rest, quantity);
    }
    QueryItem::new(piece)
}

fn leading_quantity(piece: &str) -> Option<(u32, &str)> {
    let digits_end = piece.find(|ch: char| !ch.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let quantity = piece[..digits_end].parse::<u32>().ok().filter(|value| *value > 0)?;

    let rest = piece[digits_end..].trim_start();
    let rest = rest.strip_prefix(['x', 'X', '×'])?;
    // "2xl shirt" is not a quantity
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some((quantity, rest))
}

fn trailing_quantity(piece: &str) -> Option<(&str, u32)> {
    let (rest, suffix) = piece.rsplit_once(char::is_whitespace)?;
    let digits = suffix.strip_prefix(['x', 'X', '×'])?;
    let quantity = digits.parse::<u32>().ok().filter(|value| *value > 0)?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some((rest, quantity))
}
