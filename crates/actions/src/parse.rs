//! Output parsers for collaborator stdout.

use rust_decimal::Decimal;

/// Base58 length bounds for a plausible token address.
const MIN_ADDRESS_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 44;

/// Extracts the price from oracle output.
///
/// The oracle narrates its work and ends with a `price: <value>` line;
/// the last parsable occurrence wins.
pub fn parse_price(output: &str) -> Option<Decimal> {
    let mut price = None;
    for line in output.lines() {
        if let Some(idx) = line.find("price:") {
            let candidate = line[idx + "price:".len()..]
                .split_whitespace()
                .next()
                .unwrap_or_default();
            if let Ok(value) = candidate.parse() {
                price = Some(value);
            }
        }
    }
    price
}

/// Extracts held token addresses from holdings-listing output.
///
/// Recognizes `token: <address>, ...` lines, keeps addresses within
/// base58 length bounds, and drops duplicates.
pub fn parse_holdings(output: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for line in output.lines() {
        let Some(idx) = line.find("token:") else {
            continue;
        };
        let address = line[idx + "token:".len()..]
            .trim_start()
            .split([',', ' '])
            .next()
            .unwrap_or_default();
        if (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len())
            && !tokens.iter().any(|t| t == address)
        {
            tokens.push(address.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINT_A: &str = "So11111111111111111111111111111111111111112";
    const MINT_B: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn test_parse_price_last_occurrence_wins() {
        let output = "fetching...\nprice: 0.5\nretry\nprice: 0.75\n";
        assert_eq!(parse_price(output), Some(dec!(0.75)));
    }

    #[test]
    fn test_parse_price_ignores_trailing_text() {
        assert_eq!(parse_price("price: 1.25 USD\n"), Some(dec!(1.25)));
    }

    #[test]
    fn test_parse_price_missing_is_none() {
        assert_eq!(parse_price("no price today\n"), None);
        assert_eq!(parse_price("price: not-a-number\n"), None);
    }

    #[test]
    fn test_parse_holdings_extracts_addresses() {
        let output = format!("token: {MINT_A}, amount: 12.5\ntoken: {MINT_B}, amount: 3\n");
        assert_eq!(parse_holdings(&output), vec![MINT_A, MINT_B]);
    }

    #[test]
    fn test_parse_holdings_rejects_bad_lengths() {
        let output = "token: short, amount: 1\ntoken: , amount: 2\n";
        assert!(parse_holdings(output).is_empty());
    }

    #[test]
    fn test_parse_holdings_skips_unrelated_lines() {
        let output = format!("wallet summary\ntoken: {MINT_A}, amount: 1\ndone\n");
        assert_eq!(parse_holdings(&output), vec![MINT_A]);
    }

    #[test]
    fn test_parse_holdings_dedups() {
        let output = format!("token: {MINT_A}, a: 1\ntoken: {MINT_A}, a: 2\n");
        assert_eq!(parse_holdings(&output).len(), 1);
    }
}
