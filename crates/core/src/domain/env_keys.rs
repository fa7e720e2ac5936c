// Agent environment contract
// Keys read by the predictoor / trader entry points and their value formats

use super::error::{DomainError, Result};

pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const RPC_URL: &str = "RPC_URL";
pub const SUBGRAPH_URL: &str = "SUBGRAPH_URL";
pub const ADDRESS_FILE: &str = "ADDRESS_FILE";
pub const PAIR_FILTER: &str = "PAIR_FILTER";
pub const TIMEFRAME_FILTER: &str = "TIMEFRAME_FILTER";
pub const SOURCE_FILTER: &str = "SOURCE_FILTER";
pub const STAKE_TOKEN: &str = "STAKE_TOKEN";
pub const OWNER_ADDRS: &str = "OWNER_ADDRS";
pub const STAKE_AMOUNT: &str = "STAKE_AMOUNT";
pub const SECONDS_TILL_EPOCH_END: &str = "SECONDS_TILL_EPOCH_END";
pub const EXCHANGE_API_KEY: &str = "EXCHANGE_API_KEY";
pub const EXCHANGE_SECRET_KEY: &str = "EXCHANGE_SECRET_KEY";
pub const POSITION_SIZE: &str = "POSITION_SIZE";

/// Accepted quote currencies
pub const QUOTE_COINS: &[&str] = &["USDT", "DAI", "USDC"];

/// Accepted candle timeframes
pub const TIMEFRAMES: &[&str] = &["1m", "5m", "15m", "30m", "1h", "1d", "1w", "1M"];

fn invalid(key: &str, reason: impl Into<String>) -> DomainError {
    DomainError::InvalidEnv {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Split a filter list on commas and/or whitespace
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

/// Parse a pair filter such as `"BTC/USDT, ETH-USDT"`
///
/// Returns normalized pairs (`BTC-USDT`).
pub fn parse_pairs(value: &str) -> Result<Vec<String>> {
    let pairs: Vec<String> = split_list(value)
        .map(|pair| parse_pair(pair).map(|(base, quote)| format!("{}-{}", base, quote)))
        .collect::<Result<_>>()?;
    if pairs.is_empty() {
        return Err(invalid(PAIR_FILTER, "no pairs given"));
    }
    Ok(pairs)
}

/// Split one pair into base and quote (`ETH/USDT` or `ETH-USDT`)
pub fn parse_pair(pair: &str) -> Result<(String, String)> {
    let normalized = pair.trim().replace('/', "-");
    let (base, quote) = normalized
        .split_once('-')
        .ok_or_else(|| invalid(PAIR_FILTER, format!("'{}' is not BASE/QUOTE", pair)))?;

    if base.is_empty() || !base.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid(PAIR_FILTER, format!("bad base currency in '{}'", pair)));
    }
    if !QUOTE_COINS.contains(&quote) {
        return Err(invalid(
            PAIR_FILTER,
            format!("quote currency in '{}' must be one of {:?}", pair, QUOTE_COINS),
        ));
    }
    Ok((base.to_string(), quote.to_string()))
}

/// Parse a timeframe filter such as `"5m,1h"`
pub fn parse_timeframes(value: &str) -> Result<Vec<String>> {
    let timeframes: Vec<String> = split_list(value).map(str::to_string).collect();
    if timeframes.is_empty() {
        return Err(invalid(TIMEFRAME_FILTER, "no timeframes given"));
    }
    for tf in &timeframes {
        if !TIMEFRAMES.contains(&tf.as_str()) {
            return Err(invalid(
                TIMEFRAME_FILTER,
                format!("'{}' must be one of {:?}", tf, TIMEFRAMES),
            ));
        }
    }
    Ok(timeframes)
}

/// Parse a source filter such as `"binance,kraken"`
pub fn parse_sources(value: &str) -> Result<Vec<String>> {
    let sources: Vec<String> = split_list(value).map(str::to_string).collect();
    if sources.is_empty() {
        return Err(invalid(SOURCE_FILTER, "no sources given"));
    }
    for source in &sources {
        if !source
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid(
                SOURCE_FILTER,
                format!("'{}' is not a lowercase exchange id", source),
            ));
        }
    }
    Ok(sources)
}

/// Check an EVM address (`0x` + 40 hex digits)
pub fn parse_address(key: &str, value: &str) -> Result<String> {
    let hex = value
        .strip_prefix("0x")
        .ok_or_else(|| invalid(key, format!("'{}' must start with 0x", value)))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(key, format!("'{}' is not a 20-byte hex address", value)));
    }
    Ok(value.to_string())
}

/// Parse a comma separated address allow-list
pub fn parse_addresses(key: &str, value: &str) -> Result<Vec<String>> {
    let addrs: Vec<String> = split_list(value)
        .map(|addr| parse_address(key, addr))
        .collect::<Result<_>>()?;
    if addrs.is_empty() {
        return Err(invalid(key, "no addresses given"));
    }
    Ok(addrs)
}

/// 32-byte hex private key, `0x` prefix optional
pub fn is_private_key(value: &str) -> bool {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Keys whose values must never be printed in clear
pub fn is_secret(key: &str) -> bool {
    key.ends_with("PRIVATE_KEY") || key.ends_with("SECRET_KEY") || key.ends_with("API_KEY")
}

/// Mask a secret value, keeping the last 4 chars of long values
pub fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    } else {
        "****".to_string()
    }
}

/// Value for display: redacted when the key is secret
pub fn display_value(key: &str, value: &str, reveal: bool) -> String {
    if !reveal && is_secret(key) {
        redact(value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_normalizes() {
        assert_eq!(
            parse_pairs("ADA-USDT, BTC/USDT  ETH/USDT").unwrap(),
            vec!["ADA-USDT", "BTC-USDT", "ETH-USDT"]
        );
        assert_eq!(parse_pairs("BTC/DAI").unwrap(), vec!["BTC-DAI"]);
    }

    #[test]
    fn test_parse_pairs_rejects_bad_input() {
        assert!(parse_pairs("").is_err());
        assert!(parse_pairs("btc/usdt").is_err());
        assert!(parse_pairs("BTC/EUR").is_err());
        assert!(parse_pairs("BTCUSDT").is_err());
        assert!(parse_pairs("BTC/USDT, /USDT").is_err());
    }

    #[test]
    fn test_parse_timeframes() {
        assert_eq!(parse_timeframes("5m,1h").unwrap(), vec!["5m", "1h"]);
        assert!(parse_timeframes("2m").is_err());
        assert!(parse_timeframes(" , ").is_err());
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(parse_sources("binance, kraken").unwrap(), vec!["binance", "kraken"]);
        assert!(parse_sources("Binance").is_err());
    }

    #[test]
    fn test_parse_addresses() {
        let a = "0x4ac2e51f9b1b0ca9e000dfe6032b24639b172703";
        let b = "0x0000000000000000000000000000000000000001";
        assert_eq!(
            parse_addresses(OWNER_ADDRS, &format!("{},{}", a, b)).unwrap(),
            vec![a.to_string(), b.to_string()]
        );
        assert!(parse_address(STAKE_TOKEN, "4ac2e51f9b1b0ca9e000dfe6032b24639b172703").is_err());
        assert!(parse_address(STAKE_TOKEN, "0x4ac2").is_err());
        assert!(parse_address(STAKE_TOKEN, "0xzzc2e51f9b1b0ca9e000dfe6032b24639b172703").is_err());
    }

    #[test]
    fn test_private_key_shape() {
        let key = "a".repeat(64);
        assert!(is_private_key(&key));
        assert!(is_private_key(&format!("0x{}", key)));
        assert!(!is_private_key("0x1234"));
        assert!(!is_private_key(&"g".repeat(64)));
    }

    #[test]
    fn test_secret_keys_and_redaction() {
        assert!(is_secret(PRIVATE_KEY));
        assert!(is_secret("PREDICTOOR2_PRIVATE_KEY"));
        assert!(is_secret(EXCHANGE_API_KEY));
        assert!(is_secret(EXCHANGE_SECRET_KEY));
        assert!(!is_secret(RPC_URL));

        assert_eq!(redact("0x1234567890abcdef"), "****cdef");
        assert_eq!(redact("short"), "****");
        assert_eq!(display_value(PRIVATE_KEY, "0x1234567890abcdef", true), "0x1234567890abcdef");
        assert_eq!(display_value(RPC_URL, "http://x", false), "http://x");
    }
}
