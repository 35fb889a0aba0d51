use shop_common::{Money, MoneyConversionError};

use crate::ProviderApiError;

/// Number of decimal places the given ISO currency carries. XOF is a zero-decimal currency; everything else this
/// system deals in uses two.
pub fn currency_scale(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        "XOF" => 0,
        _ => 2,
    }
}

/// Providers report amounts as decimal strings. Parse one into minor units for the given currency.
pub fn parse_provider_amount(amount: &str, currency: &str) -> Result<Money, ProviderApiError> {
    Money::from_decimal_str(amount, currency_scale(currency))
        .map_err(|MoneyConversionError(e)| ProviderApiError::InvalidCurrencyAmount(e))
}

/// Render a minor-unit amount the way the given currency's providers expect it.
pub fn format_provider_amount(amount: Money, currency: &str) -> String {
    amount.to_decimal_string(currency_scale(currency))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_decimal_currencies() {
        assert_eq!(parse_provider_amount("7000", "XOF").unwrap(), Money::from(7000));
        assert_eq!(format_provider_amount(Money::from(7000), "xof"), "7000");
        // Providers pad zero-decimal currencies with ".00"; genuine sub-unit amounts are rejected, not rounded.
        assert_eq!(parse_provider_amount("7000.00", "XOF").unwrap(), Money::from(7000));
        assert!(parse_provider_amount("7000.50", "XOF").is_err());
    }

    #[test]
    fn two_decimal_currencies() {
        assert_eq!(parse_provider_amount("25.99", "USD").unwrap(), Money::from(2599));
        assert_eq!(format_provider_amount(Money::from(2599), "USD"), "25.99");
    }
}
