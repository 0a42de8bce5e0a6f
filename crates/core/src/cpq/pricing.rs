use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY: &str = "VNĐ";

/// Formats a whole-currency amount with `.` as the thousands separator,
/// e.g. `12450000` -> `12.450.000`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_price(amount: Decimal) -> String {
    format!("{} {CURRENCY}", format_amount(amount))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_amount, format_price};

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_amount(Decimal::new(12_450_000, 0)), "12.450.000");
        assert_eq!(format_amount(Decimal::new(950, 0)), "950");
        assert_eq!(format_amount(Decimal::new(1_000, 0)), "1.000");
    }

    #[test]
    fn rounds_fractional_amounts() {
        assert_eq!(format_amount(Decimal::new(99_999_5, 1)), "100.000");
        assert_eq!(format_amount(Decimal::new(-2_500_000, 0)), "-2.500.000");
    }

    #[test]
    fn price_carries_currency() {
        assert_eq!(format_price(Decimal::new(2_000_000, 0)), "2.000.000 VNĐ");
    }
}
