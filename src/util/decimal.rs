use std::str::FromStr;

use rust_decimal::Decimal;

use super::basic::SError;

pub fn is_positive(d: &Decimal) -> bool {
    d.is_sign_positive() && !d.is_zero()
}

pub fn is_negative(d: &Decimal) -> bool {
    d.is_sign_negative() && !d.is_zero()
}

pub fn currency_precision_str(d: &Decimal) -> String {
    format!("{:.2}", d)
}

/// Parses a Brazilian-locale decimal, as printed in settlement notes:
/// thousands separator is a period, decimal separator is a comma, and an
/// optional leading "R$" currency marker may be present.
///
/// "R$ 2.850,00" -> 2850.00
/// "1.234"       -> 1234 (a period with three trailing digits is a
///                  thousands separator, never a decimal point)
pub fn parse_brl_decimal(s: &str) -> Result<Decimal, SError> {
    let mut stripped = s.trim();
    if let Some(rest) = stripped.strip_prefix("R$") {
        stripped = rest.trim_start();
    }
    if stripped.is_empty() {
        return Err("Empty decimal value".to_string());
    }

    let normalized: String = stripped
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    Decimal::from_str(&normalized)
        .map_err(|e| format!("Invalid decimal \"{}\": {}", s, e))
}

/// As parse_brl_decimal, but tolerates a trailing debit/credit letter
/// ("123,45 D"), which summary rows use to mark the sign convention.
/// The letter itself (if any) is returned alongside the value.
pub fn parse_brl_decimal_with_dc(
    s: &str,
) -> Result<(Decimal, Option<char>), SError> {
    let trimmed = s.trim();
    let (num_part, dc) = match trimmed.chars().last() {
        Some(c @ ('D' | 'C')) => {
            (trimmed[..trimmed.len() - 1].trim_end(), Some(c))
        }
        _ => (trimmed, None),
    };
    Ok((parse_brl_decimal(num_part)?, dc))
}
