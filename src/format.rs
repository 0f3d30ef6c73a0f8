// Display formatting and fixed-point unit conversion

use crate::models::Currency;

/// Balance with currency prefix and thousand separators,
/// e.g. `$1,000.00` or `Rp 100,000.00`.
pub fn format_balance(balance: f64, currency: Currency) -> String {
    let formatted = format_amount(balance, 2);
    match currency {
        Currency::USD => format!("${formatted}"),
        Currency::IDR => format!("Rp {formatted}"),
    }
}

/// Amount with thousand separators and a fixed number of decimals.
pub fn format_amount(amount: f64, decimals: usize) -> String {
    let negative = amount < 0.0;
    let rendered = format!("{:.*}", decimals, amount.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(rendered.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Parse a user-entered decimal amount into fixed-point units, e.g.
/// `"1.5"` at 6 decimals is `1_500_000`. Returns `None` for malformed
/// input or more fractional digits than the token carries.
pub fn parse_units(amount: &str, decimals: u32) -> Option<u128> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > decimals as usize {
        return None;
    }

    let scale = 10u128.checked_pow(decimals)?;
    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };

    let frac_value: u128 = if frac_part.is_empty() {
        0
    } else {
        let parsed: u128 = frac_part.parse().ok()?;
        parsed * 10u128.checked_pow(decimals - frac_part.len() as u32)?
    };

    int_value.checked_mul(scale)?.checked_add(frac_value)
}
