//! Display formatting with decimal comma and thousands dot (`1.234,567890`).
//!
//! Presentation only; nothing in the pipeline parses these strings back.

/// Decimal places for rate columns.
pub const RATE_PLACES: usize = 6;
/// Decimal places for currency-style display.
pub const MONEY_PLACES: usize = 4;

/// Fixed-point with `places` decimals, `.` for thousands and `,` for decimals.
pub fn fmt_decimal(x: f64, places: usize) -> String {
    if !x.is_finite() {
        return "N/A".into();
    }
    let plain = format!("{:.*}", places, x.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3 + 1);
    if x < 0.0 {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    if let Some(frac) = frac_part {
        grouped.push(',');
        grouped.push_str(frac);
    }
    grouped
}

/// Display symbol for a currency code, falling back to the code itself.
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "BRL" => "R$",
        "USD" => "US$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        _ => code,
    }
}

/// Currency-style value: `R$ 5,0000`.
pub fn fmt_money(code: &str, x: f64) -> String {
    format!("{} {}", currency_symbol(code), fmt_decimal(x, MONEY_PLACES))
}

/// Signed percentage with two decimals and an explicit sign: `+10,00%`.
pub fn fmt_pct(pct: f64) -> String {
    if !pct.is_finite() {
        return "N/A".into();
    }
    format!("{pct:+.2}%").replace('.', ",")
}
