use rust_decimal::Decimal;

/// Currencies the storefront displays without a fractional part. Their API
/// amounts are still reported in hundredths.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["KRW", "JPY", "VND", "IDR", "CLP", "COP", "TWD", "KZT", "UAH"];

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency {
        "KRW" => Some("₩ "),
        "JPY" | "CNY" => Some("¥ "),
        "USD" => Some("$"),
        "AUD" => Some("A$ "),
        "CAD" => Some("CDN$ "),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "INR" => Some("₹ "),
        _ => None,
    }
}

/// Render an amount given in minor units (hundredths) for display.
///
/// `format_minor(1_200_000, "KRW")` is `"₩ 12,000"`, `format_minor(1999, "USD")`
/// is `"$19.99"`.
pub fn format_minor(amount_minor: i64, currency: &str) -> String {
    let currency = currency.trim().to_ascii_uppercase();
    let mut value = Decimal::new(amount_minor, 2);
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        value = value.trunc();
    }

    let rendered = group_thousands(&value.abs().to_string());
    let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };

    match currency_symbol(&currency) {
        Some(symbol) => format!("{}{}{}", sign, symbol, rendered),
        None if currency.is_empty() => format!("{}{}", sign, rendered),
        None => format!("{}{} {}", sign, currency, rendered),
    }
}

fn group_thousands(plain: &str) -> String {
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}.{}", grouped, frac),
        None => grouped,
    }
}

/// Derive a minor-unit amount from formatted price text by keeping only its
/// digits. Returns `None` when the text holds no digits or overflows.
pub fn digits_to_minor(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
