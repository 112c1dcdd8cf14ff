use std::fmt;

/// Amounts are integer cents (minor units), so €12.50 = 1250.
/// Splitting and settling never touches floating point.
pub type Cents = i64;

/// Format cents as a plain decimal string.
/// Example: 1250 -> "12.50", -7 -> "-0.07"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Format cents with a currency symbol in front of the digits.
/// Example: (-1250, "$") -> "-$12.50"
pub fn format_money(cents: Cents, symbol: &str) -> String {
    let plain = format_cents(cents.abs());
    if cents < 0 {
        format!("-{}{}", symbol, plain)
    } else {
        format!("{}{}", symbol, plain)
    }
}

/// Parse a decimal amount such as "20", "12.5" or ".99" into cents.
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, fraction_str) = match digits.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (digits, ""),
    };

    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !fraction_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    let mut fraction: i64 = 0;
    for (position, c) in fraction_str.chars().take(2).enumerate() {
        let digit = i64::from(c as u8 - b'0');
        fraction += if position == 0 { digit * 10 } else { digit };
    }

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

/// Divide `amount` into `parts` equal shares that add back up to `amount`.
///
/// The `amount % parts` leftover cents go one each to the leading shares,
/// so the first shares are at most one cent larger than the rest.
pub fn split_evenly(amount: Cents, parts: usize) -> Vec<Cents> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = amount / n;
    let leftover = (amount % n) as usize;

    (0..parts)
        .map(|i| if i < leftover { base + 1 } else { base })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}
