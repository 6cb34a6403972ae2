/// Flat late fees in minor units, assessed once on entering `grace_penalty`.
pub const LATE_FEE_USD_MINOR: i64 = 500;
pub const LATE_FEE_LKR_MINOR: i64 = 150_000;

/// LKR tenants pay the LKR fee; every other billing currency is charged the USD amount.
pub fn late_fee_minor(currency: &str) -> i64 {
    if currency.trim().eq_ignore_ascii_case("LKR") {
        LATE_FEE_LKR_MINOR
    } else {
        LATE_FEE_USD_MINOR
    }
}

pub fn format_minor(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub fn is_valid_currency_code(currency: &str) -> bool {
    currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase())
}
