const NANOTONS_PER_TON: u128 = 1_000_000_000;

/// Formats a nanoton amount with nine decimals, trailing zeros trimmed.
pub fn format_coins(nanotons: u128) -> String {
    let whole = nanotons / NANOTONS_PER_TON;
    let frac = nanotons % NANOTONS_PER_TON;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

pub fn format_ton(nanotons: u128) -> String {
    format!("{} TON", format_coins(nanotons))
}
