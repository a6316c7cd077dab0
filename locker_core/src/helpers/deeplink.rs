/// Builds a `ton://transfer` deep link that prefills a transfer of `amount`
/// nanotons to `address` with the given text comment. The address must
/// already be in the network-correct user-friendly form.
pub fn transfer_link(address: &str, amount: u128, comment: &str) -> String {
    format!(
        "ton://transfer/{}?amount={}&text={}",
        address,
        amount,
        urlencoding::encode(comment)
    )
}
