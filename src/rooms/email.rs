/// Loose `local@domain.tld` shape check. Doesn't try to be RFC 5322.
pub fn looks_like_email(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = address.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Trims and lower-cases every address. Returns every malformed one
/// (as typed, trimmed) if there are any.
pub fn normalize(emails: &[String]) -> Result<Vec<String>, Vec<String>> {
    let mut good = Vec::with_capacity(emails.len());
    let mut bad = Vec::new();

    for email in emails {
        let email = email.trim();
        if looks_like_email(email) {
            good.push(email.to_lowercase());
        } else {
            bad.push(email.to_owned());
        }
    }

    if bad.is_empty() { Ok(good) } else { Err(bad) }
}
