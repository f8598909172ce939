use url::Url;

/// Kenyan country calling code used for outreach links.
const COUNTRY_CODE: &str = "254";

/// Normalizes a stored contact number for deep links: strips everything
/// that is not a digit, swaps a leading trunk `0` for the country code,
/// and prepends the country code when it is missing entirely.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        return format!("{COUNTRY_CODE}{rest}");
    }
    if !digits.starts_with(COUNTRY_CODE) {
        return format!("{COUNTRY_CODE}{digits}");
    }
    digits
}

/// Strict check for the booking form: a WhatsApp number must be entered
/// as 2547XXXXXXXX.
pub fn is_valid_whatsapp(s: &str) -> bool {
    s.len() == 12 && s.starts_with("2547") && s.chars().all(|c| c.is_ascii_digit())
}

/// Registration accepts any Kenyan mobile/landline given as 254XXXXXXXXX.
pub fn is_valid_phone(s: &str) -> bool {
    s.len() == 12 && s.starts_with(COUNTRY_CODE) && s.chars().all(|c| c.is_ascii_digit())
}

/// Builds a `wa.me` chat-composer link with a prefilled message.
pub fn whatsapp_link(phone: &str, text: &str) -> Option<Url> {
    let base = format!("https://wa.me/{}", normalize(phone));
    Url::parse_with_params(&base, &[("text", text)]).ok()
}

/// Dialer deep link. Telegram only attaches http(s) URLs to buttons, so
/// this is rendered inline in message text where clients make it tappable.
pub fn dial_link(phone: &str) -> String {
    format!("tel:+{}", normalize(phone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trunk_zero_becomes_country_code() {
        assert_eq!(normalize("0712345678"), "254712345678");
    }

    #[test]
    fn bare_subscriber_number_gets_country_code() {
        assert_eq!(normalize("712345678"), "254712345678");
    }

    #[test]
    fn already_normalized_is_unchanged() {
        assert_eq!(normalize("254712345678"), "254712345678");
    }

    #[test]
    fn punctuation_and_spaces_are_stripped() {
        assert_eq!(normalize("+254 712-345 678"), "254712345678");
        assert_eq!(normalize("0712 345 678"), "254712345678");
    }

    #[test]
    fn whatsapp_validation_is_strict() {
        assert!(is_valid_whatsapp("254712345678"));
        assert!(!is_valid_whatsapp("254112345678")); // not a 7xx mobile
        assert!(!is_valid_whatsapp("0712345678"));
        assert!(!is_valid_whatsapp("25471234567"));
        assert!(!is_valid_whatsapp("2547123456789"));
        assert!(!is_valid_whatsapp("25471234567a"));
    }

    #[test]
    fn phone_validation_accepts_non_mobile_prefixes() {
        assert!(is_valid_phone("254112345678"));
        assert!(is_valid_phone("254712345678"));
        assert!(!is_valid_phone("712345678"));
    }

    #[test]
    fn whatsapp_link_encodes_message() {
        let url = whatsapp_link("0712345678", "Hello Jane, see you at 10:00").unwrap();
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/254712345678");
        assert!(url.query().unwrap().contains("Hello"));
        assert!(!url.query().unwrap().contains(' '));
    }

    #[test]
    fn dial_link_uses_plus_prefix() {
        assert_eq!(dial_link("0712345678"), "tel:+254712345678");
    }
}
