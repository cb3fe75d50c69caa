use tiny_http::Request;

/// Decoded `application/x-www-form-urlencoded` fields, in order.
pub type FormFields = Vec<(String, String)>;

/// Reads and decodes a URL-encoded request body. An unreadable body
/// decodes as no fields.
pub fn read_form(request: &mut Request) -> FormFields {
    let mut body = Vec::new();
    if request.as_reader().read_to_end(&mut body).is_err() {
        return Vec::new();
    }
    parse_form(&body)
}

pub fn parse_form(body: &[u8]) -> FormFields {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// First value for `key`, trimmed.
pub fn form_get<'a>(fields: &'a FormFields, key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plus_and_percent_escapes() {
        let fields = parse_form(b"name=My+model%21&type=regression&name=second");
        assert_eq!(form_get(&fields, "name"), Some("My model!"));
        assert_eq!(form_get(&fields, "type"), Some("regression"));
        assert_eq!(form_get(&fields, "framework"), None);
    }
}
