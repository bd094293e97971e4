use actix_web::HttpRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locale {
    En,
    Ru,
}

// Ru unless English is requested
pub fn detect_locale(req: &HttpRequest) -> Locale {
    if let Some(lang) = req.query_string().split('&').find_map(|kv| {
        let mut it = kv.splitn(2, '=');
        let k = it.next()?;
        let v = it.next()?;
        if k == "lang" { Some(v) } else { None }
    }) {
        return match lang.to_ascii_lowercase().as_str() { "en" | "en-us" | "en-gb" => Locale::En, _ => Locale::Ru };
    }

    if let Some(h) = req.headers().get("Accept-Language").and_then(|v| v.to_str().ok()) {
        let hl = h.to_ascii_lowercase();
        if hl.starts_with("en") { return Locale::En; }
    }

    Locale::Ru
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn defaults_to_russian() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(detect_locale(&req), Locale::Ru);
    }

    #[test]
    fn query_parameter_beats_header() {
        let req = TestRequest::with_uri("/api/products?lang=ru")
            .insert_header(("Accept-Language", "en-US,en;q=0.9"))
            .to_http_request();
        assert_eq!(detect_locale(&req), Locale::Ru);

        let req = TestRequest::with_uri("/api/products?foo=1&lang=EN").to_http_request();
        assert_eq!(detect_locale(&req), Locale::En);
    }

    #[test]
    fn english_accept_language() {
        let req = TestRequest::default()
            .insert_header(("Accept-Language", "en-GB"))
            .to_http_request();
        assert_eq!(detect_locale(&req), Locale::En);
    }
}
