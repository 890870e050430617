//! Heuristic splitting of free-text Brazilian addresses
//!
//! Listing pages show addresses such as
//! `"Rua Augusta, 123 - Consolação, São Paulo - SP"` or, when the street is
//! hidden by the advertiser, just `"Consolação, São Paulo - SP"`. The parser
//! never fails: anything it cannot place is left absent.

use crate::models::AddressComponents;

/// Words that mark the first segment as a street line
const STREET_KEYWORDS: &[&str] = &[
    "rua", "r.", "avenida", "av.", "av", "praça", "praca", "travessa", "tv.", "alameda", "al.",
    "rodovia", "rod.", "estrada", "est.", "largo",
];

/// Parses an address string into its components
///
/// # Examples
///
/// ```
/// use listing_crawler::parse_address;
///
/// let parts = parse_address("Rua Augusta, 123 - Consolação, São Paulo - SP");
/// assert_eq!(parts.logradouro.as_deref(), Some("Rua Augusta"));
/// assert_eq!(parts.numero.as_deref(), Some("123"));
/// assert_eq!(parts.uf.as_deref(), Some("SP"));
/// ```
pub fn parse_address(raw: &str) -> AddressComponents {
    let raw = raw.trim();
    if raw.is_empty() {
        return AddressComponents::default();
    }

    let mut segments: Vec<&str> = raw.split('-').map(str::trim).collect();

    let mut uf = None;
    if let Some(last) = segments.last() {
        if last.chars().count() == 2 && last.chars().all(|c| c.is_ascii_alphabetic()) {
            uf = Some(last.to_uppercase());
            segments.pop();
        }
    }

    let mut logradouro = None;
    let mut numero = None;
    let mut bairro = None;
    let mut municipio = None;

    if let Some(first) = segments.first().copied() {
        let second = segments.get(1).copied();

        if is_street_line(first) {
            let (street, number) = split_street(first);
            logradouro = street;
            numero = number;

            if let Some(second) = second {
                let tokens = comma_tokens(second);
                match tokens.as_slice() {
                    [] => {}
                    [only] => {
                        if only.split_whitespace().count() <= 3 {
                            bairro = Some(only.to_string());
                        } else {
                            municipio = Some(only.to_string());
                        }
                    }
                    [first, second, ..] => {
                        bairro = Some(first.to_string());
                        municipio = Some(second.to_string());
                    }
                }
            }
        } else {
            let tokens = comma_tokens(first);
            bairro = tokens.first().map(|t| t.to_string());
            municipio = tokens.get(1).map(|t| t.to_string());

            if municipio.is_none() {
                if let Some(second) = second {
                    municipio = comma_tokens(second).last().map(|t| t.to_string());
                }
            }
        }
    }

    if municipio.is_none() {
        let combined = segments.join(", ");
        let tokens = comma_tokens(&combined);
        if tokens.len() >= 2 {
            municipio = tokens.last().map(|t| t.to_string());
            if bairro.is_none() && tokens.len() >= 3 {
                bairro = Some(tokens[tokens.len() - 2].to_string());
            }
        }
    }

    AddressComponents {
        logradouro: non_blank(logradouro),
        numero: non_blank(numero),
        bairro: non_blank(bairro),
        municipio: non_blank(municipio),
        uf: non_blank(uf),
    }
}

fn is_street_line(segment: &str) -> bool {
    if segment.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    let lower = segment.to_lowercase();
    lower
        .split(|c: char| c.is_whitespace() || c == ',')
        .any(|word| STREET_KEYWORDS.contains(&word))
}

/// Splits `"Rua X, 12"` or `"Rua X 12"` into street and number
fn split_street(segment: &str) -> (Option<String>, Option<String>) {
    let tokens = comma_tokens(segment);
    if tokens.len() >= 2 {
        if let Some(last) = tokens.last() {
            if last.chars().any(|c| c.is_ascii_digit()) {
                let street = tokens[..tokens.len() - 1].join(", ");
                return (Some(street), Some(last.to_string()));
            }
        }
    }

    if let Some(split_at) = segment.rfind(|c: char| c.is_whitespace() || c == ',') {
        let (head, tail) = segment.split_at(split_at);
        let tail = tail.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        let head = head.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
        if looks_like_house_number(tail) {
            return (Some(head.to_string()), Some(tail.to_string()));
        }
    }

    (Some(segment.to_string()), None)
}

/// `12`, `12A`, `12/14`: starts with a digit, then word characters or `/`
fn looks_like_house_number(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => chars.all(|c| c.is_alphanumeric() || c == '_' || c == '/'),
        _ => false,
    }
}

fn comma_tokens(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address() {
        let parts = parse_address("Rua Augusta, 123 - Consolação, São Paulo - SP");
        assert_eq!(parts.logradouro.as_deref(), Some("Rua Augusta"));
        assert_eq!(parts.numero.as_deref(), Some("123"));
        assert_eq!(parts.bairro.as_deref(), Some("Consolação"));
        assert_eq!(parts.municipio.as_deref(), Some("São Paulo"));
        assert_eq!(parts.uf.as_deref(), Some("SP"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_address(""), AddressComponents::default());
        assert_eq!(parse_address("   "), AddressComponents::default());
    }

    #[test]
    fn test_neighborhood_first() {
        let parts = parse_address("Consolação, São Paulo - SP");
        assert_eq!(parts.logradouro, None);
        assert_eq!(parts.numero, None);
        assert_eq!(parts.bairro.as_deref(), Some("Consolação"));
        assert_eq!(parts.municipio.as_deref(), Some("São Paulo"));
        assert_eq!(parts.uf.as_deref(), Some("SP"));
    }

    #[test]
    fn test_neighborhood_then_city_segment() {
        let parts = parse_address("Moema - São Paulo - SP");
        assert_eq!(parts.bairro.as_deref(), Some("Moema"));
        assert_eq!(parts.municipio.as_deref(), Some("São Paulo"));
    }

    #[test]
    fn test_trailing_number_without_comma() {
        let parts = parse_address("Avenida Paulista 1578 - Bela Vista, São Paulo - SP");
        assert_eq!(parts.logradouro.as_deref(), Some("Avenida Paulista"));
        assert_eq!(parts.numero.as_deref(), Some("1578"));
        assert_eq!(parts.bairro.as_deref(), Some("Bela Vista"));
    }

    #[test]
    fn test_street_without_number() {
        let parts = parse_address("Rua das Flores - Centro, Curitiba - PR");
        assert_eq!(parts.logradouro.as_deref(), Some("Rua das Flores"));
        assert_eq!(parts.numero, None);
        assert_eq!(parts.bairro.as_deref(), Some("Centro"));
        assert_eq!(parts.municipio.as_deref(), Some("Curitiba"));
        assert_eq!(parts.uf.as_deref(), Some("PR"));
    }

    #[test]
    fn test_single_long_token_is_city() {
        let parts = parse_address("Rua A, 10 - Sao Jose dos Campos Norte");
        assert_eq!(parts.bairro, None);
        assert_eq!(parts.municipio.as_deref(), Some("Sao Jose dos Campos Norte"));
    }

    #[test]
    fn test_lowercase_uf_is_normalized() {
        let parts = parse_address("Centro, Campinas - sp");
        assert_eq!(parts.uf.as_deref(), Some("SP"));
    }

    #[test]
    fn test_number_without_street_name() {
        let parts = parse_address(", 12 - Centro, Campinas - SP");
        assert_eq!(parts.logradouro, None);
        assert_eq!(parts.numero.as_deref(), Some("12"));
        assert_eq!(parts.bairro.as_deref(), Some("Centro"));
        assert_eq!(parts.municipio.as_deref(), Some("Campinas"));
    }

    #[test]
    fn test_lone_state_code() {
        let parts = parse_address("SP");
        assert_eq!(parts.uf.as_deref(), Some("SP"));
        assert_eq!(parts.bairro, None);
        assert_eq!(parts.municipio, None);
    }

    #[test]
    fn test_comma_fallback_for_city() {
        let parts = parse_address("Rua X, 5, Jardins, São Paulo");
        assert_eq!(parts.logradouro.as_deref(), Some("Rua X, 5, Jardins, São Paulo"));
        assert_eq!(parts.numero, None);
        assert_eq!(parts.municipio.as_deref(), Some("São Paulo"));
        assert_eq!(parts.bairro.as_deref(), Some("Jardins"));
    }

    #[test]
    fn test_malformed_inputs_never_panic() {
        let inputs = [
            "-",
            "--",
            " - - ",
            ",,,",
            "- SP",
            "123",
            "Rua",
            "ç-ã-é",
            ", - , - ,",
            "Av. 9 de Julho, - , -",
            "🏠 - 🏢",
        ];
        for input in inputs {
            let parts = parse_address(input);
            for field in [
                &parts.logradouro,
                &parts.numero,
                &parts.bairro,
                &parts.municipio,
                &parts.uf,
            ] {
                if let Some(value) = field {
                    assert!(!value.trim().is_empty(), "blank field for {input:?}");
                }
            }
        }
    }
}
