use json::JsonValue;

use crate::util::http::HttpRequester;

use super::Error;

/// An external lookup service that may know the symbol for an instrument
/// name. Ok(None) means the service had no answer, which is a routine miss,
/// not an error.
pub trait TickerDiscoverer {
    fn discover(&mut self, raw_name: &str) -> Result<Option<String>, Error>;
}

fn get_discovery_url(raw_name: &str) -> String {
    // brapi's quote list endpoint does a fuzzy search over B3 listings.
    format!(
        "https://brapi.dev/api/quote/list?search={}&limit=1",
        url_encode(raw_name)
    )
}

fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                out.push(c)
            }
            ' ' => out.push('+'),
            _ => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).as_bytes() {
                    out += &format!("%{:02X}", b);
                }
            }
        }
    }
    out
}

fn json_value_to_string(jv: &JsonValue) -> Option<&str> {
    match jv {
        JsonValue::Short(v) => Some(v.as_str()),
        JsonValue::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Pulls the first symbol out of a discovery response.
///
/// Response schema:
/// {
///    "stocks": [
///      { "stock": <symbol: string>, "name": <string>, ... }
///    ]
/// }
fn parse_discovery_json(json_str: &str) -> Result<Option<String>, Error> {
    let fmt_err =
        |s: &str| -> Error { format!("Error parsing discovery response: {}", s) };

    let json_obj = json::parse(json_str).map_err(|e| fmt_err(&e.to_string()))?;

    let stocks = match &json_obj {
        JsonValue::Object(o) => match o.get("stocks") {
            Some(stocks) => stocks,
            None => return Err(fmt_err("Did not find 'stocks'")),
        },
        _ => return Err(fmt_err("Root was not of type object")),
    };

    for v in stocks.members() {
        let entry = match v {
            JsonValue::Object(o) => o,
            v => {
                return Err(fmt_err(&format!(
                    "Non-object found in stocks: {}",
                    v
                )));
            }
        };
        match entry.get("stock").and_then(json_value_to_string) {
            Some(sym) if !sym.trim().is_empty() => {
                return Ok(Some(sym.trim().to_string()));
            }
            _ => continue,
        }
    }
    Ok(None)
}

pub struct RemoteTickerDiscoverer {
    requester: Box<dyn HttpRequester>,
}

impl RemoteTickerDiscoverer {
    pub fn new(requester: Box<dyn HttpRequester>) -> RemoteTickerDiscoverer {
        RemoteTickerDiscoverer { requester }
    }
}

impl TickerDiscoverer for RemoteTickerDiscoverer {
    fn discover(&mut self, raw_name: &str) -> Result<Option<String>, Error> {
        let url = get_discovery_url(raw_name);
        tracing::debug!(url = url.as_str(), "RemoteTickerDiscoverer::discover");
        let body = async_std::task::block_on(self.requester.get(&url))
            .map_err(|e| format!("Error looking up \"{}\": {}", raw_name, e))?;
        parse_discovery_json(&body)
    }
}

// Ideally this would be marked as cfg(test), but integration tests also
// need access, so it cannot be test-only for it to be reachable there.
pub mod pub_testlib {
    use std::collections::HashMap;

    use crate::util::rc::RcRefCell;

    use super::{Error, TickerDiscoverer};

    pub struct MockTickerDiscoverer {
        pub answers: RcRefCell<HashMap<String, String>>,
        pub lookups: RcRefCell<Vec<String>>,
    }

    impl TickerDiscoverer for MockTickerDiscoverer {
        fn discover(&mut self, raw_name: &str) -> Result<Option<String>, Error> {
            tracing::trace!(
                name = raw_name,
                "MockTickerDiscoverer::discover"
            );
            self.lookups.borrow_mut().push(raw_name.to_string());
            Ok(self.answers.borrow().get(raw_name).cloned())
        }
    }

    /// Always errors, for exercising the resolver's miss-and-continue path.
    pub struct FailingTickerDiscoverer;

    impl TickerDiscoverer for FailingTickerDiscoverer {
        fn discover(&mut self, _raw_name: &str) -> Result<Option<String>, Error> {
            Err("discovery service unreachable".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testlib::assert_re;

    use super::{get_discovery_url, parse_discovery_json, url_encode};

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("PETROBRAS PN N2"), "PETROBRAS+PN+N2");
        assert_eq!(url_encode("AÇÚCAR"), "A%C3%87%C3%9ACAR");
    }

    #[test]
    fn test_get_discovery_url() {
        assert_eq!(
            get_discovery_url("VALE ON NM"),
            "https://brapi.dev/api/quote/list?search=VALE+ON+NM&limit=1"
        );
    }

    #[test]
    fn test_parse_ok() {
        let sym = parse_discovery_json(
            "{ \"stocks\": [ { \"stock\": \"PETR4\", \"name\": \"PETROBRAS\" } ] }",
        )
        .unwrap();
        assert_eq!(sym, Some("PETR4".to_string()));

        // Empty result set
        let sym = parse_discovery_json("{ \"stocks\": [] }").unwrap();
        assert_eq!(sym, None);

        // Entry with a blank symbol is skipped
        let sym = parse_discovery_json(
            "{ \"stocks\": [ { \"stock\": \"\" }, { \"stock\": \"VALE3\" } ] }",
        )
        .unwrap();
        assert_eq!(sym, Some("VALE3".to_string()));
    }

    #[test]
    fn test_parse_err() {
        let e = parse_discovery_json("{").unwrap_err();
        assert_re("^Error parsing discovery response:", &e);

        let e = parse_discovery_json("[]").unwrap_err();
        assert_re("Root was not of type object", &e);

        let e = parse_discovery_json("{ \"other\": [] }").unwrap_err();
        assert_re("Did not find 'stocks'", &e);

        let e = parse_discovery_json("{ \"stocks\": [ 1234 ] }").unwrap_err();
        assert_re("Non-object found in stocks", &e);
    }
}
