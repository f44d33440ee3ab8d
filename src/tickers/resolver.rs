use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::{debug, trace, warn};

use crate::util::rw::WriteHandle;
use crate::write_errln;

use super::{
    Error, MappingStore, PromptContext, PromptResponse, TickerDiscoverer,
    TickerPrompt,
};

/// The cache key: repeated whitespace collapsed, upper-cased.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ").to_uppercase()
}

// Share-class codes and listing/corporate-event tags that instrument names
// carry as trailing tokens. Two renderings of the same instrument routinely
// differ only in these.
const TRAILING_CLASS_CODES: &[&str] = &[
    "ON", "PN", "PNA", "PNB", "UNT", "CI", "DRN", "DR1", "DR2", "DR3", "NM",
    "N1", "N2", "MA", "MB", "EJ", "ED", "EX", "ER", "EDJ", "ATZ", "INT",
];

const TRAILING_GENERIC_SUFFIXES: &[&str] = &["S.A.", "S.A", "S/A", "SA"];

fn strip_trailing_tokens(normalized: &str, tokens: &[&str]) -> String {
    let mut parts: Vec<&str> = normalized.split(' ').collect();
    while parts.len() > 1 && tokens.contains(parts.last().unwrap()) {
        parts.pop();
    }
    parts.join(" ")
}

pub fn strip_trailing_class_codes(normalized: &str) -> String {
    strip_trailing_tokens(normalized, TRAILING_CLASS_CODES)
}

pub fn strip_trailing_generic_suffix(normalized: &str) -> String {
    strip_trailing_tokens(normalized, TRAILING_GENERIC_SUFFIXES)
}

lazy_static! {
    // The B3 symbol shape: four letters, one or two digits, optionally the
    // fractional-market F.
    static ref EMBEDDED_SYMBOL_RE: regex::Regex =
        regex::Regex::new(r"[A-Z]{4}\d{1,2}F?").unwrap();
}

/// Searches a normalized name for an embedded symbol-shaped token. Only a
/// standalone word counts; a symbol-shaped run inside a longer token does
/// not.
pub fn find_embedded_symbol(normalized: &str) -> Option<String> {
    for m in EMBEDDED_SYMBOL_RE.find_iter(normalized) {
        let starts_word =
            m.start() == 0 || normalized[..m.start()].ends_with(' ');
        let ends_word =
            m.end() == normalized.len() || normalized[m.end()..].starts_with(' ');
        if starts_word && ends_word {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// Resolves raw instrument names to market symbols through a chained
/// strategy: session cache, embedded-symbol inference, remote discovery,
/// then interactive disambiguation. Each step runs only if the previous
/// one missed, and anything learned is written through to the store so a
/// name is never resolved twice.
pub struct TickerResolver {
    store: Box<dyn MappingStore>,
    discoverer: Option<Box<dyn TickerDiscoverer>>,
    prompt: Box<dyn TickerPrompt>,
    err_stream: WriteHandle,

    cache: HashMap<String, String>,
}

impl TickerResolver {
    pub fn new(
        mut store: Box<dyn MappingStore>,
        discoverer: Option<Box<dyn TickerDiscoverer>>,
        prompt: Box<dyn TickerPrompt>,
        err_stream: WriteHandle,
    ) -> TickerResolver {
        let mut err_stream = err_stream;
        // A failed load is not fatal. We just start from nothing and
        // re-learn, the same as a first run.
        let cache = match store.load_all() {
            Ok(mappings) => {
                debug!(
                    "TickerResolver seeded with {} mappings",
                    mappings.len()
                );
                mappings
            }
            Err(e) => {
                warn!("TickerResolver could not load mappings: {}", e);
                write_errln!(
                    err_stream,
                    "Could not load saved ticker mappings: {}",
                    e
                );
                HashMap::new()
            }
        };
        TickerResolver { store, discoverer, prompt, err_stream, cache }
    }

    pub fn cached_symbol(&self, raw_name: &str) -> Option<String> {
        self.cache.get(&normalize_name(raw_name)).cloned()
    }

    /// Ok(None) means the user cancelled; the caller records a skip.
    pub fn resolve(
        &mut self,
        raw_name: &str,
        context: &PromptContext,
    ) -> Result<Option<String>, Error> {
        let normalized = normalize_name(raw_name);

        if let Some(symbol) = self.cache.get(&normalized) {
            trace!(name = normalized.as_str(), "resolve: cache hit");
            return Ok(Some(symbol.clone()));
        }

        if let Some(symbol) = find_embedded_symbol(&normalized) {
            debug!(
                name = normalized.as_str(),
                symbol = symbol.as_str(),
                "resolve: inferred embedded symbol"
            );
            self.learn(&normalized, &symbol);
            return Ok(Some(symbol));
        }

        if let Some(discoverer) = &mut self.discoverer {
            match discoverer.discover(raw_name) {
                Ok(Some(symbol)) => {
                    let symbol = symbol.to_uppercase();
                    debug!(
                        name = normalized.as_str(),
                        symbol = symbol.as_str(),
                        "resolve: discovered remotely"
                    );
                    self.learn(&normalized, &symbol);
                    return Ok(Some(symbol));
                }
                Ok(None) => {
                    trace!(name = normalized.as_str(), "resolve: discovery miss");
                }
                Err(e) => {
                    // The prompt below still gives the user a way through.
                    warn!("resolve: discovery failed: {}", e);
                    write_errln!(
                        self.err_stream,
                        "Ticker discovery for \"{}\" failed: {}",
                        raw_name,
                        e
                    );
                }
            }
        }

        match self.prompt.prompt(raw_name, context)? {
            PromptResponse::Symbol(symbol) => {
                let symbol = symbol.to_uppercase();
                self.learn(&normalized, &symbol);
                Ok(Some(symbol))
            }
            PromptResponse::Cancelled => {
                debug!(name = normalized.as_str(), "resolve: cancelled");
                Ok(None)
            }
        }
    }

    // Writes the mapping under the name and its derived variants, so
    // superficially different renderings of the same instrument resolve
    // identically from here on without re-prompting.
    fn learn(&mut self, normalized: &str, symbol: &str) {
        let mut names = vec![normalized.to_string()];
        let without_class = strip_trailing_class_codes(normalized);
        if !names.contains(&without_class) {
            names.push(without_class.clone());
        }
        let without_suffix = strip_trailing_generic_suffix(&without_class);
        if !names.contains(&without_suffix) {
            names.push(without_suffix);
        }

        for name in names {
            self.cache.insert(name.clone(), symbol.to_string());
            if let Err(e) = self.store.save(&name, symbol) {
                // Keep the in-session mapping and move on.
                warn!("failed to persist mapping {} -> {}: {}", name, symbol, e);
                write_errln!(
                    self.err_stream,
                    "Failed to save ticker mapping \"{}\": {}",
                    name,
                    e
                );
            }
        }
    }
}

// MARK: tests

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};

    use rust_decimal_macros::dec;

    use crate::note::model::TradeSide;
    use crate::tickers::discovery::pub_testlib::{
        FailingTickerDiscoverer, MockTickerDiscoverer,
    };
    use crate::tickers::prompt::pub_testlib::ScriptedTickerPrompt;
    use crate::tickers::{InMemoryMappingStore, PromptContext, PromptResponse};
    use crate::util::rc::{RcRefCell, RcRefCellT};
    use crate::util::rw::WriteHandle;

    use super::{
        find_embedded_symbol, normalize_name, strip_trailing_class_codes,
        strip_trailing_generic_suffix, TickerResolver,
    };

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Petrobras   pn  n2 "), "PETROBRAS PN N2");
        assert_eq!(normalize_name("VALE ON NM"), "VALE ON NM");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_strip_trailing_class_codes() {
        assert_eq!(strip_trailing_class_codes("PETROBRAS PN N2"), "PETROBRAS");
        assert_eq!(strip_trailing_class_codes("VALE ON NM"), "VALE");
        assert_eq!(strip_trailing_class_codes("ALUPAR UNT N2"), "ALUPAR");
        assert_eq!(strip_trailing_class_codes("FII CSHG LOG CI"), "FII CSHG LOG");
        assert_eq!(strip_trailing_class_codes("PETROBRAS"), "PETROBRAS");
        // Never strips down to nothing
        assert_eq!(strip_trailing_class_codes("ON"), "ON");
    }

    #[test]
    fn test_strip_trailing_generic_suffix() {
        assert_eq!(strip_trailing_generic_suffix("WEG SA"), "WEG");
        assert_eq!(strip_trailing_generic_suffix("GERDAU S.A."), "GERDAU");
        assert_eq!(strip_trailing_generic_suffix("GERDAU MET"), "GERDAU MET");
    }

    #[test]
    fn test_find_embedded_symbol() {
        assert_eq!(
            find_embedded_symbol("ACOES PETR4 PN"),
            Some("PETR4".to_string())
        );
        assert_eq!(find_embedded_symbol("SANB11"), Some("SANB11".to_string()));
        assert_eq!(find_embedded_symbol("PETR4F"), Some("PETR4F".to_string()));
        // Embedded in a longer token does not count
        assert_eq!(find_embedded_symbol("XPETR4"), None);
        assert_eq!(find_embedded_symbol("PETR4X"), None);
        assert_eq!(find_embedded_symbol("PETROBRAS PN N2"), None);
    }

    fn ctx() -> PromptContext {
        PromptContext {
            side: TradeSide::Buy,
            quantity: dec!(100),
            price: dec!(28.50),
            sequence: 1,
        }
    }

    struct TestResolver {
        resolver: TickerResolver,
        store_mappings: RcRefCell<HashMap<String, String>>,
        prompt_responses: RcRefCell<VecDeque<PromptResponse>>,
        prompt_asked: RcRefCell<Vec<String>>,
        discovery_lookups: RcRefCell<Vec<String>>,
    }

    fn new_test_resolver(
        seed: &[(&str, &str)],
        discovery_answers: &[(&str, &str)],
    ) -> TestResolver {
        let store_mappings = RcRefCellT::new(HashMap::from_iter(
            seed.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        ));
        let answers = RcRefCellT::new(HashMap::from_iter(
            discovery_answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        ));
        let prompt_responses = RcRefCellT::new(VecDeque::new());
        let prompt_asked = RcRefCellT::new(Vec::new());
        let discovery_lookups = RcRefCellT::new(Vec::new());

        let resolver = TickerResolver::new(
            Box::new(InMemoryMappingStore::new(store_mappings.clone())),
            Some(Box::new(MockTickerDiscoverer {
                answers,
                lookups: discovery_lookups.clone(),
            })),
            Box::new(ScriptedTickerPrompt {
                responses: prompt_responses.clone(),
                asked: prompt_asked.clone(),
            }),
            WriteHandle::empty_write_handle(),
        );

        TestResolver {
            resolver,
            store_mappings,
            prompt_responses,
            prompt_asked,
            discovery_lookups,
        }
    }

    #[test]
    fn test_cache_lookup_from_seeded_store() {
        let mut t = new_test_resolver(&[("PETROBRAS PN N2", "PETR4")], &[]);
        let sym = t.resolver.resolve("Petrobras  PN N2", &ctx()).unwrap();
        assert_eq!(sym, Some("PETR4".to_string()));
        // Nothing further was consulted
        assert!(t.discovery_lookups.borrow().is_empty());
        assert!(t.prompt_asked.borrow().is_empty());
    }

    #[test]
    fn test_pattern_inference_and_variant_persistence() {
        let mut t = new_test_resolver(&[], &[]);
        let sym = t.resolver.resolve("ACOES PETR4 PN", &ctx()).unwrap();
        assert_eq!(sym, Some("PETR4".to_string()));

        // Persisted under the original name and the class-stripped variant.
        let store = t.store_mappings.borrow();
        assert_eq!(store.get("ACOES PETR4 PN").unwrap(), "PETR4");
        assert_eq!(store.get("ACOES PETR4").unwrap(), "PETR4");
    }

    #[test]
    fn test_remote_discovery() {
        let mut t =
            new_test_resolver(&[], &[("PETROBRAS PN N2", "PETR4")]);
        let sym = t.resolver.resolve("PETROBRAS PN N2", &ctx()).unwrap();
        assert_eq!(sym, Some("PETR4".to_string()));
        assert_eq!(
            *t.discovery_lookups.borrow(),
            vec!["PETROBRAS PN N2".to_string()]
        );
        assert!(t.prompt_asked.borrow().is_empty());
        // Variants persisted
        assert_eq!(
            t.store_mappings.borrow().get("PETROBRAS").unwrap(),
            "PETR4"
        );
    }

    #[test]
    fn test_prompt_fallback_and_cancellation() {
        let mut t = new_test_resolver(&[], &[]);
        t.prompt_responses
            .borrow_mut()
            .push_back(PromptResponse::Symbol("vale3".to_string()));
        t.prompt_responses.borrow_mut().push_back(PromptResponse::Cancelled);

        // Prompt answers
        let sym = t.resolver.resolve("VALE DO RIO DOCE ON", &ctx()).unwrap();
        assert_eq!(sym, Some("VALE3".to_string()));

        // Prompt cancels: not an error, just no symbol
        let sym = t.resolver.resolve("MYSTERY COMPANY ON", &ctx()).unwrap();
        assert_eq!(sym, None);
        assert_eq!(t.prompt_asked.borrow().len(), 2);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut t = new_test_resolver(&[], &[]);
        t.prompt_responses
            .borrow_mut()
            .push_back(PromptResponse::Symbol("VALE3".to_string()));

        let first = t.resolver.resolve("VALE DO RIO DOCE ON", &ctx()).unwrap();
        // Re-resolving must hit the cache; the scripted prompt has no
        // responses left and would error if asked again.
        let second = t.resolver.resolve("VALE DO RIO DOCE ON", &ctx()).unwrap();
        assert_eq!(first, second);
        assert_eq!(t.prompt_asked.borrow().len(), 1);
        assert_eq!(t.discovery_lookups.borrow().len(), 1);
    }

    #[test]
    fn test_variant_rendering_resolves_without_reprompting() {
        let mut t = new_test_resolver(&[], &[]);
        t.prompt_responses
            .borrow_mut()
            .push_back(PromptResponse::Symbol("PETR4".to_string()));

        let first = t.resolver.resolve("PETROBRAS PN N2", &ctx()).unwrap();
        assert_eq!(first, Some("PETR4".to_string()));
        // A different rendering of the same instrument (no class codes)
        // hits the persisted variant.
        let second = t.resolver.resolve("PETROBRAS", &ctx()).unwrap();
        assert_eq!(second, Some("PETR4".to_string()));
        assert_eq!(t.prompt_asked.borrow().len(), 1);
    }

    #[test]
    fn test_discovery_failure_falls_through_to_prompt() {
        let prompt_responses = RcRefCellT::new(VecDeque::from(vec![
            PromptResponse::Symbol("WEGE3".to_string()),
        ]));
        let prompt_asked = RcRefCellT::new(Vec::new());
        let (err_w, err_buff) = WriteHandle::string_buff_write_handle();

        let mut resolver = TickerResolver::new(
            Box::new(InMemoryMappingStore::new(RcRefCellT::new(HashMap::new()))),
            Some(Box::new(FailingTickerDiscoverer {})),
            Box::new(ScriptedTickerPrompt {
                responses: prompt_responses,
                asked: prompt_asked.clone(),
            }),
            err_w,
        );

        let sym = resolver.resolve("WEG ON NM", &ctx()).unwrap();
        assert_eq!(sym, Some("WEGE3".to_string()));
        assert_eq!(prompt_asked.borrow().len(), 1);
        crate::testlib::assert_re(
            "Ticker discovery for \"WEG ON NM\" failed",
            err_buff.borrow().as_str(),
        );
    }

    #[test]
    fn test_no_discoverer_configured() {
        let prompt_responses = RcRefCellT::new(VecDeque::from(vec![
            PromptResponse::Cancelled,
        ]));
        let mut resolver = TickerResolver::new(
            Box::new(InMemoryMappingStore::new(RcRefCellT::new(HashMap::new()))),
            None,
            Box::new(ScriptedTickerPrompt {
                responses: prompt_responses,
                asked: RcRefCellT::new(Vec::new()),
            }),
            WriteHandle::empty_write_handle(),
        );
        assert_eq!(resolver.resolve("UNKNOWN CO ON", &ctx()).unwrap(), None);
    }

    struct FailingStore;
    impl crate::tickers::MappingStore for FailingStore {
        fn load_all(
            &mut self,
        ) -> Result<HashMap<String, String>, crate::tickers::Error> {
            Err("store offline".to_string())
        }
        fn save(
            &mut self,
            _normalized_name: &str,
            _symbol: &str,
        ) -> Result<(), crate::tickers::Error> {
            Err("store offline".to_string())
        }
    }

    #[test]
    fn test_store_failures_are_non_fatal() {
        let (err_w, err_buff) = WriteHandle::string_buff_write_handle();
        let mut resolver = TickerResolver::new(
            Box::new(FailingStore {}),
            None,
            Box::new(ScriptedTickerPrompt {
                responses: RcRefCellT::new(VecDeque::from(vec![
                    PromptResponse::Symbol("PETR4".to_string()),
                ])),
                asked: RcRefCellT::new(Vec::new()),
            }),
            err_w,
        );
        crate::testlib::assert_re(
            "Could not load saved ticker mappings",
            err_buff.borrow().as_str(),
        );

        // Resolution still works; the save failure is logged and the
        // mapping is kept in the session cache.
        let sym = resolver.resolve("PETROBRAS PN", &ctx()).unwrap();
        assert_eq!(sym, Some("PETR4".to_string()));
        crate::testlib::assert_re(
            "Failed to save ticker mapping",
            err_buff.borrow().as_str(),
        );
        assert_eq!(
            resolver.cached_symbol("PETROBRAS PN"),
            Some("PETR4".to_string())
        );
    }
}
