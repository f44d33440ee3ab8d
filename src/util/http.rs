use super::basic::SError;

/// Used to permit multiple http get implementations/libraries.
///
/// async_trait is required to be able to instantiate a Box<dyn HttpRequester>
/// of this. This is because rust doesn't have full native support for
/// returning Futures from traits right now. This is marked ?Send because we
/// only ever drive these from a single-threaded block_on, so the futures do
/// not need to be thread-safe.
#[async_trait::async_trait(?Send)]
pub trait HttpRequester {
    async fn get(&self, url: &str) -> Result<String, SError>;
}

#[cfg(feature = "http_standalone")]
pub mod standalone {
    use crate::util::basic::SError;

    use super::HttpRequester;

    pub struct StandaloneAppRequester;

    impl StandaloneAppRequester {
        pub fn new() -> StandaloneAppRequester {
            StandaloneAppRequester {}
        }

        pub fn new_boxed() -> Box<StandaloneAppRequester> {
            Box::new(StandaloneAppRequester::new())
        }
    }

    #[async_trait::async_trait(?Send)]
    impl HttpRequester for StandaloneAppRequester {
        async fn get(&self, url: &str) -> Result<String, SError> {
            // Use surf, because it has no dependence on tokio, so
            // we can simply run this under async_std::task::block_on
            // rather than the entirety of main needing a tokio runtime.
            let body_text =
                surf::get(url).recv_string().await.map_err(|e| format!("{}", e))?;
            Ok(body_text)
        }
    }
}

pub mod pub_testlib {
    use std::collections::HashMap;

    use crate::util::basic::SError;
    use crate::util::rc::RcRefCell;

    use super::HttpRequester;

    pub struct MockHttpRequester {
        pub responses: RcRefCell<HashMap<String, Result<String, SError>>>,
        pub requested_urls: RcRefCell<Vec<String>>,
    }

    #[async_trait::async_trait(?Send)]
    impl HttpRequester for MockHttpRequester {
        async fn get(&self, url: &str) -> Result<String, SError> {
            self.requested_urls.borrow_mut().push(url.to_string());
            match self.responses.borrow().get(url) {
                Some(r) => r.clone(),
                None => Err(format!("No mock response set for {}", url)),
            }
        }
    }
}
