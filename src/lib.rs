pub mod app;
#[cfg(feature = "cliapp")]
pub mod cmd;
pub mod note;
pub mod peripheral;
pub mod portfolio;
pub mod tickers;
pub mod tracing;
pub mod util;

extern crate lazy_static;

#[cfg(any(test, feature = "testlib"))]
pub mod testlib;
