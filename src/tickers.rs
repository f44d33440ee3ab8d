pub mod discovery;
pub mod mapping_store;
pub mod prompt;
pub mod resolver;

pub type Error = String;

// Exports
pub use self::discovery::{RemoteTickerDiscoverer, TickerDiscoverer};
pub use self::mapping_store::{
    CsvMappingStore, InMemoryMappingStore, MappingStore,
};
pub use self::prompt::{
    NonInteractiveTickerPrompt, PromptContext, PromptResponse,
    StdioTickerPrompt, TickerPrompt,
};
pub use self::resolver::{normalize_name, TickerResolver};
