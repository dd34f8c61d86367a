pub mod config;
pub mod core;
pub mod error;
pub mod handlers;
pub mod knowledge_graph;
pub mod templates;
pub mod utils;

pub use config::Configuration;
pub use core::{DocumentTripleBuilder, TabularTripleBuilder};
pub use error::ConversionError;
pub use knowledge_graph::{GraphSink, KnowledgeGraph};
pub use templates::HtmlRenderer;
