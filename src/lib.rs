pub mod cache;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod enhancer;
pub mod error;
pub mod http;
pub mod parser;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod reports;
pub mod service;

pub use error::{EvaluatorError, Result};
pub use pipeline::MethodUsed;
pub use profile::StartupProfile;
pub use service::EvaluatorService;
