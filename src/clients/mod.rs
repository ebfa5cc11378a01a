pub mod groq;
pub mod local;
pub mod scripted;
pub mod traits;

pub use groq::GroqEnhancer;
pub use local::LocalGenerator;
pub use scripted::{ScriptedEnhancer, ScriptedGenerator};
pub use traits::{
    Enhancer, EnhancerError, EnhancerStatus, GenerationParams, Generator, GeneratorError,
    ModelStatus,
};
