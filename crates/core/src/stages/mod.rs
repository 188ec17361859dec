//! The two generative stages. Each owns its collaborators and a config struct that decides
//! what goes into its prompts.

pub mod framework;
pub mod recommendation;

pub use framework::{FrameworkFocus, FrameworkSynthesizer, SynthesizerConfig};
pub use recommendation::{RecommendationConfig, RecommendationEngine, ValuationApproach};
