// ai module - provider seam, remote http provider, local synthesis and prompts

pub mod api;
pub mod local;
pub mod prompts;
pub mod provider;

// re-export key public items for convenient access
pub use api::{test_api_key, Dispatcher, Generated, GenerationSource, RemoteProvider};
pub use local::LocalSynthesizer;
pub use prompts::build_prompt;
pub use provider::{GenerationProvider, GenerationRequest};
