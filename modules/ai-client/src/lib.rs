pub mod anthropic;
pub mod error;
pub mod openai;
pub mod schema;
pub mod traits;

pub use anthropic::Anthropic;
pub use error::{ProviderError, Result};
pub use openai::OpenAi;
pub use schema::StructuredOutput;
pub use traits::{extract, Answer, ProviderAdapter};
