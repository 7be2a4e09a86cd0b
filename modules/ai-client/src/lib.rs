pub mod claude;
pub mod error;
pub mod openai;
pub mod openrouter;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::AiError;
pub use openai::OpenAi;
pub use openrouter::OpenRouter;
pub use traits::TextGenerator;
pub use util::{key_preview, strip_code_blocks, truncate_to_char_boundary};
