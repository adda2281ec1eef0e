pub mod error;
pub mod gemini;
pub mod schema;
pub mod traits;
pub mod util;

pub use error::{AiError, Result};
pub use gemini::{Gemini, GenerateOptions, GroundedAnswer, GroundingSource, TextStream};
pub use schema::StructuredOutput;
pub use traits::{Message, MessageRole};
pub use util::{extract_json, parse_json, truncate_to_char_boundary, ExtractError};
