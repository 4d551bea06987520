pub mod detokenize;
pub mod marks;
pub mod sentence;
pub mod split;

pub use detokenize::Detokenizer;
pub use sentence::{segment_sentences, SentenceSplitter};
pub use split::{Tokenizer, TokenizerMode};
