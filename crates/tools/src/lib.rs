pub mod utf8;

pub use utf8::{Utf8Sink, complete_prefix_len, finish_utf8, push_utf8_chunk};
