//! Model persistence.

pub mod native;

pub use native::{DeserializeError, FormatFlags, FormatHeader, NativeCodec, SerializeError};
