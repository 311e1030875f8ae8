mod compression;
mod delta;

pub use compression::CompressionCache;
pub use delta::DeltaEncoder;
