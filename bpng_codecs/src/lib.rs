mod deflate_codec;
mod stored;

pub use deflate_codec::DeflateCompressor;
pub use stored::StoredCompressor;

use bpng_core::Compressor;

/// Resolve a compressor from its CLI name.
///
/// `level` only applies to `deflate` (0 = store .. 9 = best).
pub fn compressor_by_name(name: &str, level: u32) -> anyhow::Result<Box<dyn Compressor>> {
    match name {
        "deflate" | "d" => Ok(Box::new(DeflateCompressor::new(level))),
        "stored" | "store" | "none" => Ok(Box::new(StoredCompressor)),
        other => anyhow::bail!("unknown compressor '{}'. Valid options: deflate, stored", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        assert_eq!(compressor_by_name("deflate", 9).unwrap().name(), "deflate");
        assert_eq!(compressor_by_name("store", 0).unwrap().name(), "stored");
        let err = compressor_by_name("zstd", 3).err().unwrap().to_string();
        assert!(err.contains("unknown compressor"), "got: {err}");
    }
}
