//! Layered decode engine: transforms, type identification, and the
//! brute-force search that unmasks obfuscated payloads.

pub mod identify;
pub mod layered;
pub mod transforms;

pub use identify::{InferSniffer, TypePolicy, TypeSniffer};
pub use layered::LayeredDecoder;
pub use transforms::{decode_base64, decompress_gzip, xor_with_key, TransformOutcome};

/// Default mime allow-list for the discovery engine: native executables and
/// package/archive formats as reported by the content sniffer.
pub fn default_allow_types() -> Vec<String> {
    [
        "application/vnd.microsoft.portable-executable",
        "application/x-executable",
        "application/x-mach-binary",
        "application/zip",
        "application/java-archive",
        "application/vnd.rar",
        "application/x-7z-compressed",
        "application/vnd.debian.binary-package",
        "application/x-rpm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
