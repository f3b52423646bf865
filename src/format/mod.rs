//! Armored key text: format detection and the `openssh-key-v1` container

pub mod armor;
pub mod container;
pub mod detect;
pub mod wire;

pub use container::{decode, encode, ContainerHeader, DecodedContainer, AUTH_MAGIC};
pub use detect::{classify, detect_cipher, detect_format, CipherDetection, KeyFormat, KeyTextKind};
