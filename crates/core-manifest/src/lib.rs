//! Asset manifest records and codecs for Stamp
//!
//! A manifest maps each asset's logical ("virtual") path to its fingerprinted
//! counterpart. Consumers such as web servers and templating layers read it
//! to emit cache-friendly URLs.
//!
//! # Key Concepts
//!
//! - **Manifest Record**: `virtualPath`, `hashedVirtualPath` and any plugin fields
//! - **Codec**: a named, pluggable text encoding of a record list (JSON, TOML)
//!
//! # Example
//!
//! ```
//! use stamp_core_manifest::{ManifestFormat, ManifestRecord};
//!
//! let records = vec![ManifestRecord::new("/a.txt", "/a~0123456789abcdef.txt")];
//! let codec = ManifestFormat::Json.codec();
//! let text = codec.serialize(&records).unwrap();
//! assert_eq!(codec.parse(&text).unwrap(), records);
//! ```

pub mod codec;
pub mod error;
pub mod record;
pub mod validate;

// Re-export main types for convenience
pub use codec::{JsonCodec, ManifestCodec, ManifestFormat, TomlCodec};
pub use error::{Error, Result};
pub use record::{sort_records, ExtraFields, ManifestRecord};
pub use validate::validate_records;
