//! Bencode encoding ([BEP-3]).
//!
//! Only the encoder lives here: torgen produces metainfo documents, it never
//! reads them back. Dictionaries are backed by [`BTreeMap`], so keys are
//! always emitted in sorted order and the same value tree serializes to the
//! same bytes every time.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [`BTreeMap`]: std::collections::BTreeMap

mod encode;
mod value;

pub use encode::encode;
pub use value::Value;
