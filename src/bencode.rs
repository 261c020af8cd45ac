//! Bencode encoding and decoding ([BEP-3]).
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` |
//! | Byte string | `<length>:<data>` | `4:spam` |
//! | List | `l<items>e` | `l4:spami42ee` |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` |
//!
//! Encoding is canonical: dictionary keys are emitted in ascending raw-byte
//! order. Decoding is strict and rejects anything a canonical encoder would
//! never produce (unsorted or duplicate keys, `-0`, leading zeros), so a
//! decode/encode cycle reproduces the input byte for byte.
//!
//! ```
//! use bdesk::bencode::{decode, encode, Value};
//!
//! let value = decode(b"d3:cow3:moo4:spaml1:a1:bee").unwrap();
//! assert_eq!(value.get(b"cow").and_then(Value::as_str), Some("moo"));
//! assert_eq!(encode(&value).unwrap(), b"d3:cow3:moo4:spaml1:a1:bee");
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, raw_dict_value};
pub use encode::{encode, encode_into};
pub use error::BencodeError;
pub use value::Value;
