use super::error::BencodeError;
use super::value::Value;
use std::io::Write;

/// Encodes a value into its canonical byte form.
///
/// Dictionary keys come out in ascending raw-byte order because [`Value::Dict`]
/// is a `BTreeMap<Bytes, _>`.
///
/// ```
/// use bdesk::bencode::{encode, Value};
///
/// let v = Value::dict([("b", Value::Integer(2)), ("a", Value::Integer(1))]);
/// assert_eq!(encode(&v).unwrap(), b"d1:ai1e1:bi2ee");
/// ```
pub fn encode(value: &Value) -> Result<Vec<u8>, BencodeError> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    encode_into(value, &mut buf)?;
    Ok(buf)
}

/// Streams the encoding of `value` into `writer`.
pub fn encode_into<W: Write>(value: &Value, writer: &mut W) -> Result<(), BencodeError> {
    match value {
        Value::Integer(i) => write!(writer, "i{i}e")?,
        Value::Bytes(b) => write_bytes(writer, b)?,
        Value::List(items) => {
            writer.write_all(b"l")?;
            for item in items {
                encode_into(item, writer)?;
            }
            writer.write_all(b"e")?;
        }
        Value::Dict(entries) => {
            writer.write_all(b"d")?;
            for (key, val) in entries {
                write_bytes(writer, key)?;
                encode_into(val, writer)?;
            }
            writer.write_all(b"e")?;
        }
    }
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    write!(writer, "{}:", bytes.len())?;
    writer.write_all(bytes)
}

/// Exact size of the encoding, used to size the output buffer once.
pub(crate) fn encoded_len(value: &Value) -> usize {
    match value {
        Value::Integer(i) => 2 + i.to_string().len(),
        Value::Bytes(b) => string_len(b.len()),
        Value::List(items) => 2 + items.iter().map(encoded_len).sum::<usize>(),
        Value::Dict(entries) => {
            2 + entries
                .iter()
                .map(|(k, v)| string_len(k.len()) + encoded_len(v))
                .sum::<usize>()
        }
    }
}

fn string_len(len: usize) -> usize {
    len.to_string().len() + 1 + len
}
