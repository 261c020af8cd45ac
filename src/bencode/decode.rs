use super::error::BencodeError;
use super::value::Value;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Range;

const MAX_DEPTH: usize = 64;

/// Decodes exactly one value; anything after it is an error.
///
/// The decoder is strict: dictionary keys must be sorted and unique, and
/// integers may not carry leading zeros or `-0`.
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let mut decoder = Decoder::new(data);
    let value = decoder.value(0)?;
    decoder.finish()?;
    Ok(value)
}

/// Returns the raw encoded bytes of `key` inside the top-level dictionary.
///
/// The slice is exactly what appeared in the input, which is what an info
/// hash must be computed over.
pub fn raw_dict_value<'a>(data: &'a [u8], key: &[u8]) -> Result<Option<&'a [u8]>, BencodeError> {
    let mut decoder = Decoder::new(data);
    let span = decoder.find_top_level(key)?;
    Ok(span.map(|r| &data[r]))
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof(self.pos))
    }

    fn finish(&self) -> Result<(), BencodeError> {
        if self.pos != self.data.len() {
            return Err(BencodeError::TrailingData);
        }
        Ok(())
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep);
        }

        match self.peek()? {
            b'i' => self.integer().map(Value::Integer),
            b'l' => self.list(depth),
            b'd' => self.dict(depth),
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            c => Err(BencodeError::UnexpectedChar {
                ch: c as char,
                pos: self.pos,
            }),
        }
    }

    /// Reads up to (not including) `delim` and advances past it.
    fn take_until(&mut self, delim: u8) -> Result<&'a [u8], BencodeError> {
        let start = self.pos;
        let offset = self.data[start..]
            .iter()
            .position(|&b| b == delim)
            .ok_or(BencodeError::UnexpectedEof(self.data.len()))?;
        self.pos = start + offset + 1;
        Ok(&self.data[start..start + offset])
    }

    fn integer(&mut self) -> Result<i64, BencodeError> {
        self.pos += 1;
        let raw = self.take_until(b'e')?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| BencodeError::InvalidInteger("not ascii".into()))?;

        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BencodeError::InvalidInteger(text.into()));
        }
        if text == "-0" || (digits.len() > 1 && digits.starts_with('0')) {
            return Err(BencodeError::InvalidInteger(format!("{text}: leading zero")));
        }

        text.parse()
            .map_err(|_| BencodeError::InvalidInteger(text.into()))
    }

    fn bytes(&mut self) -> Result<Bytes, BencodeError> {
        let start = self.pos;
        let raw = self.take_until(b':')?;
        if raw.len() > 1 && raw[0] == b'0' {
            return Err(BencodeError::InvalidStringLength(start));
        }
        let len: usize = std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(BencodeError::InvalidStringLength(start))?;

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(BencodeError::UnexpectedEof(self.data.len()))?;

        let out = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(out)
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value(depth + 1)?);
        }
        self.pos += 1;
        Ok(Value::List(items))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut entries = BTreeMap::new();
        let mut last: Option<Bytes> = None;

        while self.peek()? != b'e' {
            let key = self.key(last.as_ref())?;
            let value = self.value(depth + 1)?;
            last = Some(key.clone());
            entries.insert(key, value);
        }
        self.pos += 1;
        Ok(Value::Dict(entries))
    }

    /// Reads a dictionary key and checks it sorts strictly after `last`.
    fn key(&mut self, last: Option<&Bytes>) -> Result<Bytes, BencodeError> {
        let at = self.pos;
        if !self.peek()?.is_ascii_digit() {
            return Err(BencodeError::NonStringKey(at));
        }
        let key = self.bytes()?;
        match last.map(|prev| prev.as_ref().cmp(key.as_ref())) {
            Some(std::cmp::Ordering::Equal) => Err(BencodeError::DuplicateKey(at)),
            Some(std::cmp::Ordering::Greater) => Err(BencodeError::UnsortedKeys(at)),
            _ => Ok(key),
        }
    }

    fn find_top_level(&mut self, wanted: &[u8]) -> Result<Option<Range<usize>>, BencodeError> {
        if self.peek()? != b'd' {
            return Err(BencodeError::UnexpectedChar {
                ch: self.peek()? as char,
                pos: self.pos,
            });
        }
        self.pos += 1;

        let mut found = None;
        let mut last: Option<Bytes> = None;
        while self.peek()? != b'e' {
            let key = self.key(last.as_ref())?;
            let start = self.pos;
            self.value(1)?;
            if key.as_ref() == wanted {
                found = Some(start..self.pos);
            }
            last = Some(key);
        }
        self.pos += 1;
        self.finish()?;
        Ok(found)
    }
}
