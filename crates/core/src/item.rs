//! The stored `(name, rank)` record and its string-array encoding.

use std::io::{self, Read, Write};

/// A single stored record: a `name` and its precomputed `rank`.
///
/// Two independent orderings apply to a collection of `NodeItem`s:
///
/// - [`NodeItem::name`], byte-lexicographic, used to deduplicate results that
///   reach the same name through different romanizations.
/// - [`NodeItem::rank`], ascending, used to order the final response.
///
/// Neither ordering is implemented via `Ord`/`PartialOrd` on this type
/// directly, since the two are used for different purposes and conflating
/// them invites bugs where a caller sorts by the wrong key.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeItem {
    /// The stored display name.
    pub name: String,
    /// Precomputed rank; lower sorts first in query responses.
    pub rank: f32,
}

impl NodeItem {
    /// Builds a new record.
    pub fn new(name: impl Into<String>, rank: f32) -> Self {
        Self {
            name: name.into(),
            rank,
        }
    }
}

/// An ordered sequence of [`NodeItem`] associated with one romanization key.
///
/// Serialized as a little-endian `u32` count followed by, for each entry, a
/// little-endian `u32` byte length, the name's UTF-8 bytes, and a
/// little-endian `f32` rank. This must round-trip bit-exactly between the
/// trie builder and the trie reader (§3, §4.2, §4.3 of the specification).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringArray(pub Vec<NodeItem>);

impl StringArray {
    /// Creates an empty string array.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the array has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends an entry, preserving insertion order.
    pub fn push(&mut self, item: NodeItem) {
        self.0.push(item);
    }

    /// Serializes into `out` using the little-endian string-array format.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let count = u32::try_from(self.0.len()).expect("string array longer than u32::MAX");
        out.extend_from_slice(&count.to_le_bytes());
        for item in &self.0 {
            let bytes = item.name.as_bytes();
            let len = u32::try_from(bytes.len()).expect("name longer than u32::MAX bytes");
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(bytes);
            out.extend_from_slice(&item.rank.to_le_bytes());
        }
    }

    /// Serializes into any [`Write`] sink (used by the trie builder when
    /// streaming a blob directly to a file).
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        writer.write_all(&buf)
    }

    /// Reads a string array back out of `input`, advancing the cursor past
    /// the bytes consumed. Returns an error if the buffer is truncated or a
    /// name is not valid UTF-8.
    pub fn decode(input: &[u8]) -> io::Result<(Self, usize)> {
        let mut cursor = 0usize;
        let count = read_u32(input, &mut cursor)?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = read_u32(input, &mut cursor)? as usize;
            let end = cursor
                .checked_add(len)
                .filter(|&end| end <= input.len())
                .ok_or_else(truncated)?;
            let name = std::str::from_utf8(&input[cursor..end])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                .to_owned();
            cursor = end;
            let rank = read_f32(input, &mut cursor)?;
            items.push(NodeItem { name, rank });
        }
        Ok((Self(items), cursor))
    }

    /// Reads a string array from any [`Read`] source.
    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::decode(&buf).map(|(array, _)| array)
    }
}

impl IntoIterator for StringArray {
    type Item = NodeItem;
    type IntoIter = std::vec::IntoIter<NodeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a StringArray {
    type Item = &'a NodeItem;
    type IntoIter = std::slice::Iter<'a, NodeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated string array")
}

fn read_u32(input: &[u8], cursor: &mut usize) -> io::Result<u32> {
    let end = cursor.checked_add(4).filter(|&end| end <= input.len()).ok_or_else(truncated)?;
    let value = u32::from_le_bytes(input[*cursor..end].try_into().unwrap());
    *cursor = end;
    Ok(value)
}

fn read_f32(input: &[u8], cursor: &mut usize) -> io::Result<f32> {
    let end = cursor.checked_add(4).filter(|&end| end <= input.len()).ok_or_else(truncated)?;
    let value = f32::from_le_bytes(input[*cursor..end].try_into().unwrap());
    *cursor = end;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_empty_array() {
        let array = StringArray::new();
        let mut buf = Vec::new();
        array.encode(&mut buf);
        let (decoded, consumed) = StringArray::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, array);
    }

    #[test]
    fn round_trips_entries_bit_exactly() {
        let mut array = StringArray::new();
        array.push(NodeItem::new("北京", 0.125));
        array.push(NodeItem::new("beijing", -3.5));
        let mut buf = Vec::new();
        array.encode(&mut buf);
        let (decoded, consumed) = StringArray::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, array);
    }

    #[test]
    fn rejects_truncated_buffer() {
        let mut array = StringArray::new();
        array.push(NodeItem::new("abc", 1.0));
        let mut buf = Vec::new();
        array.encode(&mut buf);
        buf.truncate(buf.len() - 2);
        assert!(StringArray::decode(&buf).is_err());
    }

    #[test]
    fn decode_reports_bytes_consumed_for_trailing_data() {
        let mut array = StringArray::new();
        array.push(NodeItem::new("a", 1.0));
        let mut buf = Vec::new();
        array.encode(&mut buf);
        buf.extend_from_slice(b"trailing");
        let (decoded, consumed) = StringArray::decode(&buf).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(consumed < buf.len());
    }
}
