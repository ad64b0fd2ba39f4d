//! Primitive read/write operations that content serializers use to encode and
//! decode message content onto a [`MessageFifo`].
//!
//! A `MessageFifo` plays double duty: a serializer pushes encoded bytes onto one
//! while producing a message, and a deserializer pops them back off in the same
//! order once the message has been fully received. This mirrors the original
//! `MessageFIFO`, which the same object plays both roles for.

use crate::fifo::MessageFifo;
use byteorder::{BigEndian, ByteOrder};
use rce_types::error::{RceError, Result};

impl MessageFifo {
    /// Appends a 4-byte big-endian integer.
    pub fn add_int(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.push(buf.to_vec());
    }

    /// Reads a 4-byte big-endian integer from the front of the stream.
    pub fn get_int(&mut self) -> Result<u32> {
        let (chunk, n) = self.pop(4);
        if n != 4 {
            return Err(RceError::SerializationError(
                "unexpected end of stream while reading an integer".into(),
            ));
        }
        Ok(BigEndian::read_u32(&chunk))
    }

    /// Appends a length-prefixed opaque blob.
    pub fn add_element(&mut self, bytes: &[u8]) {
        self.add_int(bytes.len() as u32);
        self.push(bytes.to_vec());
    }

    /// Reads a length-prefixed opaque blob from the front of the stream.
    pub fn get_element(&mut self) -> Result<Vec<u8>> {
        let len = self.get_int()? as usize;
        let (chunk, n) = self.pop(len);
        if n != len {
            return Err(RceError::SerializationError(
                "unexpected end of stream while reading an element".into(),
            ));
        }
        Ok(chunk)
    }

    /// Appends a length-prefixed UTF-8 string as an element.
    pub fn add_str(&mut self, s: &str) {
        self.add_element(s.as_bytes());
    }

    /// Reads a length-prefixed element and decodes it as UTF-8.
    pub fn get_str(&mut self) -> Result<String> {
        let bytes = self.get_element()?;
        String::from_utf8(bytes)
            .map_err(|e| RceError::SerializationError(format!("element is not valid utf-8: {e}")))
    }

    /// Appends a fixed-width identifier, e.g. the inner type tag of a polymorphic
    /// `COMMAND` payload. `id` must be exactly `width` bytes.
    pub fn add_identifier(&mut self, id: &[u8], width: usize) -> Result<()> {
        if id.len() != width {
            return Err(RceError::InternalError(format!(
                "identifier of length {} does not match declared width {width}",
                id.len()
            )));
        }
        self.push(id.to_vec());
        Ok(())
    }

    /// Reads a fixed-width identifier from the front of the stream.
    pub fn get_identifier(&mut self, width: usize) -> Result<Vec<u8>> {
        let (chunk, n) = self.pop(width);
        if n != width {
            return Err(RceError::SerializationError(
                "unexpected end of stream while reading an identifier".into(),
            ));
        }
        Ok(chunk)
    }

    /// Appends a length-prefixed sequence of elements.
    pub fn add_list<T: AsRef<[u8]>>(&mut self, items: &[T]) {
        self.add_int(items.len() as u32);
        for item in items {
            self.add_element(item.as_ref());
        }
    }

    /// Reads a length-prefixed sequence of elements.
    pub fn get_list(&mut self) -> Result<Vec<Vec<u8>>> {
        let count = self.get_int()? as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.get_element()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips() {
        let mut s = MessageFifo::new();
        s.add_int(0xDEADBEEF);
        assert_eq!(s.get_int().unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn element_round_trips_including_empty() {
        let mut s = MessageFifo::new();
        s.add_element(b"hello");
        s.add_element(b"");
        assert_eq!(s.get_element().unwrap(), b"hello");
        assert_eq!(s.get_element().unwrap(), b"");
    }

    #[test]
    fn str_round_trips() {
        let mut s = MessageFifo::new();
        s.add_str("robot-7");
        assert_eq!(s.get_str().unwrap(), "robot-7");
    }

    #[test]
    fn identifier_rejects_wrong_width() {
        let mut s = MessageFifo::new();
        assert!(s.add_identifier(b"ab", 1).is_err());
    }

    #[test]
    fn identifier_round_trips() {
        let mut s = MessageFifo::new();
        s.add_identifier(b"x", 1).unwrap();
        assert_eq!(s.get_identifier(1).unwrap(), b"x");
    }

    #[test]
    fn list_round_trips() {
        let mut s = MessageFifo::new();
        let items: Vec<&[u8]> = vec![b"a", b"bb", b"ccc"];
        s.add_list(&items);
        let decoded = s.get_list().unwrap();
        assert_eq!(decoded, vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]);
    }

    #[test]
    fn reading_past_the_end_is_a_serialization_error() {
        let mut s = MessageFifo::new();
        assert!(s.get_int().is_err());
        s.add_int(5);
        // Declares a 5-byte element but no body follows.
        assert!(s.get_element().is_err());
    }
}
