//! Bounded UTF-8 text, framed like the secret: a varint length followed by the bytes.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, RangeCfg, Read, Write};

pub fn write_text(text: &str, writer: &mut impl BufMut) {
    text.len().write(writer);
    writer.put_slice(text.as_bytes());
}

/// Read text of at most `limit` bytes. `field` names the value in decode errors.
pub fn read_text(
    reader: &mut impl Buf,
    limit: usize,
    field: &'static str,
) -> Result<String, Error> {
    let len = usize::read_cfg(reader, &RangeCfg::from(0..=limit))?;
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let bytes = reader.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::Invalid(field, "invalid UTF-8"))
}

pub fn text_encode_size(text: &str) -> usize {
    text.len().encode_size() + text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::MAX_POLICY_LENGTH;
    use bytes::BytesMut;

    fn framed(text: &str) -> BytesMut {
        let mut buf = BytesMut::new();
        write_text(text, &mut buf);
        assert_eq!(buf.len(), text_encode_size(text));
        buf
    }

    #[test]
    fn test_policy_at_limit() {
        let policy = "p".repeat(MAX_POLICY_LENGTH);
        let buf = framed(&policy);
        assert_eq!(buf[0] as usize, MAX_POLICY_LENGTH);

        let mut reader = buf.as_ref();
        assert_eq!(read_text(&mut reader, MAX_POLICY_LENGTH, "policy").unwrap(), policy);
        assert!(reader.is_empty());

        let over = framed(&"p".repeat(MAX_POLICY_LENGTH + 1));
        assert!(matches!(
            read_text(&mut over.as_ref(), MAX_POLICY_LENGTH, "policy"),
            Err(Error::InvalidLength(len)) if len == MAX_POLICY_LENGTH + 1
        ));
    }

    #[test]
    fn test_limit_counts_bytes() {
        // Four characters, eight bytes.
        let choice = "ñáñá";
        let buf = framed(choice);
        assert!(read_text(&mut buf.as_ref(), 7, "choice").is_err());
        assert_eq!(read_text(&mut buf.as_ref(), 8, "choice").unwrap(), choice);
    }

    #[test]
    fn test_empty_text() {
        let buf = framed("");
        assert_eq!(buf.as_ref(), &[0]);
        assert_eq!(read_text(&mut buf.as_ref(), 0, "choice").unwrap(), "");
    }

    #[test]
    fn test_truncated_and_malformed() {
        let mut buf = framed("abstain");
        buf.truncate(4);
        assert!(matches!(
            read_text(&mut buf.as_ref(), 64, "choice"),
            Err(Error::EndOfBuffer)
        ));

        let mut buf = BytesMut::new();
        2usize.write(&mut buf);
        buf.extend_from_slice(&[0xc3, 0x28]);
        assert!(matches!(
            read_text(&mut buf.as_ref(), 64, "choice"),
            Err(Error::Invalid("choice", "invalid UTF-8"))
        ));
    }
}
