use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// The payload rides in a single cell: a 32-bit zero opcode plus the comment
/// bytes, so the comment must fit the cell's 127-byte data limit.
const MAX_COMMENT_BYTES: usize = 123;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("comment is {0} bytes, the single-cell limit is {MAX_COMMENT_BYTES}")]
    CommentTooLong(usize),
}

/// Serializes the withdrawal instruction as a base64 bag-of-cells holding
/// one cell: 32-bit opcode 0 (plain text message) followed by the comment.
pub fn comment_payload(comment: &str) -> Result<String, PayloadError> {
    let text = comment.as_bytes();
    if text.len() > MAX_COMMENT_BYTES {
        return Err(PayloadError::CommentTooLong(text.len()));
    }

    let mut data = Vec::with_capacity(4 + text.len());
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(text);

    // Cell descriptors: no references, data is a whole number of bytes.
    let descriptor = [0u8, (data.len() * 2) as u8];
    let cell_size = (descriptor.len() + data.len()) as u8;

    let mut boc = Vec::with_capacity(11 + cell_size as usize);
    boc.extend_from_slice(&BOC_MAGIC);
    boc.push(1); // one byte addresses every cell reference
    boc.push(1); // one byte holds the total cell data size
    boc.push(1); // cell count
    boc.push(1); // root count
    boc.push(0); // no absent cells
    boc.push(cell_size);
    boc.push(0); // root index
    boc.extend_from_slice(&descriptor);
    boc.extend_from_slice(&data);

    Ok(STANDARD.encode(boc))
}
