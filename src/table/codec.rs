//! 表的二进制编码。
//! Binary encoding of the table.
//!
//! Layout, big-endian: magic `QTBL`, version `u8`, three `u16` state bounds,
//! action count `u8`, then one `i32` per cell in storage order.

use super::{STATE_DIMS, TableShape};
use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const MAGIC: &[u8; 4] = b"QTBL";
const VERSION: u8 = 1;
pub(super) const HEADER_SIZE: usize = 4 + 1 + 2 * STATE_DIMS + 1;

pub(super) fn encode(shape: TableShape, values: &[i32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + values.len() * 4);
    buf.put_slice(MAGIC);
    buf.put_u8(VERSION);
    for bound in shape.bounds {
        buf.put_u16(bound);
    }
    buf.put_u8(shape.actions);
    for &value in values {
        buf.put_i32(value);
    }
    buf.freeze()
}

pub(super) fn decode(mut buf: &[u8]) -> Result<(TableShape, Vec<i32>)> {
    let total = buf.len();
    if buf.remaining() < HEADER_SIZE {
        return Err(Error::TruncatedTable {
            expected: HEADER_SIZE,
            found: total,
        });
    }
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(Error::BadMagic);
    }
    let version = buf.get_u8();
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    let mut bounds = [0u16; STATE_DIMS];
    for bound in bounds.iter_mut() {
        *bound = buf.get_u16();
    }
    let shape = TableShape::new(bounds, buf.get_u8()).validate()?;

    let expected = HEADER_SIZE + shape.cells() * 4;
    if total != expected {
        return Err(Error::TruncatedTable {
            expected,
            found: total,
        });
    }
    let values = (0..shape.cells()).map(|_| buf.get_i32()).collect();
    Ok((shape, values))
}
