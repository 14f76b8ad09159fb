//! Adobe ascii85 without the `<~ ~>` delimiters.
//!
//! Every 4-byte group becomes 5 characters in `'!'..='u'`; an all-zero group
//! is shortened to `z`.  A trailing partial group of `n` bytes is padded with
//! zeros and emitted as its first `n + 1` characters, so decoding restores the
//! exact input length.

use thiserror::Error;

const FIRST: u8 = b'!';
const LAST:  u8 = b'u';
const ZERO_GROUP: u8 = b'z';

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Base85Error {
    #[error("illegal character {byte:#04x} at offset {offset}")]
    IllegalChar { byte: u8, offset: usize },
    #[error("'z' inside a group at offset {offset}")]
    MisplacedZ { offset: usize },
    #[error("group ending at offset {offset} overflows 32 bits")]
    Overflow { offset: usize },
    #[error("dangling single character at end of input")]
    Dangling,
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().div_ceil(4) * 5);
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);

        if chunk.len() == 4 && value == 0 {
            out.push(ZERO_GROUP);
            continue;
        }

        let mut digits = [0u8; 5];
        for d in digits.iter_mut().rev() {
            *d = (value % 85) as u8 + FIRST;
            value /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>, Base85Error> {
    let mut out = Vec::with_capacity(data.len() / 5 * 4 + 4);
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    for (offset, &byte) in data.iter().enumerate() {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0c => continue,
            ZERO_GROUP if filled == 0 => out.extend_from_slice(&[0; 4]),
            ZERO_GROUP => return Err(Base85Error::MisplacedZ { offset }),
            FIRST..=LAST => {
                group[filled] = byte - FIRST;
                filled += 1;
                if filled == 5 {
                    let value = group_value(&group).ok_or(Base85Error::Overflow { offset })?;
                    out.extend_from_slice(&value.to_be_bytes());
                    filled = 0;
                }
            }
            _ => return Err(Base85Error::IllegalChar { byte, offset }),
        }
    }

    match filled {
        0 => {}
        1 => return Err(Base85Error::Dangling),
        n => {
            // Pad with the highest digit so truncation rounds back down to the input.
            group[n..].fill(LAST - FIRST);
            let value = group_value(&group).ok_or(Base85Error::Overflow { offset: data.len() })?;
            out.extend_from_slice(&value.to_be_bytes()[..n - 1]);
        }
    }
    Ok(out)
}

fn group_value(digits: &[u8; 5]) -> Option<u32> {
    digits
        .iter()
        .try_fold(0u32, |acc, &d| acc.checked_mul(85)?.checked_add(d as u32))
}
