//! Low-level consensus encoding and decoding.
//!
//! Integers are little-endian. Collections are prefixed with a compact-size
//! length. Bit vectors are packed LSB-first and zero-padded to a whole byte.

use std::io;
use std::io::{Read, Write};

use thiserror::Error;

/// Maximum size, in bytes, of a vector we are willing to decode.
pub const MAX_VEC_SIZE: usize = 4_000_000;

/// Encoding or decoding error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("parse failed: {0}")]
    ParseFailed(&'static str),

    #[error("oversized vector allocation: requested {requested}, maximum {max}")]
    OversizedVectorAllocation { requested: u64, max: u64 },

    #[error("non-minimal compact size")]
    NonMinimalCompactSize,
}

/// Data which can be encoded in a consensus-consistent way.
pub trait Encodable {
    /// Encodes the object, returning the number of bytes written.
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error>;
}

/// Data which can be decoded in a consensus-consistent way.
pub trait Decodable: Sized {
    /// Decodes an object from the reader.
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error>;
}

/// Encodes an object into a fresh byte vector.
pub fn serialize<T: Encodable + ?Sized>(data: &T) -> Vec<u8> {
    let mut encoder = Vec::new();
    let len = data.consensus_encode(&mut encoder).expect("in-memory writers don't error");
    debug_assert_eq!(len, encoder.len());
    encoder
}

/// Decodes an object from a byte slice, requiring the whole slice to be
/// consumed.
pub fn deserialize<T: Decodable>(data: &[u8]) -> Result<T, Error> {
    let (rv, consumed) = deserialize_partial(data)?;
    if consumed == data.len() {
        Ok(rv)
    } else {
        Err(Error::ParseFailed("data not consumed entirely when explicitly deserializing"))
    }
}

/// Decodes an object from the front of a byte slice, returning it together
/// with the number of bytes consumed.
pub fn deserialize_partial<T: Decodable>(data: &[u8]) -> Result<(T, usize), Error> {
    let mut cursor = io::Cursor::new(data);
    let rv = T::consensus_decode(&mut cursor)?;
    Ok((rv, cursor.position() as usize))
}

macro_rules! impl_int_encodable {
    ($ty:ident) => {
        impl Encodable for $ty {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                let bytes = self.to_le_bytes();
                w.write_all(&bytes)?;
                Ok(bytes.len())
            }
        }

        impl Decodable for $ty {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                r.read_exact(&mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        }
    };
}

impl_int_encodable!(u8);
impl_int_encodable!(u16);
impl_int_encodable!(u32);
impl_int_encodable!(u64);
impl_int_encodable!(i32);
impl_int_encodable!(i64);

impl Encodable for bool {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        u8::from(*self).consensus_encode(w)
    }
}

impl Decodable for bool {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        Ok(u8::consensus_decode(r)? != 0)
    }
}

/// A variable-length unsigned integer, known in Bitcoin as a compact size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VarInt(pub u64);

impl Encodable for VarInt {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        match self.0 {
            0..=0xFC => {
                (self.0 as u8).consensus_encode(w)?;
                Ok(1)
            }
            0xFD..=0xFFFF => {
                w.write_all(&[0xFD])?;
                (self.0 as u16).consensus_encode(w)?;
                Ok(3)
            }
            0x10000..=0xFFFF_FFFF => {
                w.write_all(&[0xFE])?;
                (self.0 as u32).consensus_encode(w)?;
                Ok(5)
            }
            _ => {
                w.write_all(&[0xFF])?;
                self.0.consensus_encode(w)?;
                Ok(9)
            }
        }
    }
}

impl Decodable for VarInt {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let n = u8::consensus_decode(r)?;
        match n {
            0xFF => {
                let x = u64::consensus_decode(r)?;
                if x < 0x1_0000_0000 {
                    Err(Error::NonMinimalCompactSize)
                } else {
                    Ok(VarInt(x))
                }
            }
            0xFE => {
                let x = u32::consensus_decode(r)?;
                if x < 0x1_0000 {
                    Err(Error::NonMinimalCompactSize)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            0xFD => {
                let x = u16::consensus_decode(r)?;
                if x < 0xFD {
                    Err(Error::NonMinimalCompactSize)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            n => Ok(VarInt(n as u64)),
        }
    }
}

/// Writes a compact-size length prefix.
pub fn write_compact_size<W: Write + ?Sized>(w: &mut W, size: u64) -> Result<usize, io::Error> {
    VarInt(size).consensus_encode(w)
}

/// Reads a compact-size length prefix.
pub fn read_compact_size<R: Read + ?Sized>(r: &mut R) -> Result<u64, Error> {
    Ok(VarInt::consensus_decode(r)?.0)
}

/// Writes a bit vector as a compact-size count followed by the bits packed
/// LSB-first and zero-padded to a whole byte.
pub fn write_fixed_bitset<W: Write + ?Sized>(
    w: &mut W,
    bits: &[bool],
    size: usize,
) -> Result<usize, io::Error> {
    let mut len = write_compact_size(w, size as u64)?;
    let mut bytes = vec![0u8; (size + 7) / 8];
    for (i, bit) in bits.iter().take(size).enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    w.write_all(&bytes)?;
    len += bytes.len();
    Ok(len)
}

/// Reads `size` bits packed LSB-first. The caller has already read the
/// compact-size count.
pub fn read_fixed_bitset<R: Read + ?Sized>(r: &mut R, size: usize) -> Result<Vec<bool>, Error> {
    if size > MAX_VEC_SIZE * 8 {
        return Err(Error::OversizedVectorAllocation {
            requested: size as u64,
            max: (MAX_VEC_SIZE * 8) as u64,
        });
    }
    let mut bytes = vec![0u8; (size + 7) / 8];
    r.read_exact(&mut bytes)?;
    let mut bits = Vec::with_capacity(size);
    for i in 0..size {
        bits.push(bytes[i / 8] & (1 << (i % 8)) != 0);
    }
    Ok(bits)
}

impl Encodable for Vec<u8> {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let len = write_compact_size(w, self.len() as u64)?;
        w.write_all(self)?;
        Ok(len + self.len())
    }
}

impl Decodable for Vec<u8> {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let len = read_compact_size(r)?;
        if len > MAX_VEC_SIZE as u64 {
            return Err(Error::OversizedVectorAllocation {
                requested: len,
                max: MAX_VEC_SIZE as u64,
            });
        }
        let mut buf = vec![0u8; len as usize];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

macro_rules! impl_vec_encodable {
    ($ty:ty) => {
        impl Encodable for Vec<$ty> {
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                let mut len = write_compact_size(w, self.len() as u64)?;
                for item in self {
                    len += item.consensus_encode(w)?;
                }
                Ok(len)
            }
        }

        impl Decodable for Vec<$ty> {
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                let count = read_compact_size(r)?;
                let max = (MAX_VEC_SIZE / std::mem::size_of::<$ty>().max(1)) as u64;
                if count > max {
                    return Err(Error::OversizedVectorAllocation { requested: count, max });
                }
                let mut result = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    result.push(Decodable::consensus_decode(r)?);
                }
                Ok(result)
            }
        }
    };
}

impl_vec_encodable!(i32);
impl_vec_encodable!(u32);
impl_vec_encodable!(crate::hash_types::BlockHash);
impl_vec_encodable!(crate::hash_types::ProTxHash);
impl_vec_encodable!(crate::sml::masternode_list_entry::MasternodeListEntry);
