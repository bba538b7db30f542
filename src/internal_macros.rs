//! Macros shared across the crate.

/// Implements `Encodable` and `Decodable` for a struct by encoding the named
/// fields in order.
macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => (
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                let mut len = 0;
                $(len += self.$field.consensus_encode(w)?;)+
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<$thing, $crate::consensus::encode::Error> {
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode(r)?,)+
                })
            }
        }
    );
}
pub(crate) use impl_consensus_encoding;

/// Implements consensus encoding for a 32-byte hash newtype as its raw bytes.
macro_rules! impl_hashencode {
    ($hashtype:ident) => {
        impl $crate::consensus::Encodable for $hashtype {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                use hashes::Hash;
                w.write_all(&self.to_byte_array())?;
                Ok(32)
            }
        }

        impl $crate::consensus::Decodable for $hashtype {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<Self, $crate::consensus::encode::Error> {
                use hashes::Hash;
                let mut buf = [0u8; 32];
                r.read_exact(&mut buf)?;
                Ok(<$hashtype>::from_byte_array(buf))
            }
        }
    };
}
pub(crate) use impl_hashencode;
