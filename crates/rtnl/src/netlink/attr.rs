//! Netlink attribute (rtattr/nlattr) handling.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Iterator over the TLV sequence of an attribute block.
///
/// Every step checks `len >= NLA_HDRLEN` and that the declared length fits
/// in what remains. A malformed attribute yields one error and ends the
/// iteration. Up to three trailing bytes are accepted as alignment padding.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = Result<(u16, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = match NlAttr::from_bytes(self.data) {
            Ok(a) => a,
            Err(e) => return Some(Err(e)),
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN {
            self.data = &[];
            return Some(Err(Error::InvalidAttribute(format!(
                "attribute {} has length {}",
                attr.kind(),
                len
            ))));
        }
        if len > self.data.len() {
            let actual = self.data.len();
            self.data = &[];
            return Some(Err(Error::Truncated {
                expected: len,
                actual,
            }));
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // Move to next attribute
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok((attr.kind(), payload)))
    }
}

/// Helper functions for extracting typed values from attribute payloads.
///
/// Payloads longer than the value are accepted and read from the front.
pub mod get {
    use super::*;

    fn array<const N: usize>(data: &[u8]) -> Result<[u8; N]> {
        data.get(..N)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::Truncated {
                expected: N,
                actual: data.len(),
            })
    }

    /// Extract a u8 value.
    pub fn u8(data: &[u8]) -> Result<u8> {
        Ok(array::<1>(data)?[0])
    }

    /// Extract a u16 value (native endian).
    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        Ok(u16::from_ne_bytes(array(data)?))
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        Ok(u32::from_ne_bytes(array(data)?))
    }

    /// Extract a u64 value (native endian).
    pub fn u64_ne(data: &[u8]) -> Result<u64> {
        Ok(u64::from_ne_bytes(array(data)?))
    }

    /// Extract an i32 value (native endian).
    pub fn i32_ne(data: &[u8]) -> Result<i32> {
        Ok(i32::from_ne_bytes(array(data)?))
    }

    /// Extract a u16 value (big endian / network order).
    pub fn u16_be(data: &[u8]) -> Result<u16> {
        Ok(u16::from_be_bytes(array(data)?))
    }

    /// Extract a fixed-size byte array.
    pub fn bytes<const N: usize>(data: &[u8]) -> Result<[u8; N]> {
        array(data)
    }

    /// Extract a NUL-terminated string.
    ///
    /// Returns `None` when the bytes before the terminator are not UTF-8.
    pub fn string(data: &[u8]) -> Option<&str> {
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len]).ok()
    }

    /// Extract a sequence of native-endian u32 values.
    pub fn u32_array(data: &[u8]) -> Result<Vec<u32>> {
        if data.len() % 4 != 0 {
            return Err(Error::InvalidAttribute(format!(
                "u32 array of {} bytes",
                data.len()
            )));
        }
        Ok(data
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Extract a sequence of native-endian u64 values.
    pub fn u64_array(data: &[u8]) -> Result<Vec<u64>> {
        if data.len() % 8 != 0 {
            return Err(Error::InvalidAttribute(format!(
                "u64 array of {} bytes",
                data.len()
            )));
        }
        Ok(data
            .chunks_exact(8)
            .map(|c| u64::from_ne_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_walks_aligned_attributes() {
        let data = [
            0x05, 0x00, 0x03, 0x00, b'l', 0x00, 0x00, 0x00, // kind 3, 1 byte + pad
            0x08, 0x00, 0x04, 0x80, 0xdc, 0x05, 0x00, 0x00, // kind 4 | NESTED, 1500
        ];
        let attrs: Vec<_> = AttrIter::new(&data).collect::<Result<_>>().unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], (3, &b"l"[..]));
        assert_eq!(attrs[1].0, 4);
        assert_eq!(get::u32_ne(attrs[1].1).unwrap(), 1500);
    }

    #[test]
    fn test_iter_rejects_short_length() {
        let data = [0x02, 0x00, 0x01, 0x00];
        let mut iter = AttrIter::new(&data);
        assert!(matches!(iter.next(), Some(Err(Error::InvalidAttribute(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_iter_rejects_overrun() {
        let data = [0x0c, 0x00, 0x01, 0x00, 0x01, 0x02];
        let mut iter = AttrIter::new(&data);
        assert!(matches!(
            iter.next(),
            Some(Err(Error::Truncated {
                expected: 12,
                actual: 6
            }))
        ));
    }

    #[test]
    fn test_get_helpers() {
        assert_eq!(get::u16_be(&[0x81, 0x00]).unwrap(), 0x8100);
        assert!(get::u32_ne(&[1, 2]).is_err());
        assert_eq!(get::string(b"eth0\0\0"), Some("eth0"));
        assert_eq!(get::string(&[0xff, 0xfe]), None);
        assert_eq!(get::u32_array(&[1, 0, 0, 0, 2, 0, 0, 0]).unwrap(), vec![1, 2]);
        assert!(get::u64_array(&[0; 12]).is_err());
    }
}
