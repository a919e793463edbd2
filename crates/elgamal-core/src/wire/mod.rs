//! Marker-delimited tag/value framing
//!
//! Keys and signatures are stored as concatenated frames:
//!
//! ```text
//! MARKER(4) | TAG(1) | VALUE(big-endian magnitude) | MARKER(4)
//! ```
//!
//! There is no length prefix; frame boundaries are found by searching for
//! the marker. A value whose magnitude bytes happen to contain the marker
//! cannot be framed unambiguously and will be misparsed.

mod marker;

pub use marker::MarkerSearch;

use crate::config::DEFAULT_MARKER;
use crate::{Error, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::BTreeMap;
use std::fmt;

/// Field identifier carried in the byte after an opening marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Tag {
    /// Signature component `a = g^r mod p`
    A = 0xaa,
    /// Signature component `b`
    B = 0xbb,
    /// Reserved message tag; recognised but never written
    M = 0xcc,
    /// Safe prime modulus
    P = 0xdd,
    /// Subgroup generator
    G = 0xee,
    /// Private exponent
    X = 0xff,
    /// Public value `g^x mod p`
    Y = 0xab,
}

impl Tag {
    /// Wire byte for this tag
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0xaa => Ok(Tag::A),
            0xbb => Ok(Tag::B),
            0xcc => Ok(Tag::M),
            0xdd => Ok(Tag::P),
            0xee => Ok(Tag::G),
            0xff => Ok(Tag::X),
            0xab => Ok(Tag::Y),
            other => Err(Error::corruption(format!("unknown field tag 0x{:02x}", other))),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::A => "A",
            Tag::B => "B",
            Tag::M => "M",
            Tag::P => "P",
            Tag::G => "G",
            Tag::X => "X",
            Tag::Y => "Y",
        };
        f.write_str(name)
    }
}

/// Decoded fields of a framed buffer
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fields(BTreeMap<Tag, BigUint>);

impl Fields {
    /// Value for `tag`, if present
    pub fn get(&self, tag: Tag) -> Option<&BigUint> {
        self.0.get(&tag)
    }

    /// Value for `tag`, or a corruption error naming the missing field
    pub fn require(&self, tag: Tag) -> Result<&BigUint> {
        self.get(tag)
            .ok_or_else(|| Error::corruption(format!("missing field {}", tag)))
    }

    /// Whether `tag` was present
    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains_key(&tag)
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field was decoded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags in ascending byte order
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.keys().copied()
    }

    fn insert(&mut self, tag: Tag, value: BigUint) -> Result<()> {
        if self.0.insert(tag, value).is_some() {
            return Err(Error::corruption(format!("duplicate field {}", tag)));
        }
        Ok(())
    }
}

/// Encoder/decoder for marker-delimited frames
#[derive(Debug, Clone)]
pub struct WireCodec {
    search: MarkerSearch,
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl WireCodec {
    /// Create a codec for the given marker
    pub fn new(marker: [u8; 4]) -> Self {
        Self {
            search: MarkerSearch::new(&marker),
        }
    }

    /// Marker bytes delimiting every frame
    pub fn marker(&self) -> &[u8] {
        self.search.pattern()
    }

    /// Wrap `value` as `marker | tag | magnitude | marker`
    pub fn encode_frame(&self, tag: Tag, value: &BigUint) -> Vec<u8> {
        let magnitude = to_magnitude(value);
        let marker = self.marker();
        let mut frame = Vec::with_capacity(2 * marker.len() + 1 + magnitude.len());
        frame.extend_from_slice(marker);
        frame.push(tag.byte());
        frame.extend_from_slice(&magnitude);
        frame.extend_from_slice(marker);
        frame
    }

    /// Concatenate the frames for several fields, in order
    pub fn encode_frames(&self, fields: &[(Tag, &BigUint)]) -> Vec<u8> {
        fields
            .iter()
            .flat_map(|(tag, value)| self.encode_frame(*tag, value))
            .collect()
    }

    /// Whether `bytes` followed by a marker is first matched at that marker.
    ///
    /// False when `bytes` contains the marker, or ends with a partial marker
    /// that the appended one would complete early.
    pub fn can_frame(&self, bytes: &[u8]) -> bool {
        let mut probe = Vec::with_capacity(bytes.len() + self.marker().len());
        probe.extend_from_slice(bytes);
        probe.extend_from_slice(self.marker());
        self.find_marker(&probe) == Some(bytes.len())
    }

    /// Leftmost marker position in `haystack`
    pub fn find_marker(&self, haystack: &[u8]) -> Option<usize> {
        self.search.find(haystack)
    }

    /// Bytes preceding the first marker
    pub fn parse_message_prefix<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let end = self
            .find_marker(data)
            .ok_or_else(|| Error::corruption("no frame marker found"))?;
        Ok(&data[..end])
    }

    /// Decode every frame that follows the message prefix
    pub fn parse_frames(&self, data: &[u8]) -> Result<Fields> {
        let prefix = self.parse_message_prefix(data)?;
        let mut rest = &data[prefix.len()..];
        let mut fields = Fields::default();

        while rest.len() >= self.marker().len() {
            rest = self.read_frame(rest, &mut fields)?;
        }
        if !rest.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after last frame",
                rest.len()
            )));
        }

        Ok(fields)
    }

    /// Decode one frame at the start of `rest` into `fields`, returning
    /// the bytes after its closing marker.
    fn read_frame<'a>(&self, rest: &'a [u8], fields: &mut Fields) -> Result<&'a [u8]> {
        let marker_len = self.marker().len();
        match self.find_marker(rest) {
            Some(0) => {}
            Some(offset) => {
                return Err(Error::corruption(format!(
                    "{} unexpected bytes between frames",
                    offset
                )))
            }
            None => return Err(Error::corruption("missing opening frame marker")),
        }

        let (&tag_byte, body) = rest[marker_len..]
            .split_first()
            .ok_or_else(|| Error::corruption("frame is missing its tag byte"))?;
        let tag = Tag::try_from(tag_byte)?;

        let end = self
            .find_marker(body)
            .ok_or_else(|| Error::corruption(format!("frame {} has no closing marker", tag)))?;
        fields.insert(tag, from_magnitude(&body[..end]))?;

        Ok(&body[end + marker_len..])
    }
}

/// Big-endian magnitude without a leading zero byte; zero is empty
pub fn to_magnitude(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    value.to_bytes_be()
}

/// Interpret big-endian bytes as a non-negative integer
pub fn from_magnitude(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];
    const REFERENCE: &str =
        "77492214967865460963471699751820070564084647936440628989923671088450960649501";
    const REFERENCE_HEX: &str = "ab530a13e45914982b79f9b7e3fba994cfd1f3fb22f71cea1afbf02b460c6d1d";

    #[test]
    fn test_encode_frame_layout() {
        let codec = WireCodec::default();
        let value = BigUint::from_bytes_be(&[0xaa, 0xab, 0xac]);
        let expected = [
            0xde, 0xad, 0xbe, 0xef, 0xff, 0xaa, 0xab, 0xac, 0xde, 0xad, 0xbe, 0xef,
        ];
        assert_eq!(codec.encode_frame(Tag::X, &value), expected);
    }

    #[test]
    fn test_magnitude_conversion_has_no_sign_byte() {
        let n: BigUint = REFERENCE.parse().unwrap();
        let bytes = to_magnitude(&n);
        assert_eq!(bytes.len(), 32);
        assert_eq!(hex::encode(&bytes), REFERENCE_HEX);
        assert_eq!(from_magnitude(&bytes), n);
        assert!(to_magnitude(&BigUint::zero()).is_empty());
        assert_eq!(from_magnitude(&[]), BigUint::zero());
    }

    #[test]
    fn test_parse_frames_after_message() {
        let mut data = vec![0xaa, 0xab, 0xba, 0xcc, 0xff, 0xaa, 0xae];
        data.extend_from_slice(&M);
        data.extend_from_slice(&[Tag::P.byte(), 0x05, 0x39]);
        data.extend_from_slice(&M);
        data.extend_from_slice(&M);
        data.extend_from_slice(&[Tag::G.byte(), 0x04, 0xd5]);
        data.extend_from_slice(&M);

        let codec = WireCodec::default();
        assert_eq!(codec.parse_message_prefix(&data).unwrap(), &data[..7]);

        let fields = codec.parse_frames(&data).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get(Tag::P), Some(&BigUint::from(1337u32)));
        assert_eq!(fields.get(Tag::G), Some(&BigUint::from(1237u32)));
        assert!(fields.require(Tag::Y).unwrap_err().is_corruption());
    }

    #[test]
    fn test_every_tag_round_trips() {
        let codec = WireCodec::default();
        let value: BigUint = REFERENCE.parse().unwrap();
        for tag in [Tag::A, Tag::B, Tag::M, Tag::P, Tag::G, Tag::X, Tag::Y] {
            let fields = codec.parse_frames(&codec.encode_frame(tag, &value)).unwrap();
            assert_eq!(fields.get(tag), Some(&value), "tag {}", tag);
            assert_eq!(Tag::try_from(tag.byte()).unwrap(), tag);
        }
    }

    #[test]
    fn test_zero_and_small_values_round_trip() {
        let codec = WireCodec::default();
        let zero = BigUint::zero();
        let one = BigUint::from(1u8);
        let frames = codec.encode_frames(&[(Tag::A, &zero), (Tag::B, &one)]);
        let fields = codec.parse_frames(&frames).unwrap();
        assert_eq!(fields.get(Tag::A), Some(&zero));
        assert_eq!(fields.get(Tag::B), Some(&one));
    }

    #[test]
    fn test_custom_marker() {
        let codec = WireCodec::new([0xca, 0xfe, 0xba, 0xbe]);
        let value = BigUint::from(0xdeadbeefu32);
        let mut data = b"hello".to_vec();
        data.extend(codec.encode_frame(Tag::Y, &value));
        assert_eq!(codec.parse_message_prefix(&data).unwrap(), b"hello");
        assert_eq!(codec.parse_frames(&data).unwrap().get(Tag::Y), Some(&value));
    }

    #[test]
    fn test_missing_marker_is_corruption() {
        let codec = WireCodec::default();
        assert!(codec.parse_message_prefix(b"plain text").unwrap_err().is_corruption());
        assert!(codec.parse_frames(b"plain text").unwrap_err().is_corruption());
    }

    #[test]
    fn test_unknown_tag_is_corruption() {
        let mut data = M.to_vec();
        data.extend_from_slice(&[0x01, 0x05]);
        data.extend_from_slice(&M);
        let err = WireCodec::default().parse_frames(&data).unwrap_err();
        assert!(matches!(err, Error::Corruption(ref msg) if msg.contains("0x01")));
    }

    #[test]
    fn test_unterminated_frame_is_corruption() {
        let mut data = M.to_vec();
        data.extend_from_slice(&[Tag::P.byte(), 0x05, 0x39]);
        assert!(WireCodec::default().parse_frames(&data).unwrap_err().is_corruption());

        // Marker with nothing after it
        assert!(WireCodec::default().parse_frames(&M).unwrap_err().is_corruption());
    }

    #[test]
    fn test_gap_between_frames_is_corruption() {
        let codec = WireCodec::default();
        let mut data = codec.encode_frame(Tag::P, &BigUint::from(7u8));
        data.push(0x00);
        data.extend(codec.encode_frame(Tag::G, &BigUint::from(3u8)));
        assert!(codec.parse_frames(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_trailing_bytes_are_corruption() {
        let codec = WireCodec::default();
        let mut data = codec.encode_frame(Tag::P, &BigUint::from(7u8));
        data.extend_from_slice(&[0x01, 0x02]);
        assert!(codec.parse_frames(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_duplicate_tag_is_corruption() {
        let codec = WireCodec::default();
        let seven = BigUint::from(7u8);
        let data = codec.encode_frames(&[(Tag::P, &seven), (Tag::P, &seven)]);
        assert!(codec.parse_frames(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_can_frame() {
        let codec = WireCodec::default();
        assert!(codec.can_frame(b"message"));
        assert!(codec.can_frame(&[]));
        assert!(!codec.can_frame(&[0x01, 0xde, 0xad, 0xbe, 0xef]));

        // A marker with a border can be completed early by a trailing prefix
        let codec = WireCodec::new([0x00, 0xff, 0x00, 0xff]);
        assert!(!codec.can_frame(&[0x01, 0x00, 0xff]));
        assert!(codec.can_frame(&[0x01, 0xff, 0x00]));
    }

    #[test]
    fn test_value_containing_marker_is_misparsed() {
        let codec = WireCodec::default();
        let value = BigUint::from_bytes_be(&[0x01, 0xde, 0xad, 0xbe, 0xef, 0x02]);
        let data = codec.encode_frame(Tag::P, &value);
        match codec.parse_frames(&data) {
            Ok(fields) => assert_ne!(fields.get(Tag::P), Some(&value)),
            Err(err) => assert!(err.is_corruption()),
        }
    }
}
