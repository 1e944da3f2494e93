use std::fmt;
use std::str::FromStr;

use crate::error::{MaterializeError, MaterializeResult};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF32_LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];

/// Character encodings supported for text uploads and downloads.
///
/// The default is UTF-8 with a byte-order mark, which is what uploads fall
/// back to when no encoding is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    /// UTF-8 without a byte-order mark.
    Utf8,
    /// UTF-8; whole documents are written with a byte-order mark.
    #[default]
    Utf8Bom,
    /// UTF-16, little endian.
    Utf16Le,
    /// UTF-16, big endian.
    Utf16Be,
    /// UTF-32, little endian.
    Utf32Le,
    /// 7-bit US-ASCII.
    Ascii,
    /// ISO-8859-1.
    Latin1,
}

impl TextEncoding {
    /// Parse an encoding label such as `"utf-8"`, `"UTF8"`, `"unicode"` or
    /// `"iso-8859-1"`. Case, dashes, underscores and spaces are ignored.
    ///
    /// A blank label resolves to the default encoding.
    pub fn parse(label: &str) -> MaterializeResult<Self> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let normalized: String = trimmed
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "utf8" => Ok(Self::Utf8),
            "utf8bom" | "utf8withbom" => Ok(Self::Utf8Bom),
            "utf16" | "utf16le" | "unicode" => Ok(Self::Utf16Le),
            "utf16be" | "bigendianunicode" | "unicodefffe" => Ok(Self::Utf16Be),
            "utf32" | "utf32le" => Ok(Self::Utf32Le),
            "ascii" | "usascii" => Ok(Self::Ascii),
            "latin1" | "iso88591" | "l1" => Ok(Self::Latin1),
            _ => Err(MaterializeError::invalid_option(
                "encoding",
                format!("unsupported encoding '{trimmed}'"),
            )),
        }
    }

    /// Interpret a stored `Content-Encoding` value as a charset.
    ///
    /// Returns `None` for blank values, for `gzip`, and for anything that is
    /// not a known charset label.
    pub fn from_content_encoding(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("gzip") {
            return None;
        }
        Self::parse(value).ok()
    }

    /// The IANA name sent as the blob `Content-Encoding`.
    pub const fn web_name(self) -> &'static str {
        match self {
            Self::Utf8 | Self::Utf8Bom => "utf-8",
            Self::Utf16Le => "utf-16",
            Self::Utf16Be => "utf-16BE",
            Self::Utf32Le => "utf-32",
            Self::Ascii => "us-ascii",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Byte-order mark written in front of whole documents.
    pub const fn preamble(self) -> &'static [u8] {
        match self {
            Self::Utf8Bom => UTF8_BOM,
            Self::Utf16Le => UTF16_LE_BOM,
            Self::Utf16Be => UTF16_BE_BOM,
            Self::Utf32Le => UTF32_LE_BOM,
            Self::Utf8 | Self::Ascii | Self::Latin1 => &[],
        }
    }

    /// Detect a byte-order mark at the start of `bytes`.
    ///
    /// Returns the encoding it announces and the mark's length.
    pub fn sniff(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.starts_with(UTF32_LE_BOM) {
            Some((Self::Utf32Le, UTF32_LE_BOM.len()))
        } else if bytes.starts_with(UTF8_BOM) {
            Some((Self::Utf8Bom, UTF8_BOM.len()))
        } else if bytes.starts_with(UTF16_LE_BOM) {
            Some((Self::Utf16Le, UTF16_LE_BOM.len()))
        } else if bytes.starts_with(UTF16_BE_BOM) {
            Some((Self::Utf16Be, UTF16_BE_BOM.len()))
        } else {
            None
        }
    }

    /// Encode `text` without a preamble.
    pub fn encode(self, text: &str) -> MaterializeResult<Vec<u8>> {
        match self {
            Self::Utf8 | Self::Utf8Bom => Ok(text.as_bytes().to_vec()),
            Self::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Self::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Self::Utf32Le => Ok(text
                .chars()
                .flat_map(|c| u32::from(c).to_le_bytes())
                .collect()),
            Self::Ascii => text
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        u8::try_from(c).map_err(|_| self.unrepresentable(c))
                    } else {
                        Err(self.unrepresentable(c))
                    }
                })
                .collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(c).map_err(|_| self.unrepresentable(c)))
                .collect(),
        }
    }

    /// Decode `bytes` with exactly this encoding. No byte-order mark handling.
    pub fn decode(self, bytes: &[u8]) -> MaterializeResult<String> {
        let undecodable = || MaterializeError::Undecodable { encoding: self };
        match self {
            Self::Utf8 | Self::Utf8Bom => {
                String::from_utf8(bytes.to_vec()).map_err(|_| undecodable())
            }
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() % 2 != 0 {
                    return Err(undecodable());
                }
                let units = bytes.chunks_exact(2).map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if self == Self::Utf16Le {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    }
                });
                char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|_| undecodable())
            }
            Self::Utf32Le => {
                if bytes.len() % 4 != 0 {
                    return Err(undecodable());
                }
                bytes
                    .chunks_exact(4)
                    .map(|quad| {
                        char::from_u32(u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
                            .ok_or_else(undecodable)
                    })
                    .collect()
            }
            Self::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().copied().map(char::from).collect())
                } else {
                    Err(undecodable())
                }
            }
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
        }
    }

    /// Decode a whole document, stripping this encoding's own preamble if
    /// present.
    pub fn decode_strict(self, bytes: &[u8]) -> MaterializeResult<String> {
        let body = bytes.strip_prefix(self.preamble()).unwrap_or(bytes);
        self.decode(body)
    }

    /// Decode a whole document of unknown provenance.
    ///
    /// A leading byte-order mark wins over `self`; without one the bytes are
    /// decoded with `self`.
    pub fn decode_document(self, bytes: &[u8]) -> MaterializeResult<String> {
        match Self::sniff(bytes) {
            Some((detected, skip)) => detected.decode(&bytes[skip..]),
            None => self.decode(bytes),
        }
    }

    fn unrepresentable(self, character: char) -> MaterializeError {
        MaterializeError::Unrepresentable {
            encoding: self,
            character,
        }
    }
}

impl FromStr for TextEncoding {
    type Err = MaterializeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-bom",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Utf32Le => "utf-32le",
            Self::Ascii => "us-ascii",
            Self::Latin1 => "iso-8859-1",
        };
        f.write_str(label)
    }
}
