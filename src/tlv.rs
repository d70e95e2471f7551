//! Matter TLV encoding (Appendix A)
//!
//! Only the encoding side is needed here: command responses and attribute
//! reports are built with [`Encoder`], inbound commands arrive already decoded.

use bytes::{BufMut, BytesMut};

/// Tag control field (A.7.2), with the tag number where one is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagControl {
    Anonymous,
    ContextSpecific(u8),
}

impl TagControl {
    const fn control_bits(&self) -> u8 {
        match self {
            TagControl::Anonymous => 0x00,
            TagControl::ContextSpecific(_) => 0x20,
        }
    }
}

/// An element value, its type and length are derived from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLengthValue<'a> {
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Unsigned64(u64),
    Boolean(bool),
    String(&'a str),
    OctetString(&'a [u8]),
    Null,
    Structure,
    Array,
    List,
    EndOfContainer,
}

#[repr(u8)]
enum ElementType {
    UnsignedInt1 = 0x04,
    UnsignedInt2 = 0x05,
    UnsignedInt4 = 0x06,
    UnsignedInt8 = 0x07,
    False = 0x08,
    True = 0x09,
    Utf8String1 = 0x0C,
    Utf8String2 = 0x0D,
    OctetString1 = 0x10,
    OctetString2 = 0x11,
    Null = 0x14,
    Structure = 0x15,
    Array = 0x16,
    List = 0x17,
    EndOfContainer = 0x18,
}

#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    fn put_control(&mut self, tag: TagControl, element: ElementType) {
        self.buf.put_u8(tag.control_bits() | element as u8);
        if let TagControl::ContextSpecific(tag) = tag {
            self.buf.put_u8(tag);
        }
    }

    fn put_bytes(&mut self, tag: TagControl, short: ElementType, long: ElementType, value: &[u8]) {
        match u8::try_from(value.len()) {
            Ok(len) => {
                self.put_control(tag, short);
                self.buf.put_u8(len);
            }
            Err(_) => {
                self.put_control(tag, long);
                // Longer values never occur in responses bounded by RESP_MAX
                self.buf.put_u16_le(value.len() as u16);
            }
        }
        self.buf.put_slice(value);
    }

    pub fn write(&mut self, tag: TagControl, value: TagLengthValue) {
        match value {
            TagLengthValue::Unsigned8(v) => {
                self.put_control(tag, ElementType::UnsignedInt1);
                self.buf.put_u8(v);
            }
            TagLengthValue::Unsigned16(v) => {
                self.put_control(tag, ElementType::UnsignedInt2);
                self.buf.put_u16_le(v);
            }
            TagLengthValue::Unsigned32(v) => {
                self.put_control(tag, ElementType::UnsignedInt4);
                self.buf.put_u32_le(v);
            }
            TagLengthValue::Unsigned64(v) => {
                self.put_control(tag, ElementType::UnsignedInt8);
                self.buf.put_u64_le(v);
            }
            TagLengthValue::Boolean(false) => self.put_control(tag, ElementType::False),
            TagLengthValue::Boolean(true) => self.put_control(tag, ElementType::True),
            TagLengthValue::String(v) => self.put_bytes(
                tag,
                ElementType::Utf8String1,
                ElementType::Utf8String2,
                v.as_bytes(),
            ),
            TagLengthValue::OctetString(v) => {
                self.put_bytes(tag, ElementType::OctetString1, ElementType::OctetString2, v)
            }
            TagLengthValue::Null => self.put_control(tag, ElementType::Null),
            TagLengthValue::Structure => self.put_control(tag, ElementType::Structure),
            TagLengthValue::Array => self.put_control(tag, ElementType::Array),
            TagLengthValue::List => self.put_control(tag, ElementType::List),
            TagLengthValue::EndOfContainer => {
                self.put_control(TagControl::Anonymous, ElementType::EndOfContainer)
            }
        }
    }

    pub fn start_struct(&mut self, tag: TagControl) {
        self.write(tag, TagLengthValue::Structure)
    }

    pub fn start_array(&mut self, tag: TagControl) {
        self.write(tag, TagLengthValue::Array)
    }

    pub fn end_container(&mut self) {
        self.write(TagControl::Anonymous, TagLengthValue::EndOfContainer)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn inner(self) -> BytesMut {
        self.buf
    }
}
