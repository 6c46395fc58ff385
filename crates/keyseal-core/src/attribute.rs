use crate::{codec::EnvelopeCodec, error::Result};

/// Converts a field between its in-memory and stored representations.
pub trait AttributeConverter {
    fn to_column(&self, attribute: Option<&str>) -> Result<Option<String>>;

    fn to_attribute(&self, column: Option<&str>) -> Result<Option<String>>;
}

/// Stores string fields as `{AES256}` envelopes. Reading falls back to the raw
/// value for rows written before encryption was enabled.
#[derive(Debug, Clone, Copy)]
pub struct EncryptedAttributeConverter<'a> {
    codec: &'a EnvelopeCodec,
}

impl<'a> EncryptedAttributeConverter<'a> {
    pub fn new(codec: &'a EnvelopeCodec) -> Self {
        Self { codec }
    }
}

impl AttributeConverter for EncryptedAttributeConverter<'_> {
    fn to_column(&self, attribute: Option<&str>) -> Result<Option<String>> {
        attribute.map(|a| self.codec.encrypt_text(a)).transpose()
    }

    fn to_attribute(&self, column: Option<&str>) -> Result<Option<String>> {
        column.map(|c| self.codec.decrypt_text(c)).transpose()
    }
}
