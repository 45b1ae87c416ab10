//! Decoding of the base64 PDF carried in processing responses.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::protocol::{FILLED_FORM_FILENAME, PDF_MIME_TYPE};

use crate::error::SubmissionError;

/// A filled form ready to be handed to a download sink.
#[derive(Clone, PartialEq, Eq)]
pub struct PdfDocument {
    file_name: String,
    bytes: Vec<u8>,
}

impl PdfDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: FILLED_FORM_FILENAME.to_string(),
            bytes,
        }
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SubmissionError> {
        let bytes = decode_pdf_content(encoded)
            .map_err(|err| SubmissionError::InvalidPdfContent(err.to_string()))?;
        Ok(Self::new(bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("file_name", &self.file_name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Decodes standard-alphabet base64, ignoring ASCII whitespace such as the
/// line breaks some encoders insert.
pub fn decode_pdf_content(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}

pub fn encode_pdf_content(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payload_to_exact_bytes() {
        let document = PdfDocument::from_base64(&STANDARD.encode(b"PDF-BYTES")).expect("decode");
        assert_eq!(document.bytes(), b"PDF-BYTES");
        assert_eq!(document.file_name(), "filled_k4.pdf");
        assert_eq!(document.mime_type(), "application/pdf");
    }

    #[test]
    fn decoding_reverses_encoding_for_arbitrary_bytes() {
        let mut samples: Vec<Vec<u8>> = vec![Vec::new(), vec![0], vec![0xff, 0x00, 0x7f]];
        samples.push((0..=255u8).collect());
        samples.push((0..4099u32).map(|i| (i.wrapping_mul(31) % 251) as u8).collect());

        for bytes in samples {
            let encoded = encode_pdf_content(&bytes);
            assert_eq!(decode_pdf_content(&encoded).expect("decode"), bytes);
        }
    }

    #[test]
    fn tolerates_wrapped_lines() {
        let encoded = STANDARD.encode(b"%PDF-1.7 wrapped payload");
        let (head, tail) = encoded.split_at(12);
        let wrapped = format!("{head}\r\n{tail}\n");
        assert_eq!(
            decode_pdf_content(&wrapped).expect("decode"),
            b"%PDF-1.7 wrapped payload"
        );
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = PdfDocument::from_base64("not*base64").expect_err("must fail");
        assert!(matches!(err, SubmissionError::InvalidPdfContent(_)));
        assert!(err.user_message().starts_with("Error: Invalid PDF payload: "));
    }
}
