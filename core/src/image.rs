//! Encoding raw image bytes into the data URIs the face endpoints expect.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// `data:<mime>;base64,<payload>`
pub fn to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn jpeg_data_uri(bytes: &[u8]) -> String {
    to_data_uri(bytes, DEFAULT_IMAGE_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate;

    #[test]
    fn encodes_with_prefix() {
        assert_eq!(jpeg_data_uri(b"hi"), "data:image/jpeg;base64,aGk=");
    }

    #[test]
    fn output_passes_image_validation() {
        let uri = to_data_uri(&[0xff, 0xd8, 0xff, 0xe0], "image/png");
        assert!(validate::image_data_uri(&uri).is_ok());
    }
}
