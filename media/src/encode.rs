use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Inline an encoded image for a JSON response.
pub fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Data URI for a decoded video frame.
pub fn jpeg_data_uri(bytes: &[u8]) -> String {
    data_uri(bytes, "image/jpeg")
}
