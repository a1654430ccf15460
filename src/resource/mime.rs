//! MIME type inference from a resource URL's file extension.

const WOFF: &str = "application/font-woff";
const JPEG: &str = "image/jpeg";

/// Extension of the last path segment, ignoring any query or fragment.
pub fn parse_extension(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// MIME type for the URL, or an empty string when the extension is unknown.
pub fn mime_type(url: &str) -> &'static str {
    match parse_extension(url).to_ascii_lowercase().as_str() {
        "woff" | "woff2" => WOFF,
        "ttf" => "application/font-truetype",
        "eot" => "application/vnd.ms-fontobject",
        "png" => "image/png",
        "jpg" | "jpeg" => JPEG,
        "gif" => "image/gif",
        "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "",
    }
}
