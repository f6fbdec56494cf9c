use chrono::Utc;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::Path;

/// Characters escaped inside one object-path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A file picked for upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    /// Original file name, used for the extension and content type
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

/// Lowercase extension without the dot, empty when there is none
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Storage-safe name `<unix_millis>_<6 random [a-z0-9]>.<ext>`.
///
/// Original names often carry CJK characters and spaces the storage
/// service rejects, so only the extension survives.
pub fn safe_file_name(original: &str) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    let millis = Utc::now().timestamp_millis();

    match extension_of(original) {
        ext if ext.is_empty() => format!("{millis}_{random}"),
        ext => format!("{millis}_{random}.{ext}"),
    }
}

pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "webp" => "image/webp",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Percent-encode each segment of an object path, keeping `/`
pub fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// `<base>/storage/v1/object/public/<bucket>/<path>`
pub fn public_object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        encode_object_path(path)
    )
}

/// Object path inside `bucket` for a public URL, percent-decoded.
///
/// Returns `None` for URLs that do not point into the bucket, such as
/// external covers or in-app routes.
pub fn storage_path_from_public_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("/storage/v1/object/public/{bucket}/");
    let (_, encoded) = url.split_once(&marker)?;
    let encoded = encoded.split(['?', '#']).next().unwrap_or_default();
    if encoded.is_empty() {
        return None;
    }
    Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
}
