use nn_workbench::data::UploadedFile;

/// Returns the index of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        if let Some(pos) = find_subsequence(&haystack[start..], needle) {
            result.push(&haystack[start..start + pos]);
            start += pos + needle.len();
        } else {
            result.push(&haystack[start..]);
            break;
        }
    }
    result
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|s| s.trim())
        .find(|s| s.starts_with("boundary="))
        .map(|s| s["boundary=".len()..].trim_matches('"').to_owned())
}

/// Every file part of a multipart/form-data body, in order.
///
/// A file input left empty by the browser still sends a part with
/// `filename=""`; those are skipped.
pub fn extract_files(body: &[u8], boundary: &str) -> Vec<UploadedFile> {
    let delimiter = format!("--{}", boundary);
    let mut files = Vec::new();

    for part in split_on(body, delimiter.as_bytes()) {
        let sep = b"\r\n\r\n";
        let Some(sep_pos) = find_subsequence(part, sep) else { continue };
        let headers = String::from_utf8_lossy(&part[..sep_pos]);

        let Some(name) = disposition_param(&headers, "filename") else { continue };
        if name.is_empty() {
            continue;
        }
        let media_type = header_value(&headers, "content-type").unwrap_or_default();

        let raw = &part[sep_pos + sep.len()..];
        let data = raw.strip_suffix(b"\r\n").unwrap_or(raw);
        files.push(UploadedFile::new(name, media_type, data.to_vec()));
    }
    files
}

/// Parses `key="..."` from a Content-Disposition header line.
fn disposition_param(headers: &str, key: &str) -> Option<String> {
    let line = headers
        .lines()
        .find(|l| l.to_ascii_lowercase().starts_with("content-disposition:"))?;
    line.split(';').map(str::trim).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        (k.trim().eq_ignore_ascii_case(key)).then(|| v.trim().trim_matches('"').to_owned())
    })
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim().eq_ignore_ascii_case(name).then(|| v.trim().to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"note\"\r\n\r\n\
        hello\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
        Content-Type: text/csv\r\n\r\n\
        a,b\r\n1,2\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"extra\"; filename=\"\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n\
        \r\n\
        --XyZ--\r\n";

    #[test]
    fn boundary_from_content_type() {
        assert_eq!(extract_boundary("multipart/form-data; boundary=\"XyZ\"").as_deref(), Some("XyZ"));
        assert_eq!(extract_boundary("text/plain"), None);
    }

    #[test]
    fn file_parts_keep_name_type_and_bytes() {
        let files = extract_files(BODY.as_bytes(), "XyZ");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "data.csv");
        assert_eq!(files[0].media_type, "text/csv");
        assert_eq!(files[0].raw.bytes(), b"a,b\r\n1,2");
    }
}
