use http::header::{self, HeaderMap};

pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    pub fn parse(headers: &HeaderMap) -> ContentDisposition {
        let content_disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|val| std::str::from_utf8(val.as_bytes()).ok());

        let mut field_name = None;
        let mut file_name = None;

        if let Some(value) = content_disposition {
            for (key, val) in params(value) {
                if key.eq_ignore_ascii_case("name") {
                    field_name = Some(val);
                } else if key.eq_ignore_ascii_case("filename") {
                    file_name = Some(val);
                }
            }
        }

        ContentDisposition { field_name, file_name }
    }
}

/// Splits `type; key=value; key="quoted; value"` into its parameters,
/// skipping the disposition type.
fn params(value: &str) -> Vec<(&str, String)> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);

    segments
        .into_iter()
        .skip(1)
        .filter_map(|segment| {
            let (key, val) = segment.split_once('=')?;
            Some((key.trim(), unquote(val.trim())))
        })
        .collect()
}

fn unquote(val: &str) -> String {
    match val.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(ch);
                }
            }
            out
        }
        None => val.to_owned(),
    }
}
