//! 把任意标题转换成可以安全用作文件名/目录名的字符串

const REPLACEMENT: char = '_';
const MAX_NAME_BYTES: usize = 240;

// Windows 保留的设备名，大小写不敏感
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_illegal(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

fn trim_edges(s: &str) -> &str {
    s.trim_start_matches(char::is_whitespace)
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

// 截断后重新去掉首尾空白，保留的设备名检查要在截断之后
fn cap_length(mut safe: String) -> String {
    if safe.len() <= MAX_NAME_BYTES {
        return safe;
    }
    let mut cut = MAX_NAME_BYTES;
    while !safe.is_char_boundary(cut) {
        cut -= 1;
    }
    safe.truncate(cut);
    trim_edges(&safe).to_string()
}

/// 文件名净化。纯函数，满足 `sanitize(sanitize(x)) == sanitize(x)`。
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_illegal(c) { REPLACEMENT } else { c })
        .collect();

    let mut safe = cap_length(trim_edges(&replaced).to_string());

    let stem = safe.split('.').next().unwrap_or_default();
    let stem_len = stem.len();
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        safe.insert(stem_len, REPLACEMENT);
        safe = cap_length(safe);
    }

    if safe.is_empty() {
        return REPLACEMENT.to_string();
    }
    safe
}
