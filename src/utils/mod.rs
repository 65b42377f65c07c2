pub mod ip;

/// barcode 最大长度（与 counter_states.barcode 列宽一致）
pub const MAX_BARCODE_LEN: usize = 128;

/// 按字符（非字节）截断，保证结果仍是合法 UTF-8
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => input[..byte_idx].to_string(),
        None => input.to_string(),
    }
}

/// 校验 barcode：非空、长度受限、仅允许 [A-Za-z0-9_.-]
pub fn is_valid_barcode(barcode: &str) -> bool {
    !barcode.is_empty()
        && barcode.len() <= MAX_BARCODE_LEN
        && barcode
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}
