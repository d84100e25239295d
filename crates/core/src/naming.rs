use crate::media::MediaFormat;

/// `YYYY-MM-DD - Phone Photos (N).ext`; `ext` keeps the source's case and
/// includes the leading dot (empty when the source has none).
pub fn target_file_name(
    day_key: &str,
    format: MediaFormat,
    sequence: usize,
    extension_with_dot: &str,
) -> String {
    format!(
        "{} - Phone {} ({}){}",
        day_key,
        format.kind_label(),
        sequence,
        extension_with_dot
    )
}

/// Sequence number of a name already in [`target_file_name`] form for
/// `day_key`, photo or video alike.
pub fn sequence_in_name(file_name: &str, day_key: &str) -> Option<usize> {
    let rest = file_name.strip_prefix(day_key)?.strip_prefix(" - Phone ")?;
    let rest = rest
        .strip_prefix("Photos (")
        .or_else(|| rest.strip_prefix("Videos ("))?;
    let (digits, tail) = rest.split_once(')')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !(tail.is_empty() || tail.starts_with('.')) {
        return None;
    }
    digits.parse().ok()
}
