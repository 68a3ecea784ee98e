/// `HH:MM:SS` helpers shared by the DIDL-Lite codec and the renderer actions

/// Format whole seconds as zero-padded `HH:MM:SS`. Hours are not wrapped.
pub fn format_hms(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse `H+:MM:SS` with an optional fractional seconds suffix
/// (`0:03:25.500`), or a bare number of seconds. Fractions are truncated.
pub fn parse_hms(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts: Vec<&str> = text.split(':').collect();
    match parts.as_slice() {
        [seconds] => parse_seconds(seconds),
        [hours, minutes, seconds] => {
            let hours: u32 = parse_digits(hours)?;
            let minutes: u32 = parse_digits(minutes)?;
            let seconds = parse_seconds(seconds)?;
            if minutes >= 60 || seconds >= 60 {
                return None;
            }
            hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)
        }
        _ => None,
    }
}

fn parse_digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_seconds(text: &str) -> Option<u32> {
    match text.split_once('.') {
        Some((whole, fraction)) => {
            if !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            parse_digits(whole)
        }
        None => parse_digits(text),
    }
}
