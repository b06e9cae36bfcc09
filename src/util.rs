pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Renders milliseconds as `MM:SS.mmm`.
///
/// The fractional part is truncated to 10 ms and printed in a three digit
/// field, so 61234 becomes `01:01.230`. Minutes are not capped at 59.
pub fn format_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let centis = (ms % 1000) / 10;

    format!("{:02}:{:02}.{:03}", minutes, seconds, centis * 10)
}

/// Formats a (possibly fractional) average, flooring to whole milliseconds
pub fn format_average(ms: f64) -> String {
    format_time(ms.max(0.0).floor() as u64)
}
