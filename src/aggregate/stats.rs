//! @ai:module:intent Null-aware summary statistics
//! @ai:module:layer domain
//! @ai:module:public_api median, mean
//! @ai:module:stateless true

/// @ai:intent Median of the values, averaging the two middle values for even counts
/// @ai:post None for an empty input
/// @ai:effects pure
pub fn median<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;

    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// @ai:intent Arithmetic mean of the values
/// @ai:post None for an empty input
/// @ai:effects pure
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u64), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
