//! Math utility functions

/// Index of the largest value; ties go to the first. `None` for empty input.
pub fn argmax(x: &[f32]) -> Option<usize> {
    x.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, b)) if v.total_cmp(&b).is_le() => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}
