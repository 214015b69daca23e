/// Cosine similarity in `[-1, 1]`.
///
/// Empty inputs, mismatched lengths and zero-norm vectors all score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0) as f32
}

/// Like [`cosine_similarity`], treating an absent vector as neutral.
pub fn centroid_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}

/// Most common vector length. Ties go to the length seen first.
pub fn dominant_dimension<'a>(vectors: impl IntoIterator<Item = &'a [f32]>) -> Option<usize> {
    let mut tallies: Vec<(usize, usize)> = Vec::new();
    for vector in vectors {
        match tallies.iter_mut().find(|(length, _)| *length == vector.len()) {
            Some((_, count)) => *count += 1,
            None => tallies.push((vector.len(), 1)),
        }
    }

    tallies
        .into_iter()
        .fold(None, |best: Option<(usize, usize)>, (length, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((length, count)),
        })
        .map(|(length, _)| length)
}

/// Component-wise mean. `None` for an empty input or when lengths disagree.
pub fn average_vector(vectors: &[&[f32]]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dimension = first.len();
    if vectors.iter().any(|vector| vector.len() != dimension) {
        return None;
    }

    let mut sums = vec![0.0_f64; dimension];
    for vector in vectors {
        for (sum, &value) in sums.iter_mut().zip(vector.iter()) {
            *sum += f64::from(value);
        }
    }

    let count = vectors.len() as f64;
    Some(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}
