// Utility functions for gift-ranking-service

/// Clamp a 0-100 catalog score into [0, 1]
pub fn normalize_percent(score: f64) -> f64 {
    (score / 100.0).clamp(0.0, 1.0)
}

/// Compute exponential decay for time-based scoring
pub fn exponential_decay(age_hours: f64, half_life_hours: f64) -> f64 {
    (-age_hours / half_life_hours * std::f64::consts::LN_2).exp()
}

/// Cosine distance (0 - 2) to a similarity in [0, 1]; opposite vectors score 0
pub fn similarity_from_distance(distance: f64) -> f64 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Share of `categories` that appear in `known`. Empty input scores 0.
pub fn overlap_ratio(categories: &[String], known: impl Fn(&str) -> bool) -> f64 {
    if categories.is_empty() {
        return 0.0;
    }
    let matched = categories.iter().filter(|c| known(c.as_str())).count();
    matched as f64 / categories.len() as f64
}
