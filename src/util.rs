use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Entity ids arrive either as CURIEs ("uniprot:P05231") or in the
/// backend's underscore form ("uniprot_P05231"). The namespace prefix is
/// everything before the first separator.
pub fn entity_prefix(id: &str) -> &str {
    id.split(['_', ':']).next().unwrap_or(id)
}

/// Normalize an id to CURIE form for API path segments.
pub fn entity_curie(id: &str) -> String {
    match id.split_once('_') {
        Some((prefix, rest)) if !id.contains(':') => format!("{prefix}:{rest}"),
        _ => id.to_string(),
    }
}

pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let mut shortened: String = label.chars().take(max_chars.saturating_sub(1)).collect();
        shortened.push('…');
        shortened
    }
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_handles_both_id_forms() {
        assert_eq!(entity_prefix("uniprot:P05231"), "uniprot");
        assert_eq!(entity_prefix("uniprot_P05231"), "uniprot");
        assert_eq!(entity_prefix("frailty"), "frailty");
    }

    #[test]
    fn curie_rewrites_only_underscore_ids() {
        assert_eq!(entity_curie("uniprot_P05231"), "uniprot:P05231");
        assert_eq!(entity_curie("uniprot:P05231"), "uniprot:P05231");
        assert_eq!(entity_curie("go:GO_0006954"), "go:GO_0006954");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x1, y1) = stable_pair("uniprot:P05231");
        let (x2, y2) = stable_pair("uniprot:P05231");
        assert_eq!((x1, y1), (x2, y2));
        assert!((-1.0..=1.0).contains(&x1));
        assert!((-1.0..=1.0).contains(&y1));
    }
}
