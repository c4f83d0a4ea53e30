//! Deterministic model-free pseudo-embedding.
//!
//! One value per character, the Unicode code point scaled into [0, 1],
//! truncated or zero-padded to the model dimension. Search quality degrades
//! but the dimension invariant holds, so the pipeline stays operable on
//! hosts without the model files.

const CODE_POINT_SCALE: f32 = char::MAX as u32 as f32;

pub fn char_code_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector: Vec<f32> = text
        .chars()
        .take(dimension)
        .map(|c| (c as u32 as f32) / CODE_POINT_SCALE)
        .collect();
    vector.resize(dimension, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_and_truncates_to_dimension() {
        assert_eq!(char_code_embedding("abc", 5).len(), 5);
        assert_eq!(char_code_embedding("abcdefgh", 5).len(), 5);
        assert_eq!(char_code_embedding("", 5), vec![0.0; 5]);
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let v = char_code_embedding("中文 mixed English 🎙️", 32);
        assert!(v.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn deterministic_for_same_input() {
        assert_eq!(
            char_code_embedding("股癌 EP33", 16),
            char_code_embedding("股癌 EP33", 16)
        );
    }
}
