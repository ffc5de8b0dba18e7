//! Top-k ranking of class probabilities.

use crate::core::constants::{CLASS_NAMES, TOP_K};
use crate::core::{SubCellError, SubCellResult};

/// Ranked classes for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRanking {
    /// Index of the most likely class.
    pub top_class: usize,
    /// Name of the most likely class.
    pub top_class_name: String,
    /// The k most likely class indexes, most likely first.
    pub top_classes: Vec<usize>,
    /// Names matching `top_classes`.
    pub top_class_names: Vec<String>,
}

impl ClassRanking {
    /// Top-k names joined with commas, most likely first.
    pub fn joined_names(&self) -> String {
        self.top_class_names.join(",")
    }

    /// Top-k indexes joined with commas, least likely first.
    ///
    /// This is the column layout downstream analysis scripts read from the
    /// result table, so it stays in ascending order.
    pub fn joined_indexes_ascending(&self) -> String {
        self.top_classes
            .iter()
            .rev()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Ranks probability vectors and maps class indexes to names.
#[derive(Debug, Clone)]
pub struct ClassRanker {
    class_names: Vec<String>,
    k: usize,
}

impl Default for ClassRanker {
    /// Creates a ranker over the SubCell localization classes reporting the top three.
    fn default() -> Self {
        Self {
            class_names: CLASS_NAMES.iter().map(|name| name.to_string()).collect(),
            k: TOP_K,
        }
    }
}

impl ClassRanker {
    /// Creates a ranker with a custom class table.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is 0 or the class table is empty.
    pub fn new(class_names: Vec<String>, k: usize) -> SubCellResult<Self> {
        if k == 0 {
            return Err(SubCellError::config_error("k must be greater than 0"));
        }
        if class_names.is_empty() {
            return Err(SubCellError::config_error("class name table is empty"));
        }
        Ok(Self { class_names, k })
    }

    /// Number of classes in the name table.
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Gets the class name for a given class id.
    pub fn class_name(&self, class_id: usize) -> Option<&str> {
        self.class_names.get(class_id).map(String::as_str)
    }

    /// Ranks a single probability vector.
    ///
    /// The top class is the first position holding the maximum. The top-k list
    /// comes from a stable ascending sort of all positions by probability, so
    /// equal probabilities keep their index order before the list is reversed.
    /// Both use IEEE total ordering, under which NaN ranks above every number.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector is empty or longer than the class table.
    pub fn rank(&self, probabilities: &[f32]) -> SubCellResult<ClassRanking> {
        if probabilities.is_empty() {
            return Err(SubCellError::invalid_input("empty probability vector"));
        }
        if probabilities.len() > self.class_names.len() {
            return Err(SubCellError::invalid_input(format!(
                "probability vector has {} entries but only {} class names are known",
                probabilities.len(),
                self.class_names.len()
            )));
        }

        let top_class = first_max_index(probabilities);

        let mut ascending: Vec<usize> = (0..probabilities.len()).collect();
        ascending.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));
        let top_classes: Vec<usize> = ascending.iter().rev().take(self.k).copied().collect();

        Ok(ClassRanking {
            top_class,
            top_class_name: self.name_or_unknown(top_class),
            top_class_names: top_classes.iter().map(|&c| self.name_or_unknown(c)).collect(),
            top_classes,
        })
    }

    fn name_or_unknown(&self, class_id: usize) -> String {
        self.class_name(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown({})", class_id))
    }
}

fn first_max_index(values: &[f32]) -> usize {
    let mut best = 0;
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value.total_cmp(&values[best]).is_gt() {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranker(n: usize) -> ClassRanker {
        ClassRanker::new((0..n).map(|i| format!("c{i}")).collect(), 3).unwrap()
    }

    #[test]
    fn test_top_class_is_argmax() {
        let ranking = ranker(3).rank(&[0.1, 0.7, 0.2]).unwrap();
        assert_eq!(ranking.top_class, 1);
        assert_eq!(ranking.top_class_name, "c1");
    }

    #[test]
    fn test_top_three_descending() {
        let ranking = ranker(5).rank(&[0.5, 0.1, 0.2, 0.4, 0.3]).unwrap();
        assert_eq!(ranking.top_classes, vec![0, 3, 4]);
        assert_eq!(ranking.joined_names(), "c0,c3,c4");
        assert_eq!(ranking.joined_indexes_ascending(), "4,3,0");
    }

    #[test]
    fn test_top_class_takes_first_of_equal_maxima() {
        let ranking = ranker(3).rank(&[0.4, 0.4, 0.2]).unwrap();
        assert_eq!(ranking.top_class, 0);
    }

    #[test]
    fn test_ties_follow_stable_sort() {
        // Stable ascending order is [3, 0, 1, 2]; the last three reversed are [2, 1, 0].
        let ranking = ranker(4).rank(&[0.2, 0.2, 0.2, 0.1]).unwrap();
        assert_eq!(ranking.top_classes, vec![2, 1, 0]);
    }

    #[test]
    fn test_fewer_classes_than_k() {
        let ranking = ranker(2).rank(&[0.3, 0.7]).unwrap();
        assert_eq!(ranking.top_classes, vec![1, 0]);
    }

    #[test]
    fn test_nan_probability_ranks_first() {
        let mut probabilities = vec![0.01_f32; 31];
        probabilities[4] = 0.3;
        probabilities[12] = 0.5;
        probabilities[20] = f32::NAN;
        let ranking = ClassRanker::default().rank(&probabilities).unwrap();
        assert_eq!(ranking.top_class, 20);
        assert_eq!(ranking.top_classes, vec![20, 12, 4]);
        assert_eq!(ranking.top_class_names[1], "Intermediate filaments");
    }

    #[test]
    fn test_every_nan_position_ranks_without_panicking() {
        for nan_at in 0..31 {
            let mut probabilities: Vec<f32> = (0..31).map(|i| i as f32 / 100.0).collect();
            probabilities[nan_at] = f32::NAN;
            let ranking = ClassRanker::default().rank(&probabilities).unwrap();
            assert_eq!(ranking.top_class, nan_at);
            assert_eq!(ranking.top_classes[0], nan_at);
            assert_eq!(ranking.top_classes.len(), 3);
        }
    }

    #[test]
    fn test_empty_vector_is_rejected() {
        assert!(ranker(3).rank(&[]).is_err());
    }

    #[test]
    fn test_vector_longer_than_table_is_rejected() {
        assert!(ranker(2).rank(&[0.1, 0.2, 0.7]).is_err());
    }

    #[test]
    fn test_default_uses_subcell_classes() {
        let ranker = ClassRanker::default();
        assert_eq!(ranker.num_classes(), 31);
        assert_eq!(ranker.class_name(7), Some("Cytosol"));
        assert_eq!(ranker.class_name(31), None);
    }

    #[test]
    fn test_zero_k_is_rejected() {
        assert!(ClassRanker::new(vec!["a".to_string()], 0).is_err());
    }
}
