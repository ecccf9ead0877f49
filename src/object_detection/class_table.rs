use crate::error::ConfigurationError;
use crate::object_detection::candidate_extraction::BOX_VALUES;
use ndarray::ArrayView1;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Class names of a model, where the line index is the class id.
///
/// The ids which come directly from the inference session only get meaning through this table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassTable {
    names: Vec<String>,
}

impl ClassTable {
    pub fn new(names: Vec<String>) -> Self {
        ClassTable { names }
    }

    /// Reads a newline delimited class names file.
    pub fn load(filepath: &Path) -> Result<Self, ConfigurationError> {
        let to_error = |source: std::io::Error| ConfigurationError::ClassNames {
            path: filepath.to_path_buf(),
            source,
        };
        let file = File::open(filepath).map_err(to_error)?;
        let names = BufReader::new(file)
            .lines()
            .collect::<Result<Vec<String>, _>>()
            .map_err(to_error)?;
        Ok(ClassTable::new(names))
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Result of classifying one row of class scores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassMatch {
    pub class_id: usize,
    pub score: f32,
    pub is_target: bool,
}

/// Decides whether a row of class scores belongs to the class we are looking for.
pub struct TargetClassFilter<'a> {
    classes: &'a ClassTable,
    target_label: &'a str,
}

impl<'a> TargetClassFilter<'a> {
    pub fn new(classes: &'a ClassTable, target_label: &'a str) -> Self {
        TargetClassFilter {
            classes,
            target_label,
        }
    }

    /// Finds the best scoring class and checks its name against the target label.
    ///
    /// When several classes share the maximum score the lowest id wins. A winning id without
    /// a name in the class table means the model and class file disagree, which is reported
    /// rather than treated as "not the target".
    pub fn classify(&self, scores: ArrayView1<f32>) -> Result<ClassMatch, ConfigurationError> {
        let (class_id, score) = scores
            .iter()
            .copied()
            .enumerate()
            .reduce(|best, current| if current.1 > best.1 { current } else { best })
            .ok_or(ConfigurationError::MalformedOutput {
                columns: scores.len() + BOX_VALUES,
            })?;
        let name = self
            .classes
            .name(class_id)
            .ok_or(ConfigurationError::ClassIdOutOfRange {
                class_id,
                table_len: self.classes.len(),
            })?;
        Ok(ClassMatch {
            class_id,
            score,
            is_target: name == self.target_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    fn coco_like() -> ClassTable {
        ClassTable::new(vec![
            "person".to_string(),
            "bicycle".to_string(),
            "baseball bat".to_string(),
        ])
    }

    #[test]
    fn load_reads_one_name_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "person\nbicycle\nbaseball bat\n").unwrap();
        let table = ClassTable::load(file.path()).unwrap();
        assert_eq!(table, coco_like());
        assert_eq!(table.name(2), Some("baseball bat"));
        assert_eq!(table.name(3), None);
    }

    #[test]
    fn load_missing_file_is_configuration_error() {
        let err = ClassTable::load(Path::new("./does/not/exist.names")).unwrap_err();
        assert!(matches!(err, ConfigurationError::ClassNames { .. }));
    }

    #[test]
    fn classify_picks_argmax_and_matches_label() {
        let classes = coco_like();
        let filter = TargetClassFilter::new(&classes, "baseball bat");
        let result = filter.classify(array![0.1_f32, 0.2, 0.7].view()).unwrap();
        assert_eq!(
            result,
            ClassMatch {
                class_id: 2,
                score: 0.7,
                is_target: true
            }
        );
    }

    #[test]
    fn classify_label_match_is_exact() {
        let classes = coco_like();
        let filter = TargetClassFilter::new(&classes, "Baseball Bat");
        let result = filter.classify(array![0.0_f32, 0.0, 0.9].view()).unwrap();
        assert!(!result.is_target);

        let filter = TargetClassFilter::new(&classes, "baseball");
        let result = filter.classify(array![0.0_f32, 0.0, 0.9].view()).unwrap();
        assert!(!result.is_target);
    }

    #[test]
    fn classify_ties_go_to_lowest_id() {
        let classes = coco_like();
        let filter = TargetClassFilter::new(&classes, "person");
        let result = filter.classify(array![0.5_f32, 0.5, 0.5].view()).unwrap();
        assert_eq!(result.class_id, 0);
        assert!(result.is_target);
    }

    #[test]
    fn classify_out_of_range_id_is_configuration_error() {
        let classes = coco_like();
        let filter = TargetClassFilter::new(&classes, "person");
        let err = filter
            .classify(array![0.0_f32, 0.0, 0.0, 0.8].view())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ClassIdOutOfRange {
                class_id: 3,
                table_len: 3
            }
        ));
    }

    #[test]
    fn classify_without_scores_is_malformed() {
        let classes = coco_like();
        let filter = TargetClassFilter::new(&classes, "person");
        let scores: [f32; 0] = [];
        let err = filter.classify(ArrayView1::from(&scores[..])).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MalformedOutput { columns } if columns == BOX_VALUES
        ));
    }
}
