use crate::annotations::rectangle::Rectangle;

/// A detection candidate is one row of network output that passed the confidence and
/// target class checks.
///
/// Candidates only live for one detect call; after selection just the winner is used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionCandidate {
    pub class_id: usize,
    pub confidence: f32,
    pub rect: Rectangle,
}
