use crate::annotations::detection::DetectionCandidate;
use crate::annotations::rectangle::Rectangle;
use crate::error::ConfigurationError;
use crate::object_detection::class_table::TargetClassFilter;
use ndarray::{Array2, ArrayView1, Axis, s};

/// Number of leading values in an output row before the class scores start:
/// centre x, centre y, width, height and objectness.
pub const BOX_VALUES: usize = 5;

/// Turns the raw output tensors of one inference pass into target class candidates.
///
/// Every tensor is a table with one row per predicted box laid out as
/// `[cx, cy, w, h, objectness, class_score_0, class_score_1, ...]`, all as fractions of the
/// image size. A row becomes a candidate when its best class score is strictly above
/// `confidence_threshold` and that class is the target. Boxes are scaled to the original
/// image but not clamped to it.
pub fn extract_candidates(
    net_output: &[Array2<f32>],
    image_width: u32,
    image_height: u32,
    filter: &TargetClassFilter,
    confidence_threshold: f32,
) -> Result<Vec<DetectionCandidate>, ConfigurationError> {
    let mut candidates: Vec<DetectionCandidate> = Vec::new();
    for output in net_output {
        if output.nrows() > 0 && output.ncols() <= BOX_VALUES {
            return Err(ConfigurationError::MalformedOutput {
                columns: output.ncols(),
            });
        }
        for row in output.axis_iter(Axis(0)) {
            let class_match = filter.classify(row.slice(s![BOX_VALUES..]))?;
            if class_match.score > confidence_threshold && class_match.is_target {
                candidates.push(DetectionCandidate {
                    class_id: class_match.class_id,
                    confidence: class_match.score,
                    rect: denormalize_box(row, image_width, image_height),
                });
            }
        }
    }
    Ok(candidates)
}

/// Scales a normalised centre/size box to pixels, truncating each value to an integer before
/// moving from the centre to the top left corner.
fn denormalize_box(row: ArrayView1<f32>, image_width: u32, image_height: u32) -> Rectangle {
    let image_width = image_width as f32;
    let image_height = image_height as f32;
    let center_x = (row[0] * image_width) as i32;
    let center_y = (row[1] * image_height) as i32;
    let width = (row[2] * image_width) as i32;
    let height = (row[3] * image_height) as i32;
    Rectangle::new(
        center_x.saturating_sub(width / 2),
        center_y.saturating_sub(height / 2),
        width,
        height,
    )
}
