pub mod candidate_extraction;
pub mod class_table;
pub mod detection_result;
pub mod object_detection_model;
pub mod object_detection_utils;
pub mod object_detector;
pub mod ort_inference_session;
