pub mod coordinate_log;
