//! Pascal VOC to YOLO format converter
//!
//! This library converts Pascal VOC XML bounding-box annotations to YOLO label
//! files, partitions the dataset into train/val/test splits, and redraws the
//! converted boxes onto an image for a visual check.

pub mod config;
pub mod convert;
pub mod conversion;
pub mod error;
pub mod partition;
pub mod types;
pub mod utils;
pub mod visualize;
pub mod voc;
pub mod vocabulary;

// Re-export commonly used types and functions
pub use config::{Cli, Command, ConvertArgs, PartitionArgs, VisualizeArgs};
pub use conversion::{denormalize, format_label_file, normalize, parse_label_file};
pub use convert::{convert_annotation_file, process_annotations};
pub use error::{ConvertError, Result};
pub use partition::{partition_dataset, split_samples};
pub use types::{BoundingBoxRecord, ImageMeta, NormalizedBox, Normalization, PixelRect, SplitData};
pub use visualize::visualize_annotations;
pub use vocabulary::ClassVocabulary;
