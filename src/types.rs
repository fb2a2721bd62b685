use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ConvertError;

// Supported image formats
pub const IMG_FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// Whether the path has one of the supported image extensions (case-insensitive)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| get_image_extensions_set().contains(&ext.to_lowercase()))
}

/// A class label with an absolute pixel rectangle, as read from a VOC object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBoxRecord {
    pub class_label: String,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

/// Name and pixel dimensions of an annotated image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl ImageMeta {
    pub fn new(filename: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            filename: filename.into(),
            width,
            height,
        }
    }
}

/// A box in YOLO form: class index plus center and size as fractions of the image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
    pub class_id: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for NormalizedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.center_x, self.center_y, self.width, self.height
        )
    }
}

impl FromStr for NormalizedBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Take at most 6 tokens so a long line does not allocate unbounded memory.
        let tokens: Vec<&str> = s.split_whitespace().take(6).collect();
        if tokens.len() != 5 {
            return Err(format!("expected 5 fields, found {}", tokens.len()));
        }

        let class_id = tokens[0]
            .parse::<usize>()
            .map_err(|_| format!("invalid class id '{}'", tokens[0]))?;
        let field = |idx: usize, name: &str| {
            tokens[idx]
                .parse::<f64>()
                .map_err(|_| format!("invalid {} '{}'", name, tokens[idx]))
        };

        Ok(NormalizedBox {
            class_id,
            center_x: field(1, "center_x")?,
            center_y: field(2, "center_y")?,
            width: field(3, "width")?,
            height: field(4, "height")?,
        })
    }
}

/// An absolute rectangle in pixel space, recovered from a normalized box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub class_id: usize,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// A box dropped by the normalizer, with its position in the input
#[derive(Debug)]
pub struct RejectedBox {
    pub index: usize,
    pub reason: ConvertError,
}

/// Accepted boxes in input order, plus everything that was skipped
#[derive(Debug, Default)]
pub struct Normalization {
    pub boxes: Vec<NormalizedBox>,
    pub rejected: Vec<RejectedBox>,
}

/// What happened to a single annotation file
#[derive(Debug)]
pub enum FileOutcome {
    Written {
        label_path: PathBuf,
        boxes: usize,
        unknown_class: usize,
        malformed: usize,
    },
    SkippedMissingSize,
}

// The three dataset splits
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

/// An image and the label file that travels with it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplePair {
    pub image: PathBuf,
    pub label: PathBuf,
}

// Struct to hold the split datasets for training, validation, and testing
#[derive(Debug, Default)]
pub struct SplitData {
    pub train: Vec<SamplePair>,
    pub val: Vec<SamplePair>,
    pub test: Vec<SamplePair>,
}

impl SplitData {
    pub fn get(&self, split: Split) -> &[SamplePair] {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Struct to hold processing statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub total_files_processed: usize,
    pub successful_conversions: usize,
    pub skipped_missing_size: usize,
    pub failed_conversions: usize,
    pub boxes_written: usize,
    pub boxes_unknown_class: usize,
    pub boxes_malformed: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the result of one file into the counters
    pub fn record(&mut self, outcome: &Result<FileOutcome, ConvertError>) {
        self.total_files_processed += 1;
        match outcome {
            Ok(FileOutcome::Written {
                boxes,
                unknown_class,
                malformed,
                ..
            }) => {
                self.successful_conversions += 1;
                self.boxes_written += boxes;
                self.boxes_unknown_class += unknown_class;
                self.boxes_malformed += malformed;
            }
            Ok(FileOutcome::SkippedMissingSize) => self.skipped_missing_size += 1,
            Err(_) => self.failed_conversions += 1,
        }
    }

    pub fn print_summary(&self) {
        log::info!("=== Processing Summary ===");
        log::info!("Total files processed: {}", self.total_files_processed);
        log::info!("Successful conversions: {}", self.successful_conversions);
        log::info!("Boxes written: {}", self.boxes_written);
        log::info!("Skipped (missing image size): {}", self.skipped_missing_size);
        log::info!("Failed conversions: {}", self.failed_conversions);

        let rejected = self.boxes_unknown_class + self.boxes_malformed;
        if rejected > 0 {
            log::warn!(
                "Total rejected boxes: {} (unknown class: {}, malformed: {})",
                rejected,
                self.boxes_unknown_class,
                self.boxes_malformed
            );
        }
    }
}
