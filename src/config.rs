use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Convert Pascal VOC XML annotations to YOLO format, split the dataset and check the result.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write one YOLO label file per VOC XML annotation
    Convert(ConvertArgs),
    /// Split images and label files into train/val/test and write dataset.yaml
    Partition(PartitionArgs),
    /// Draw the boxes of one label file onto its image
    Visualize(VisualizeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Dataset root containing the `images` and `annotations` directories
    #[arg(short = 'd', long = "dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Directory holding the VOC XML files [default: <dataset_dir>/annotations]
    #[arg(long = "annotations_dir")]
    pub annotations_dir: Option<PathBuf>,

    /// Existing directory to write label files to [default: the annotations directory]
    #[arg(long = "output_dir")]
    pub output_dir: Option<PathBuf>,

    /// Ordered list of class labels, replacing the built-in road sign classes
    #[arg(use_value_delimiter = true)]
    pub label_list: Vec<String>,
}

impl ConvertArgs {
    pub fn annotations_dir(&self) -> PathBuf {
        self.annotations_dir
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("annotations"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.annotations_dir())
    }
}

#[derive(Args, Debug, Clone)]
pub struct PartitionArgs {
    /// Dataset root; split directories and dataset.yaml are created here
    #[arg(short = 'd', long = "dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Directory holding the images [default: <dataset_dir>/images]
    #[arg(long = "images_dir")]
    pub images_dir: Option<PathBuf>,

    /// Directory holding the YOLO label files [default: <dataset_dir>/annotations]
    #[arg(long = "labels_dir")]
    pub labels_dir: Option<PathBuf>,

    /// Proportion of the dataset to use for validation
    #[arg(long = "val_size", default_value_t = 0.1, value_parser = validate_size)]
    pub val_size: f32,

    /// Proportion of the dataset to use for testing
    #[arg(long = "test_size", default_value_t = 0.1, value_parser = validate_size)]
    pub test_size: f32,

    /// Seed for random shuffling
    #[arg(long = "seed", default_value_t = 1)]
    pub seed: u64,

    /// Copy files into the splits instead of moving them
    #[arg(long = "copy")]
    pub copy: bool,

    /// Ordered list of class labels for dataset.yaml
    #[arg(use_value_delimiter = true)]
    pub label_list: Vec<String>,
}

impl PartitionArgs {
    pub fn images_dir(&self) -> PathBuf {
        self.images_dir
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("images"))
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.labels_dir
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("annotations"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct VisualizeArgs {
    /// Dataset root containing the `images` and `annotations` directories
    #[arg(short = 'd', long = "dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Directory holding the images [default: <dataset_dir>/images]
    #[arg(long = "images_dir")]
    pub images_dir: Option<PathBuf>,

    /// Directory holding the YOLO label files [default: <dataset_dir>/annotations]
    #[arg(long = "labels_dir")]
    pub labels_dir: Option<PathBuf>,

    /// Label file to draw; picked at random from the labels directory when absent
    #[arg(long = "label")]
    pub label: Option<PathBuf>,

    /// Seed for picking the label file
    #[arg(long = "seed", default_value_t = 0)]
    pub seed: u64,

    /// Where to save the annotated image [default: <dataset_dir>/annotation_check.png]
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// TrueType/OpenType font for writing class names above the boxes; names are only logged without it
    #[arg(long = "font")]
    pub font: Option<PathBuf>,

    /// Ordered list of class labels used to name the drawn boxes
    #[arg(use_value_delimiter = true)]
    pub label_list: Vec<String>,
}

impl VisualizeArgs {
    pub fn images_dir(&self) -> PathBuf {
        self.images_dir
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("images"))
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.labels_dir
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("annotations"))
    }

    pub fn output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("annotation_check.png"))
    }
}

// Validate that the size is between 0.0 and 1.0
pub fn validate_size(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}
