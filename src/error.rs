use std::path::PathBuf;

/// Errors raised while reading, converting, splitting or drawing annotations.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// The annotation carries no usable `<size>` element.
    #[error("missing image size information for {0}")]
    MissingImageSize(String),

    /// The object label is not part of the class vocabulary.
    #[error("invalid class '{label}', must be one of {valid:?}")]
    UnknownClass { label: String, valid: Vec<String> },

    /// The rectangle is inverted or has zero area.
    #[error("malformed box '{label}' ({xmin}, {ymin}, {xmax}, {ymax}): min must be below max")]
    MalformedBox {
        label: String,
        xmin: i64,
        ymin: i64,
        xmax: i64,
        ymax: i64,
    },

    /// The rectangle reaches outside the image.
    #[error(
        "box '{label}' ({xmin}, {ymin}, {xmax}, {ymax}) lies outside the {width}x{height} image"
    )]
    OutOfBounds {
        label: String,
        xmin: i64,
        ymin: i64,
        xmax: i64,
        ymax: i64,
        width: u32,
        height: u32,
    },

    /// Two annotations map to the same label file and no fallback name is free.
    #[error("label file {0} is already claimed by another annotation")]
    OutputCollision(PathBuf),

    #[error("invalid font file: {0}")]
    InvalidFont(PathBuf),

    #[error("directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("failed to parse annotation {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: serde_xml_rs::Error,
    },

    #[error("invalid label line {line}: {message}")]
    LabelLine { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
