//! Pascal VOC annotation reader
//!
//! Only the elements the converter needs are modelled; everything else in the
//! XML (`folder`, `pose`, `truncated`, `difficult`, ...) is ignored.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::types::{BoundingBoxRecord, ImageMeta};

/// A parsed `<annotation>` document
#[derive(Debug, Clone)]
pub struct VocAnnotation {
    pub filename: Option<String>,
    pub size: Option<VocSize>,
    pub objects: Vec<VocObject>,
}

// Children are visited one at a time so `<object>` elements are collected
// wherever they appear, not only as one contiguous run.
impl<'de> Deserialize<'de> for VocAnnotation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AnnotationVisitor;

        impl<'de> Visitor<'de> for AnnotationVisitor {
            type Value = VocAnnotation;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a VOC annotation element")
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<VocAnnotation, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut filename = None;
                let mut size = None;
                let mut objects = Vec::new();

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "filename" => {
                            filename = map.next_value::<Option<String>>()?;
                        }
                        "size" => {
                            size = Some(map.next_value::<VocSize>()?);
                        }
                        "object" => {
                            objects.push(map.next_value::<VocObject>()?);
                        }
                        _ => {
                            map.next_value::<de::IgnoredAny>()?;
                        }
                    }
                }

                Ok(VocAnnotation {
                    filename,
                    size,
                    objects,
                })
            }
        }

        const FIELDS: &[&str] = &["filename", "size", "object"];
        deserializer.deserialize_struct("annotation", FIELDS, AnnotationVisitor)
    }
}

// Kept as text: empty or non-numeric entries mean the size is unknown.
#[derive(Debug, Clone, Deserialize)]
pub struct VocSize {
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub depth: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VocObject {
    pub name: String,
    pub bndbox: VocBndBox,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VocBndBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

fn parse_dimension(value: &Option<String>) -> Option<u32> {
    value
        .as_deref()
        .map(str::trim)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&v| v > 0)
}

impl VocAnnotation {
    /// The image file name, or `None` when the element is missing or blank
    pub fn image_filename(&self) -> Option<&str> {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Image dimensions, when the `<size>` element is complete and non-zero
    pub fn image_meta(&self, fallback_name: &str) -> Option<ImageMeta> {
        let size = self.size.as_ref()?;
        let width = parse_dimension(&size.width)?;
        let height = parse_dimension(&size.height)?;
        let filename = self.image_filename().unwrap_or(fallback_name);
        Some(ImageMeta::new(filename, width, height))
    }

    /// The objects as bounding box records, in document order
    pub fn boxes(&self) -> Vec<BoundingBoxRecord> {
        self.objects
            .iter()
            .map(|object| BoundingBoxRecord {
                class_label: object.name.trim().to_string(),
                xmin: object.bndbox.xmin,
                ymin: object.bndbox.ymin,
                xmax: object.bndbox.xmax,
                ymax: object.bndbox.ymax,
            })
            .collect()
    }
}

/// Parse a VOC annotation from an XML string
pub fn parse_voc_str(xml: &str) -> std::result::Result<VocAnnotation, serde_xml_rs::Error> {
    serde_xml_rs::from_str(xml)
}

/// Read and parse a VOC annotation file
pub fn read_voc_file(path: &Path) -> Result<VocAnnotation> {
    let xml_content = fs::read_to_string(path)?;
    parse_voc_str(&xml_content).map_err(|source| ConvertError::Xml {
        path: path.to_path_buf(),
        source,
    })
}
