use crate::error::{ConvertError, Result};
use crate::types::{
    BoundingBoxRecord, ImageMeta, NormalizedBox, Normalization, PixelRect, RejectedBox,
};
use crate::vocabulary::ClassVocabulary;

/// Convert absolute pixel boxes into YOLO boxes relative to the image size.
///
/// Fails with [`ConvertError::MissingImageSize`] when the image has a zero
/// dimension, in which case nothing is produced for it. Boxes with an unknown
/// label or an invalid rectangle are skipped one by one and listed in
/// [`Normalization::rejected`]; the remaining boxes keep their input order.
pub fn normalize(
    meta: &ImageMeta,
    boxes: &[BoundingBoxRecord],
    vocabulary: &ClassVocabulary,
) -> Result<Normalization> {
    if meta.width == 0 || meta.height == 0 {
        return Err(ConvertError::MissingImageSize(meta.filename.clone()));
    }

    let mut normalization = Normalization {
        boxes: Vec::with_capacity(boxes.len()),
        rejected: Vec::new(),
    };

    for (index, record) in boxes.iter().enumerate() {
        match normalize_box(meta, record, vocabulary) {
            Ok(normalized) => normalization.boxes.push(normalized),
            Err(reason) => normalization.rejected.push(RejectedBox { index, reason }),
        }
    }

    Ok(normalization)
}

fn normalize_box(
    meta: &ImageMeta,
    record: &BoundingBoxRecord,
    vocabulary: &ClassVocabulary,
) -> Result<NormalizedBox> {
    let class_id =
        vocabulary
            .class_id(&record.class_label)
            .ok_or_else(|| ConvertError::UnknownClass {
                label: record.class_label.clone(),
                valid: vocabulary.labels().to_vec(),
            })?;

    let BoundingBoxRecord {
        xmin,
        ymin,
        xmax,
        ymax,
        ..
    } = *record;
    if xmin >= xmax || ymin >= ymax {
        return Err(ConvertError::MalformedBox {
            label: record.class_label.clone(),
            xmin,
            ymin,
            xmax,
            ymax,
        });
    }

    let (image_w, image_h) = (meta.width as i64, meta.height as i64);
    if xmin < 0 || ymin < 0 || xmax > image_w || ymax > image_h {
        return Err(ConvertError::OutOfBounds {
            label: record.class_label.clone(),
            xmin,
            ymin,
            xmax,
            ymax,
            width: meta.width,
            height: meta.height,
        });
    }

    let image_w = meta.width as f64;
    let image_h = meta.height as f64;

    Ok(NormalizedBox {
        class_id,
        center_x: (xmin + xmax) as f64 / 2.0 / image_w,
        center_y: (ymin + ymax) as f64 / 2.0 / image_h,
        width: (xmax - xmin) as f64 / image_w,
        height: (ymax - ymin) as f64 / image_h,
    })
}

/// Map YOLO boxes back to corner coordinates in pixels
pub fn denormalize(meta: &ImageMeta, boxes: &[NormalizedBox]) -> Vec<PixelRect> {
    let image_w = meta.width as f64;
    let image_h = meta.height as f64;

    boxes
        .iter()
        .map(|b| {
            let width = b.width * image_w;
            let height = b.height * image_h;
            let x0 = b.center_x * image_w - width / 2.0;
            let y0 = b.center_y * image_h - height / 2.0;
            PixelRect {
                class_id: b.class_id,
                x0,
                y0,
                x1: x0 + width,
                y1: y0 + height,
            }
        })
        .collect()
}

/// Render boxes as the content of a YOLO label file: one line per box, no trailing newline
pub fn format_label_file(boxes: &[NormalizedBox]) -> String {
    let mut yolo_data = String::with_capacity(boxes.len() * 48);
    for (i, b) in boxes.iter().enumerate() {
        if i > 0 {
            yolo_data.push('\n');
        }
        yolo_data.push_str(&b.to_string());
    }
    yolo_data
}

/// Parse the content of a YOLO label file. Blank lines are ignored.
pub fn parse_label_file(content: &str) -> Result<Vec<NormalizedBox>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.parse::<NormalizedBox>()
                .map_err(|message| ConvertError::LabelLine {
                    line: idx + 1,
                    message,
                })
        })
        .collect()
}
