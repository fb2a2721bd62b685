use ab_glyph::{Font, FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::VisualizeArgs;
use crate::conversion::{denormalize, parse_label_file};
use crate::error::{ConvertError, Result};
use crate::types::{ImageMeta, PixelRect, IMG_FORMATS};
use crate::utils::{list_files_with_extension, require_directory};
use crate::vocabulary::ClassVocabulary;

pub const BOX_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BOX_THICKNESS: u32 = 3;
pub const LABEL_SCALE: f32 = 12.0;

/// Load a TrueType/OpenType font for class names
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes = fs::read(path)?;
    FontVec::try_from_vec(bytes).map_err(|_| ConvertError::InvalidFont(path.to_path_buf()))
}

/// Pick one label file from `labels_dir` with a seeded RNG
pub fn choose_label_file(labels_dir: &Path, seed: u64) -> Result<Option<PathBuf>> {
    let candidates = list_files_with_extension(labels_dir, "txt")?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(candidates.choose(&mut rng).cloned())
}

/// Look for `<images_dir>/<stem>.<ext>` over the supported image formats
pub fn find_image_for_label(images_dir: &Path, label_path: &Path) -> Option<PathBuf> {
    let stem = label_path.file_stem()?;
    IMG_FORMATS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_uppercase()])
        .map(|ext| {
            let mut name = stem.to_os_string();
            name.push(".");
            name.push(ext);
            images_dir.join(name)
        })
        .find(|candidate| candidate.is_file())
}

/// Draw hollow rectangles onto the image, clipped to its bounds
pub fn draw_boxes(img: &mut RgbaImage, rects: &[PixelRect], color: Rgba<u8>, thickness: u32) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;

    for rect in rects {
        let x0 = rect.x0.round().clamp(0.0, max_x) as u32;
        let y0 = rect.y0.round().clamp(0.0, max_y) as u32;
        let x1 = rect.x1.round().clamp(0.0, max_x) as u32;
        let y1 = rect.y1.round().clamp(0.0, max_y) as u32;
        if x1 < x0 || y1 < y0 {
            continue;
        }

        // The border grows inwards from the rectangle edges.
        for t in 0..thickness {
            let (left, right) = (x0 + t, x1.saturating_sub(t));
            let (top, bottom) = (y0 + t, y1.saturating_sub(t));
            if left > right || top > bottom {
                break;
            }
            for x in left..=right {
                img.put_pixel(x, top, color);
                img.put_pixel(x, bottom, color);
            }
            for y in top..=bottom {
                img.put_pixel(left, y, color);
                img.put_pixel(right, y, color);
            }
        }
    }
}

/// Write each box's class name just above its top-left corner
pub fn draw_labels<F: Font>(
    img: &mut RgbaImage,
    rects: &[PixelRect],
    vocabulary: &ClassVocabulary,
    font: &F,
    color: Rgba<u8>,
) {
    let scale = PxScale::from(LABEL_SCALE);
    for rect in rects {
        let name = vocabulary.label(rect.class_id).unwrap_or("<unknown>");
        let x = rect.x0.round().max(0.0) as i32;
        let y = (rect.y0 - LABEL_SCALE as f64).round().max(0.0) as i32;
        draw_text_mut(img, color, x, y, scale, font, name);
    }
}

/// Draw the boxes of one label file onto its image and save the result.
///
/// Returns the output path, or `None` when there was nothing to draw.
pub fn visualize_annotations(args: &VisualizeArgs) -> Result<Option<PathBuf>> {
    let images_dir = require_directory(&args.images_dir())?;
    let font = args.font.as_deref().map(load_font).transpose()?;

    let label_path = match &args.label {
        Some(label) => label.clone(),
        None => {
            let labels_dir = require_directory(&args.labels_dir())?;
            match choose_label_file(&labels_dir, args.seed)? {
                Some(path) => path,
                None => {
                    warn!("No .txt annotation files found in {}", labels_dir.display());
                    return Ok(None);
                }
            }
        }
    };

    let boxes = parse_label_file(&fs::read_to_string(&label_path)?)?;
    if boxes.is_empty() {
        warn!(
            "Annotation file {} is empty. Cannot process.",
            label_path.display()
        );
        return Ok(None);
    }

    let Some(image_path) = find_image_for_label(&images_dir, &label_path) else {
        warn!(
            "Could not find corresponding image for {}",
            label_path.display()
        );
        return Ok(None);
    };

    let mut img = image::open(&image_path)?.to_rgba8();
    let meta = ImageMeta::new(
        image_path.to_string_lossy(),
        img.width(),
        img.height(),
    );
    let rects = denormalize(&meta, &boxes);

    let vocabulary = ClassVocabulary::from_label_list(&args.label_list);
    for rect in &rects {
        let name = vocabulary.label(rect.class_id).unwrap_or("<unknown>");
        info!(
            "{} ({}): ({:.1}, {:.1}) - ({:.1}, {:.1})",
            name, rect.class_id, rect.x0, rect.y0, rect.x1, rect.y1
        );
    }
    draw_boxes(&mut img, &rects, BOX_COLOR, BOX_THICKNESS);
    if let Some(font) = &font {
        draw_labels(&mut img, &rects, &vocabulary, font, BOX_COLOR);
    }

    let output = args.output();
    img.save(&output)?;
    info!("Annotation test image saved to: {}", output.display());
    Ok(Some(output))
}
