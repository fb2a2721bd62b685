use log::{error, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::conversion::{format_label_file, normalize};
use crate::error::{ConvertError, Result};
use crate::types::{FileOutcome, ProcessingStats};
use crate::utils::{create_progress_bar, list_files_with_extension, require_directory};
use crate::vocabulary::ClassVocabulary;
use crate::voc::read_voc_file;

/// A converted annotation waiting to be written
#[derive(Debug)]
pub struct PreparedLabel {
    pub xml_path: PathBuf,
    pub image_name: String,
    pub content: String,
    pub boxes: usize,
    pub unknown_class: usize,
    pub malformed: usize,
}

/// Convert every VOC XML file in `annotations_dir` into a label file in `output_dir`.
///
/// Both directories must exist. Per-file problems are logged and counted in
/// the returned statistics instead of stopping the run.
pub fn process_annotations(
    annotations_dir: &Path,
    output_dir: &Path,
    vocabulary: &ClassVocabulary,
) -> Result<ProcessingStats> {
    let annotations_dir = require_directory(annotations_dir)?;
    let output_dir = require_directory(output_dir)?;

    let xml_files = list_files_with_extension(&annotations_dir, "xml")?;
    info!(
        "Found {} annotation files in {}",
        xml_files.len(),
        annotations_dir.display()
    );

    let pb = create_progress_bar(xml_files.len() as u64, "Convert");
    let prepared: Vec<_> = xml_files
        .par_iter()
        .map(|xml_path| {
            let prepared = prepare_annotation(xml_path, vocabulary);
            pb.inc(1);
            prepared
        })
        .collect();
    pb.finish_with_message("Conversion complete");

    // Output names are claimed in sorted input order, so collisions resolve
    // the same way on every run.
    let mut claimed = HashSet::new();
    let mut outcomes = Vec::with_capacity(xml_files.len());
    let mut pending = Vec::new();
    for (xml_path, prepared) in xml_files.iter().zip(prepared) {
        let claim = match prepared {
            Ok(Some(label)) => {
                claim_label_path(&label, &output_dir, &mut claimed).map(|path| Some((label, path)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        match claim {
            Ok(Some(job)) => pending.push(job),
            Ok(None) => outcomes.push(Ok(FileOutcome::SkippedMissingSize)),
            Err(e) => {
                error!(
                    "Failed to convert annotation {}: {}",
                    xml_path.display(),
                    e
                );
                outcomes.push(Err(e));
            }
        }
    }

    let written: Vec<_> = pending
        .par_iter()
        .map(|(label, label_path)| {
            let outcome = write_label(label, label_path);
            if let Err(e) = &outcome {
                error!(
                    "Failed to write labels for {}: {}",
                    label.xml_path.display(),
                    e
                );
            }
            outcome
        })
        .collect();
    outcomes.extend(written);

    let mut stats = ProcessingStats::new();
    for outcome in &outcomes {
        stats.record(outcome);
    }
    Ok(stats)
}

/// Convert a single VOC XML file and write `<output_dir>/<image stem>.txt`.
///
/// An annotation without image size produces no file at all.
pub fn convert_annotation_file(
    xml_path: &Path,
    output_dir: &Path,
    vocabulary: &ClassVocabulary,
) -> Result<FileOutcome> {
    match prepare_annotation(xml_path, vocabulary)? {
        Some(label) => {
            let label_path = label_path_for(output_dir, &label.image_name, xml_path);
            write_label(&label, &label_path)
        }
        None => Ok(FileOutcome::SkippedMissingSize),
    }
}

/// Parse and normalize one annotation. `None` means the image size is missing.
pub fn prepare_annotation(
    xml_path: &Path,
    vocabulary: &ClassVocabulary,
) -> Result<Option<PreparedLabel>> {
    let annotation = read_voc_file(xml_path)?;
    let xml_name = xml_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(meta) = annotation.image_meta(&xml_name) else {
        let name = annotation.image_filename().unwrap_or(&xml_name);
        warn!("Skipping {} due to missing image size info.", name);
        return Ok(None);
    };

    let normalization = match normalize(&meta, &annotation.boxes(), vocabulary) {
        Ok(normalization) => normalization,
        Err(ConvertError::MissingImageSize(name)) => {
            warn!("Skipping {} due to missing image size info.", name);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let mut unknown_class = 0;
    let mut malformed = 0;
    for rejected in &normalization.rejected {
        match rejected.reason {
            ConvertError::UnknownClass { .. } => unknown_class += 1,
            _ => malformed += 1,
        }
        warn!(
            "{} (object #{} in {})",
            rejected.reason, rejected.index, meta.filename
        );
    }

    Ok(Some(PreparedLabel {
        xml_path: xml_path.to_path_buf(),
        content: format_label_file(&normalization.boxes),
        boxes: normalization.boxes.len(),
        image_name: meta.filename,
        unknown_class,
        malformed,
    }))
}

/// Write a prepared label file
pub fn write_label(label: &PreparedLabel, label_path: &Path) -> Result<FileOutcome> {
    let mut writer = BufWriter::new(File::create(label_path)?);
    writer.write_all(label.content.as_bytes())?;
    writer.flush()?;

    Ok(FileOutcome::Written {
        label_path: label_path.to_path_buf(),
        boxes: label.boxes,
        unknown_class: label.unknown_class,
        malformed: label.malformed,
    })
}

/// Pick an unused output path: the image stem, else the XML stem
fn claim_label_path(
    label: &PreparedLabel,
    output_dir: &Path,
    claimed: &mut HashSet<PathBuf>,
) -> Result<PathBuf> {
    let preferred = label_path_for(output_dir, &label.image_name, &label.xml_path);
    if claimed.insert(preferred.clone()) {
        return Ok(preferred);
    }

    let fallback = label_path_from_stem(output_dir, label.xml_path.file_stem());
    if claimed.insert(fallback.clone()) {
        warn!(
            "{} is already written for another annotation; labels of {} go to {}",
            preferred.display(),
            label.xml_path.display(),
            fallback.display()
        );
        Ok(fallback)
    } else {
        Err(ConvertError::OutputCollision(preferred))
    }
}

/// Output path for an image: its sanitized stem with a `.txt` extension
pub fn label_path_for(output_dir: &Path, image_filename: &str, xml_path: &Path) -> PathBuf {
    let stem = Path::new(image_filename)
        .file_stem()
        .or_else(|| xml_path.file_stem());
    label_path_from_stem(output_dir, stem)
}

fn label_path_from_stem(output_dir: &Path, stem: Option<&OsStr>) -> PathBuf {
    let stem = stem
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = sanitize_filename::sanitize(stem);
    name.push_str(".txt");
    output_dir.join(name)
}
