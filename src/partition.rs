use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::PartitionArgs;
use crate::error::Result;
use crate::types::{is_image_file, SamplePair, Split, SplitData};
use crate::utils::{create_progress_bar, ensure_directory, move_file, require_directory};
use crate::vocabulary::ClassVocabulary;

/// Pair every image in `images_dir` with `<labels_dir>/<stem>.txt`, sorted by image path
pub fn collect_sample_pairs(images_dir: &Path, labels_dir: &Path) -> Result<Vec<SamplePair>> {
    let mut pairs = Vec::new();
    for entry in fs::read_dir(images_dir)? {
        let image = entry?.path();
        if !image.is_file() || !is_image_file(&image) {
            continue;
        }
        let Some(stem) = image.file_stem() else {
            continue;
        };
        let mut label_name = stem.to_os_string();
        label_name.push(".txt");
        pairs.push(SamplePair {
            label: labels_dir.join(label_name),
            image,
        });
    }
    pairs.sort();
    Ok(pairs)
}

/// Shuffle the pairs with a seeded RNG and cut them into test, val and train, in that order.
///
/// Split sizes are `ceil(n * size)`, clamped so the three splits always cover
/// the input exactly once.
pub fn split_samples(
    mut samples: Vec<SamplePair>,
    val_size: f32,
    test_size: f32,
    seed: u64,
) -> SplitData {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let test_len = ((total as f32 * test_size).ceil() as usize).min(total);
    let val_len = ((total as f32 * val_size).ceil() as usize).min(total - test_len);

    let test = samples.drain(0..test_len).collect();
    let val = samples.drain(0..val_len).collect();

    SplitData {
        train: samples,
        val,
        test,
    }
}

/// Output directories for one split
#[derive(Debug, Clone)]
pub struct SplitDirs {
    pub images: PathBuf,
    pub labels: PathBuf,
}

/// Create `images/<split>` and `labels/<split>` under the dataset root
pub fn setup_split_directories(dataset_dir: &Path, split: Split) -> Result<SplitDirs> {
    Ok(SplitDirs {
        images: ensure_directory(&dataset_dir.join("images").join(split.dir_name()))?,
        labels: ensure_directory(&dataset_dir.join("labels").join(split.dir_name()))?,
    })
}

fn transfer(src: &Path, dst_dir: &Path, copy: bool) -> std::io::Result<()> {
    let Some(name) = src.file_name() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no file name",
        ));
    };
    let dst = dst_dir.join(name);
    if copy {
        fs::copy(src, dst).map(|_| ())
    } else {
        move_file(src, &dst)
    }
}

/// Move (or copy) every pair of a split into its directories.
///
/// Returns the number of pairs whose image and label both arrived.
pub fn transfer_split(samples: &[SamplePair], dirs: &SplitDirs, copy: bool, label: &str) -> usize {
    let pb = create_progress_bar(samples.len() as u64, label);
    let mut complete = 0;
    for pair in samples {
        let image_ok = match transfer(&pair.image, &dirs.images, copy) {
            Ok(()) => true,
            Err(e) => {
                error!("Error moving file {}: {}", pair.image.display(), e);
                false
            }
        };
        // A label only moves together with its image.
        let label_ok = if !image_ok {
            warn!(
                "Leaving {} in place because its image was not transferred",
                pair.label.display()
            );
            false
        } else if pair.label.is_file() {
            match transfer(&pair.label, &dirs.labels, copy) {
                Ok(()) => true,
                Err(e) => {
                    error!("Error moving file {}: {}", pair.label.display(), e);
                    false
                }
            }
        } else {
            warn!("File not found: {}. Skipping.", pair.label.display());
            false
        };
        if image_ok && label_ok {
            complete += 1;
        }
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} split complete", label));
    complete
}

/// Create the dataset.yaml file for YOLO training
pub fn create_dataset_yaml(
    dataset_dir: &Path,
    vocabulary: &ClassVocabulary,
    has_test_split: bool,
) -> Result<PathBuf> {
    let dataset_yaml_path = dataset_dir.join("dataset.yaml");
    let mut dataset_yaml = BufWriter::new(File::create(&dataset_yaml_path)?);
    let absolute_path = fs::canonicalize(dataset_dir)?;
    let mut yaml_content = format!(
        "path: {}\ntrain: images/train\nval: images/val\n",
        absolute_path.to_string_lossy()
    );
    if has_test_split {
        yaml_content.push_str("test: images/test\n");
    } else {
        yaml_content.push_str("test:\n");
    }
    yaml_content.push_str("\nnames:\n");
    for (id, label) in vocabulary.labels().iter().enumerate() {
        yaml_content.push_str(&format!("    {}: {}\n", id, label));
    }
    dataset_yaml.write_all(yaml_content.as_bytes())?;
    dataset_yaml.flush()?;
    Ok(dataset_yaml_path)
}

/// Split the dataset described by `args` and write dataset.yaml
pub fn partition_dataset(args: &PartitionArgs) -> Result<SplitData> {
    let dataset_dir = require_directory(&args.dataset_dir)?;
    let images_dir = require_directory(&args.images_dir())?;
    let labels_dir = args.labels_dir();
    if !labels_dir.is_dir() {
        warn!(
            "Labels directory {} not found; images will be split without labels",
            labels_dir.display()
        );
    }

    let samples = collect_sample_pairs(&images_dir, &labels_dir)?;
    info!("Found {} images in {}", samples.len(), images_dir.display());

    let split_data = split_samples(samples, args.val_size, args.test_size, args.seed);
    info!(
        "Split sizes: train {}, val {}, test {}",
        split_data.train.len(),
        split_data.val.len(),
        split_data.test.len()
    );

    for split in Split::ALL {
        let dirs = setup_split_directories(&dataset_dir, split)?;
        let samples = split_data.get(split);
        let complete = transfer_split(samples, &dirs, args.copy, split.dir_name());
        if complete < samples.len() {
            warn!(
                "{}: {} of {} pairs were incomplete",
                split.dir_name(),
                samples.len() - complete,
                samples.len()
            );
        }
    }

    let vocabulary = ClassVocabulary::from_label_list(&args.label_list);
    let yaml_path = create_dataset_yaml(&dataset_dir, &vocabulary, !split_data.test.is_empty())?;
    info!("Wrote {}", yaml_path.display());
    info!("Dataset partitioning complete.");

    Ok(split_data)
}
