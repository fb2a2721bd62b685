use image::{Rgba, RgbaImage};
use std::fs;
use std::path::Path;

use voc2yolo::partition::{setup_split_directories, transfer_split};
use voc2yolo::types::{FileOutcome, PixelRect, SamplePair, Split};
use voc2yolo::visualize::{draw_boxes, draw_labels, find_image_for_label, load_font, BOX_COLOR};
use voc2yolo::{
    convert_annotation_file, partition_dataset, process_annotations, visualize_annotations,
    ClassVocabulary, ConvertError, PartitionArgs, VisualizeArgs,
};

fn voc_xml(filename: &str, size: Option<(u32, u32)>, objects: &[(&str, [i64; 4])]) -> String {
    let mut xml = format!("<annotation>\n<folder>images</folder>\n<filename>{filename}</filename>\n");
    if let Some((width, height)) = size {
        xml.push_str(&format!(
            "<size><width>{width}</width><height>{height}</height><depth>3</depth></size>\n"
        ));
    }
    for (name, [xmin, ymin, xmax, ymax]) in objects {
        xml.push_str(&format!(
            "<object><name>{name}</name><pose>Unspecified</pose><difficult>0</difficult>\
             <bndbox><xmin>{xmin}</xmin><ymin>{ymin}</ymin><xmax>{xmax}</xmax><ymax>{ymax}</ymax></bndbox></object>\n"
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

#[test]
fn test_convert_annotation_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let xml_path = temp_dir.path().join("road0.xml");
    write(
        &xml_path,
        &voc_xml(
            "road0.png",
            Some((300, 300)),
            &[
                ("stop", [50, 50, 150, 150]),
                ("unknown_sign", [0, 0, 10, 10]),
                ("crosswalk", [0, 150, 300, 300]),
            ],
        ),
    );

    let outcome =
        convert_annotation_file(&xml_path, temp_dir.path(), &ClassVocabulary::default()).unwrap();
    match outcome {
        FileOutcome::Written {
            label_path,
            boxes,
            unknown_class,
            malformed,
        } => {
            assert_eq!(label_path, temp_dir.path().join("road0.txt"));
            assert_eq!(boxes, 2);
            assert_eq!(unknown_class, 1);
            assert_eq!(malformed, 0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let content = fs::read_to_string(temp_dir.path().join("road0.txt")).unwrap();
    assert_eq!(
        content,
        "1 0.333333 0.333333 0.333333 0.333333\n3 0.500000 0.750000 1.000000 0.500000"
    );
}

#[test]
fn test_missing_size_writes_no_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let xml_path = temp_dir.path().join("road1.xml");
    write(
        &xml_path,
        &voc_xml("road1.png", None, &[("stop", [1, 1, 5, 5])]),
    );

    let outcome =
        convert_annotation_file(&xml_path, temp_dir.path(), &ClassVocabulary::default()).unwrap();
    assert!(matches!(outcome, FileOutcome::SkippedMissingSize));
    assert!(!temp_dir.path().join("road1.txt").exists());
}

#[test]
fn test_process_annotations_counts_outcomes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let annotations_dir = temp_dir.path().join("annotations");
    let labels_dir = temp_dir.path().join("labels");
    fs::create_dir_all(&annotations_dir).unwrap();
    fs::create_dir_all(&labels_dir).unwrap();

    write(
        &annotations_dir.join("road0.xml"),
        &voc_xml(
            "road0.png",
            Some((400, 200)),
            &[("trafficlight", [10, 10, 30, 70]), ("stop", [300, 20, 390, 110])],
        ),
    );
    write(
        &annotations_dir.join("road1.xml"),
        &voc_xml("road1.png", None, &[("stop", [1, 1, 5, 5])]),
    );
    write(
        &annotations_dir.join("road2.xml"),
        &voc_xml("road2.png", Some((100, 100)), &[("speedlimit", [60, 60, 20, 20])]),
    );
    write(&annotations_dir.join("road3.xml"), "<annotation><object>");
    write(&annotations_dir.join("notes.txt"), "not an annotation");

    let stats =
        process_annotations(&annotations_dir, &labels_dir, &ClassVocabulary::default()).unwrap();
    assert_eq!(stats.total_files_processed, 4);
    assert_eq!(stats.successful_conversions, 2);
    assert_eq!(stats.skipped_missing_size, 1);
    assert_eq!(stats.failed_conversions, 1);
    assert_eq!(stats.boxes_written, 2);
    assert_eq!(stats.boxes_malformed, 1);

    assert_eq!(
        fs::read_to_string(labels_dir.join("road0.txt"))
            .unwrap()
            .lines()
            .count(),
        2
    );
    assert_eq!(fs::read_to_string(labels_dir.join("road2.txt")).unwrap(), "");
    assert!(!labels_dir.join("road1.txt").exists());
}

#[test]
fn test_process_annotations_shared_image_name() {
    let temp_dir = tempfile::tempdir().unwrap();
    let annotations_dir = temp_dir.path().join("annotations");
    let labels_dir = temp_dir.path().join("labels");
    fs::create_dir_all(&annotations_dir).unwrap();
    fs::create_dir_all(&labels_dir).unwrap();

    // All three point at road0.png; road0.xml has no free name left.
    write(
        &annotations_dir.join("a.xml"),
        &voc_xml("road0.png", Some((100, 100)), &[("stop", [10, 10, 30, 30])]),
    );
    write(
        &annotations_dir.join("b.xml"),
        &voc_xml("road0.png", Some((100, 100)), &[("crosswalk", [50, 50, 90, 90])]),
    );
    write(
        &annotations_dir.join("road0.xml"),
        &voc_xml("road0.png", Some((100, 100)), &[("trafficlight", [0, 0, 10, 10])]),
    );

    let stats =
        process_annotations(&annotations_dir, &labels_dir, &ClassVocabulary::default()).unwrap();
    assert_eq!(stats.total_files_processed, 3);
    assert_eq!(stats.successful_conversions, 2);
    assert_eq!(stats.failed_conversions, 1);

    let first = fs::read_to_string(labels_dir.join("road0.txt")).unwrap();
    let second = fs::read_to_string(labels_dir.join("b.txt")).unwrap();
    assert_eq!(first, "1 0.200000 0.200000 0.200000 0.200000");
    assert_eq!(second, "3 0.700000 0.700000 0.400000 0.400000");
    assert_eq!(fs::read_dir(&labels_dir).unwrap().count(), 2);
}

#[test]
fn test_process_annotations_requires_output_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing");
    let err = process_annotations(temp_dir.path(), &missing, &ClassVocabulary::default())
        .unwrap_err();
    match err {
        ConvertError::MissingDirectory(path) => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_partition_dataset() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset_dir = temp_dir.path();
    let images_dir = dataset_dir.join("images");
    let annotations_dir = dataset_dir.join("annotations");
    fs::create_dir_all(&images_dir).unwrap();
    fs::create_dir_all(&annotations_dir).unwrap();

    for i in 0..10 {
        write(&images_dir.join(format!("road{i}.png")), "png");
        if i != 4 {
            write(
                &annotations_dir.join(format!("road{i}.txt")),
                &format!("1 0.5 0.5 0.{i} 0.{i}"),
            );
        }
    }
    write(&images_dir.join("README.md"), "not an image");

    let args = PartitionArgs {
        dataset_dir: dataset_dir.to_path_buf(),
        images_dir: None,
        labels_dir: None,
        val_size: 0.1,
        test_size: 0.1,
        seed: 1,
        copy: false,
        label_list: vec![],
    };
    let split_data = partition_dataset(&args).unwrap();
    assert_eq!(split_data.len(), 10);
    assert_eq!(split_data.train.len(), 8);
    assert_eq!(split_data.val.len(), 1);
    assert_eq!(split_data.test.len(), 1);

    let mut seen = Vec::new();
    for split in ["train", "val", "test"] {
        let split_images = images_dir.join(split);
        let split_labels = dataset_dir.join("labels").join(split);
        for entry in fs::read_dir(&split_images).unwrap() {
            let image = entry.unwrap().path();
            let stem = image.file_stem().unwrap().to_string_lossy().into_owned();
            if stem != "road4" {
                assert!(split_labels.join(format!("{stem}.txt")).is_file());
            }
            seen.push(stem);
        }
        let images = fs::read_dir(&split_images).unwrap().count();
        let labels = fs::read_dir(&split_labels).unwrap().count();
        assert!(labels == images || labels + 1 == images);
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 10);

    // Everything was moved out of the source directories.
    assert!(!images_dir.join("road0.png").exists());
    assert!(images_dir.join("README.md").exists());
    assert_eq!(fs::read_dir(&annotations_dir).unwrap().count(), 0);

    let yaml = fs::read_to_string(dataset_dir.join("dataset.yaml")).unwrap();
    assert!(yaml.contains("path:"));
    assert!(yaml.contains("train: images/train"));
    assert!(yaml.contains("val: images/val"));
    assert!(yaml.contains("test: images/test"));
    assert!(yaml.contains("names:\n    0: trafficlight\n    1: stop\n    2: speedlimit\n    3: crosswalk\n"));
}

#[test]
fn test_partition_dataset_copy_keeps_sources() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset_dir = temp_dir.path();
    let images_dir = dataset_dir.join("images");
    let annotations_dir = dataset_dir.join("annotations");
    fs::create_dir_all(&images_dir).unwrap();
    fs::create_dir_all(&annotations_dir).unwrap();
    for i in 0..4 {
        write(&images_dir.join(format!("road{i}.jpg")), "jpg");
        write(&annotations_dir.join(format!("road{i}.txt")), "0 0.5 0.5 0.1 0.1");
    }

    let args = PartitionArgs {
        dataset_dir: dataset_dir.to_path_buf(),
        images_dir: None,
        labels_dir: None,
        val_size: 0.25,
        test_size: 0.0,
        seed: 3,
        copy: true,
        label_list: vec!["sign".to_string()],
    };
    let split_data = partition_dataset(&args).unwrap();
    assert_eq!(split_data.train.len(), 3);
    assert_eq!(split_data.val.len(), 1);
    assert!(split_data.test.is_empty());

    assert!(images_dir.join("road0.jpg").exists());
    assert_eq!(fs::read_dir(&annotations_dir).unwrap().count(), 4);

    let yaml = fs::read_to_string(dataset_dir.join("dataset.yaml")).unwrap();
    assert!(yaml.contains("test:\n"));
    assert!(yaml.contains("    0: sign\n"));
}

#[test]
fn test_transfer_split_keeps_orphan_label() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset_dir = temp_dir.path();
    let annotations_dir = dataset_dir.join("annotations");
    fs::create_dir_all(&annotations_dir).unwrap();
    let label = annotations_dir.join("road0.txt");
    write(&label, "1 0.5 0.5 0.2 0.2");

    let dirs = setup_split_directories(dataset_dir, Split::Train).unwrap();
    let samples = vec![SamplePair {
        image: dataset_dir.join("images").join("road0.png"),
        label: label.clone(),
    }];
    assert_eq!(transfer_split(&samples, &dirs, false, "train"), 0);

    assert!(label.is_file());
    assert_eq!(fs::read_dir(&dirs.images).unwrap().count(), 0);
    assert_eq!(fs::read_dir(&dirs.labels).unwrap().count(), 0);
}

#[test]
fn test_draw_boxes() {
    let background = Rgba([0, 0, 0, 255]);
    let mut img = RgbaImage::from_pixel(20, 20, background);
    let rect = PixelRect {
        class_id: 0,
        x0: 2.0,
        y0: 3.0,
        x1: 10.0,
        y1: 12.0,
    };
    draw_boxes(&mut img, &[rect], BOX_COLOR, 3);

    assert_eq!(*img.get_pixel(2, 3), BOX_COLOR);
    assert_eq!(*img.get_pixel(10, 12), BOX_COLOR);
    assert_eq!(*img.get_pixel(4, 7), BOX_COLOR);
    assert_eq!(*img.get_pixel(5, 7), background);
    assert_eq!(*img.get_pixel(1, 3), background);
    assert_eq!(*img.get_pixel(11, 12), background);

    // Boxes reaching past the border are clipped, not dropped.
    let outside = PixelRect {
        class_id: 0,
        x0: -5.0,
        y0: -5.0,
        x1: 25.0,
        y1: 25.0,
    };
    draw_boxes(&mut img, &[outside], BOX_COLOR, 1);
    assert_eq!(*img.get_pixel(0, 15), BOX_COLOR);
    assert_eq!(*img.get_pixel(19, 19), BOX_COLOR);
}

#[test]
fn test_visualize_annotations() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset_dir = temp_dir.path();
    let images_dir = dataset_dir.join("images");
    let annotations_dir = dataset_dir.join("annotations");
    fs::create_dir_all(&images_dir).unwrap();
    fs::create_dir_all(&annotations_dir).unwrap();

    let background = Rgba([0, 0, 0, 255]);
    RgbaImage::from_pixel(100, 80, background)
        .save(images_dir.join("road0.png"))
        .unwrap();
    write(
        &annotations_dir.join("road0.txt"),
        "2 0.500000 0.500000 0.400000 0.500000",
    );
    assert_eq!(
        find_image_for_label(&images_dir, &annotations_dir.join("road0.txt")),
        Some(images_dir.join("road0.png"))
    );

    let args = VisualizeArgs {
        dataset_dir: dataset_dir.to_path_buf(),
        images_dir: None,
        labels_dir: None,
        label: None,
        seed: 0,
        output: None,
        font: None,
        label_list: vec![],
    };
    let output = visualize_annotations(&args).unwrap().unwrap();
    assert_eq!(output, dataset_dir.join("annotation_check.png"));

    let drawn = image::open(&output).unwrap().to_rgba8();
    assert_eq!(drawn.dimensions(), (100, 80));
    assert_eq!(*drawn.get_pixel(30, 20), BOX_COLOR);
    assert_eq!(*drawn.get_pixel(70, 60), BOX_COLOR);
    assert_eq!(*drawn.get_pixel(50, 40), background);
}

#[test]
fn test_visualize_empty_label_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset_dir = temp_dir.path();
    fs::create_dir_all(dataset_dir.join("images")).unwrap();
    fs::create_dir_all(dataset_dir.join("annotations")).unwrap();
    write(&dataset_dir.join("annotations").join("road0.txt"), "");

    let args = VisualizeArgs {
        dataset_dir: dataset_dir.to_path_buf(),
        images_dir: None,
        labels_dir: None,
        label: None,
        seed: 0,
        output: None,
        font: None,
        label_list: vec![],
    };
    assert!(visualize_annotations(&args).unwrap().is_none());
    assert!(!dataset_dir.join("annotation_check.png").exists());
}

#[test]
fn test_load_font_rejects_garbage() {
    let temp_dir = tempfile::tempdir().unwrap();
    let font_path = temp_dir.path().join("broken.ttf");
    write(&font_path, "definitely not a font");

    match load_font(&font_path) {
        Err(ConvertError::InvalidFont(path)) => assert_eq!(path, font_path),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("garbage bytes loaded as a font"),
    }
}

#[test]
fn test_visualize_with_invalid_font_fails_early() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset_dir = temp_dir.path();
    fs::create_dir_all(dataset_dir.join("images")).unwrap();
    fs::create_dir_all(dataset_dir.join("annotations")).unwrap();
    write(
        &dataset_dir.join("annotations").join("road0.txt"),
        "0 0.5 0.5 0.2 0.2",
    );
    let font_path = dataset_dir.join("broken.ttf");
    write(&font_path, "definitely not a font");

    let args = VisualizeArgs {
        dataset_dir: dataset_dir.to_path_buf(),
        images_dir: None,
        labels_dir: None,
        label: None,
        seed: 0,
        output: None,
        font: Some(font_path),
        label_list: vec![],
    };
    assert!(matches!(
        visualize_annotations(&args),
        Err(ConvertError::InvalidFont(_))
    ));
    assert!(!dataset_dir.join("annotation_check.png").exists());
}

#[test]
fn test_draw_labels_writes_above_box() {
    let font_path = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
    if !font_path.is_file() {
        return;
    }
    let font = load_font(font_path).unwrap();

    let background = Rgba([0, 0, 0, 255]);
    let mut img = RgbaImage::from_pixel(120, 80, background);
    let rect = PixelRect {
        class_id: 1,
        x0: 10.0,
        y0: 40.0,
        x1: 100.0,
        y1: 70.0,
    };
    draw_labels(&mut img, &[rect], &ClassVocabulary::default(), &font, BOX_COLOR);

    let mut text_pixels = 0;
    for y in 0..80 {
        for x in 0..120 {
            if *img.get_pixel(x, y) != background {
                assert!((28..46).contains(&y), "text drawn outside its band at ({x}, {y})");
                assert!(x >= 10);
                text_pixels += 1;
            }
        }
    }
    assert!(text_pixels > 0);
}
