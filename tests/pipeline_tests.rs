//! # Pipeline Tests
//!
//! End-to-end runs over temp directories: CSV in, PDF (or preview) out.
//! These exercise settings resolution, encoding, composition, placement,
//! and document assembly together, the way the binary drives them.

use std::io::Write;
use std::path::{Path, PathBuf};

use labelgen::config::{CliOverrides, FileConfig, resolve};
use labelgen::pipeline::run;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{contents}").unwrap();
    path
}

/// Build a minimal one-page A4 template PDF with a gray box as content.
fn write_template_pdf(dir: &Path, name: &str) -> PathBuf {
    use lopdf::{Dictionary, Document, Object, Stream, dictionary};

    let path = dir.join(name);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        b"0.9 g 10 10 200 100 re f".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(&path).unwrap();
    path
}

fn base_cli(csv: &Path, output: &Path) -> CliOverrides {
    CliOverrides {
        csv_file: Some(csv.to_path_buf()),
        output: Some(output.to_path_buf()),
        template_type: Some("single".into()),
        dpi: Some(150),
        no_eac: Some(true),
        ..Default::default()
    }
}

#[test]
fn single_mode_produces_one_page_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(
        dir.path(),
        "codes.csv",
        "0104607004760163coak7p\tFirst product\n\
         0104607004760163m2nyqd\tSecond product\n\
         0104607004760163zzzzzz\tThird product\n",
    );
    let output = dir.path().join("labels.pdf");

    let mut cli = base_cli(&csv, &output);
    cli.text_column = Some(1);
    let settings = resolve(cli, FileConfig::default()).unwrap();

    let summary = run(&settings).unwrap();
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.labels, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.pages, 3);

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(bytes.len() > 1000);
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // Second row lacks the text column, fourth has an empty payload.
    let csv = write_file(
        dir.path(),
        "codes.csv",
        "code-one\tProduct one\n\
         code-two\n\
         code-three\tProduct three\n\
         \tProduct four\n",
    );
    let output = dir.path().join("labels.pdf");

    let mut cli = base_cli(&csv, &output);
    cli.text_column = Some(1);
    let settings = resolve(cli, FileConfig::default()).unwrap();

    let summary = run(&settings).unwrap();
    assert_eq!(summary.rows_read, 4);
    assert_eq!(summary.labels, 2);
    assert_eq!(summary.skipped, 2);
    assert!(output.exists());
}

#[test]
fn grid_mode_fills_pages_to_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv_body = String::new();
    for i in 0..7 {
        csv_body.push_str(&format!("code-{i:04}\n"));
    }
    let csv = write_file(dir.path(), "codes.csv", &csv_body);

    // A4-sized image template, 2x3 grid: 7 labels need two pages.
    let template = dir.path().join("sheet.png");
    image::RgbaImage::from_pixel(1240, 1754, image::Rgba([255, 255, 255, 255]))
        .save(&template)
        .unwrap();

    let output = dir.path().join("sheet.pdf");
    let mut cli = base_cli(&csv, &output);
    cli.template_type = Some("multiple".into());
    cli.template = Some(template);
    cli.labels_horizontal = Some(2);
    cli.labels_vertical = Some(3);
    cli.label_width = Some(70.0);
    cli.label_height = Some(40.0);
    cli.dm_x = Some(5.0);
    cli.dm_y = Some(3.0);
    cli.no_product_name = Some(true);
    let settings = resolve(cli, FileConfig::default()).unwrap();

    let summary = run(&settings).unwrap();
    assert_eq!(summary.labels, 7);
    assert_eq!(summary.pages, 2);
    assert!(std::fs::read(&output).unwrap().starts_with(b"%PDF"));
}

#[test]
fn config_file_drives_run_with_cli_positionals() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "codes.csv", "0104607004760163coak7p\n");
    let output = dir.path().join("labels.pdf");
    let config = write_file(
        dir.path(),
        "run.json",
        r#"{
            "template_type": "single",
            "width": 30,
            "height": 20,
            "dpi": 150,
            "no_eac": true,
            "no_product_name": true
        }"#,
    );

    let file = FileConfig::load(&config).unwrap();
    let cli = CliOverrides {
        csv_file: Some(csv),
        output: Some(output.clone()),
        ..Default::default()
    };
    let settings = resolve(cli, file).unwrap();
    // Both text sources disabled flips the background to transparent.
    assert!(settings.transparent_bg);

    let summary = run(&settings).unwrap();
    assert_eq!(summary.labels, 1);
    assert!(output.exists());
}

#[test]
fn ini_config_parses_and_runs() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "codes.csv", "code-a\ncode-b\n");
    let output = dir.path().join("labels.pdf");
    let config = write_file(
        dir.path(),
        "run.ini",
        "[settings]\n\
         template_type = single\n\
         width = 30\n\
         height = 20\n\
         dpi = 150\n\
         no_eac = true\n\
         text_below_dm = true\n",
    );

    let file = FileConfig::load(&config).unwrap();
    let cli = CliOverrides {
        csv_file: Some(csv),
        output: Some(output.clone()),
        ..Default::default()
    };
    let settings = resolve(cli, file).unwrap();
    assert!(settings.text.below_code);

    let summary = run(&settings).unwrap();
    assert_eq!(summary.labels, 2);
    assert_eq!(summary.pages, 2);
}

#[test]
fn preview_mode_writes_html_and_page_images() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "codes.csv", "code-a\ncode-b\n");
    let output = dir.path().join("labels.pdf");

    let mut cli = base_cli(&csv, &output);
    cli.no_pdf = Some(true);
    let settings = resolve(cli, FileConfig::default()).unwrap();

    let summary = run(&settings).unwrap();
    assert_eq!(summary.pages, 2);
    assert!(!output.exists());

    let html = std::fs::read_to_string(dir.path().join("labels.html")).unwrap();
    assert!(html.contains("labels_page001.png"));
    assert!(html.contains("labels_page002.png"));
    assert!(dir.path().join("labels_page001.png").exists());
    assert!(dir.path().join("labels_page002.png").exists());
}

#[test]
fn output_is_replaced_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "codes.csv", "code-a\n");
    let output = dir.path().join("labels.pdf");
    std::fs::write(&output, b"stale content").unwrap();

    let settings = resolve(base_cli(&csv, &output), FileConfig::default()).unwrap();
    run(&settings).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    // No temp files left behind next to the output.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
}

#[test]
fn pdf_template_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(
        dir.path(),
        "codes.csv",
        "0104607004760163coak7p\n0104607004760163m2nyqd\n",
    );
    let template = write_template_pdf(dir.path(), "template.pdf");

    let run_once = |output: PathBuf| {
        let mut cli = base_cli(&csv, &output);
        cli.template = Some(template.clone());
        cli.dm_x = Some(10.0);
        cli.dm_y = Some(5.0);
        let settings = resolve(cli, FileConfig::default()).unwrap();
        let summary = run(&settings).unwrap();
        assert_eq!(summary.pages, 2);
        std::fs::read(&output).unwrap()
    };

    // The PDF merge path embeds no timestamps, so identical input must
    // produce identical bytes.
    let first = run_once(dir.path().join("a.pdf"));
    let second = run_once(dir.path().join("b.pdf"));
    assert!(first.starts_with(b"%PDF"));
    assert_eq!(first, second);
}

#[test]
fn preview_runs_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "codes.csv", "code-a\ncode-b\n");

    let run_once = |subdir: &str| {
        let out_dir = dir.path().join(subdir);
        std::fs::create_dir(&out_dir).unwrap();
        let mut cli = base_cli(&csv, &out_dir.join("labels.pdf"));
        cli.no_pdf = Some(true);
        let settings = resolve(cli, FileConfig::default()).unwrap();
        run(&settings).unwrap();
        (
            std::fs::read(out_dir.join("labels.html")).unwrap(),
            std::fs::read(out_dir.join("labels_page001.png")).unwrap(),
            std::fs::read(out_dir.join("labels_page002.png")).unwrap(),
        )
    };

    let first = run_once("first");
    let second = run_once("second");
    assert_eq!(first, second);
}

#[test]
fn tab_is_the_default_delimiter_and_custom_works() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "codes.csv", "code-a;Product A\n");
    let output = dir.path().join("labels.pdf");

    let mut cli = base_cli(&csv, &output);
    cli.delimiter = Some(";".into());
    cli.text_column = Some(1);
    let settings = resolve(cli, FileConfig::default()).unwrap();
    assert_eq!(settings.delimiter, b';');

    let summary = run(&settings).unwrap();
    assert_eq!(summary.labels, 1);
}
