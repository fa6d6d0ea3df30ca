// LogSlicer - tests/e2e_pipeline.rs
//
// End-to-end tests for the split, concatenate, audit, checksum and archive
// pipeline. These run against the real filesystem and the real zip writer,
// starting from a raw application-server log on disk.

use logslicer::app::pipeline::{self, ArchiveStatus, Mode, RunOptions, RunOutcome, RunRequest};
use logslicer::core::audit::audit;
use logslicer::core::checksum::checksum;
use logslicer::core::concat::concatenate;
use logslicer::core::model::{EmptyArchivePolicy, NoopObserver, PackageOutcome};
use logslicer::core::package::package;
use logslicer::core::segment::segment;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to an on-disk fixture file.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy the sample log into `dir` so runs never write beside the fixture.
fn sample_in(dir: &Path) -> PathBuf {
    let path = dir.join("app_server_sample.log");
    fs::copy(fixture("app_server_sample.log"), &path).unwrap();
    path
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

/// Multiset of lines across several files.
fn tally(paths: &[PathBuf]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for path in paths {
        for line in lines(path) {
            *counts.entry(line).or_insert(0) += 1;
        }
    }
    counts
}

fn archive_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn split(concat_params: &[&str]) -> Mode {
    Mode::Split {
        concat_params: concat_params.iter().map(|p| p.to_string()).collect(),
    }
}

// =============================================================================
// Engine scenarios
// =============================================================================

#[test]
fn e2e_two_requests_give_two_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "in.log", "GET /a HTTP/1.1\nGET /b HTTP/1.1\n");

    let produced = segment(&input, out.path(), &[]).unwrap();

    let names: Vec<String> = produced.iter().map(|p| file_name(p)).collect();
    assert_eq!(names, vec!["a.log", "b.log"]);
    assert_eq!(lines(&produced[0]), vec!["GET /a HTTP/1.1"]);
    assert_eq!(lines(&produced[1]), vec!["GET /b HTTP/1.1"]);
}

#[test]
fn e2e_error_capture_stops_at_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "in.log",
        "GET /a HTTP/1.1 *ERROR*\n\
         stack frame 1\n\
         stack frame 2\n\
         01.01.2024 10:00:00.000 GET /c HTTP/1.1\n",
    );

    let produced = segment(&input, out.path(), &[]).unwrap();

    assert_eq!(produced.len(), 2);
    assert_eq!(lines(&out.path().join("a.log")).len(), 3);
    assert_eq!(lines(&out.path().join("c.log")).len(), 1);
}

#[test]
fn e2e_concatenated_param_never_gets_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "in.log",
        "GET /checkout HTTP/1.1\n\
         GET /home HTTP/1.1\n\
         POST /checkout HTTP/1.1\n\
         GET /about HTTP/1.1\n\
         GET /contact HTTP/1.1\n",
    );

    let concat = concatenate(&input, out.path(), "/checkout").unwrap();
    let produced = segment(&input, out.path(), &["/checkout".to_string()]).unwrap();

    assert_eq!(lines(&concat).len(), 2);
    let names: Vec<String> = produced.iter().map(|p| file_name(p)).collect();
    assert_eq!(names, vec!["home.log", "about.log", "contact.log"]);
}

#[test]
fn e2e_empty_input_produces_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "in.log", "");

    let produced = segment(&input, out.path(), &[]).unwrap();
    assert!(produced.is_empty());

    let result = audit(&input, &produced, out.path()).unwrap();
    assert_eq!(result.missing_lines, 0);
    assert_eq!(result.extra_lines, 0);

    assert_eq!(
        package(&produced, out.path(), "empty.zip", EmptyArchivePolicy::Report).unwrap(),
        PackageOutcome::NoOutput
    );
    let PackageOutcome::Archive(archive) =
        package(&produced, out.path(), "empty.zip", EmptyArchivePolicy::Create).unwrap()
    else {
        panic!("expected an empty archive");
    };
    assert!(archive_entries(&archive).is_empty());
}

#[test]
fn e2e_checksum_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = sample_in(dir.path());
    let produced = segment(&input, out.path(), &[]).unwrap();

    let first = checksum(&input, &produced, out.path()).unwrap();
    let first_bytes = fs::read(&first.path).unwrap();
    let second = checksum(&input, &produced, out.path()).unwrap();

    assert_eq!(first_bytes, fs::read(&second.path).unwrap());
}

// =============================================================================
// Audit round trip on the sample log
// =============================================================================

/// Every input line is either in some output or in the missing report, and
/// nothing else appears anywhere.
#[test]
fn e2e_outputs_plus_missing_equal_input() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = sample_in(dir.path());

    let produced = segment(&input, out.path(), &[]).unwrap();
    let result = audit(&input, &produced, out.path()).unwrap();

    let names: Vec<String> = produced.iter().map(|p| file_name(p)).collect();
    assert_eq!(
        names,
        vec![
            "content_home.html.log",
            "bin_checkout_submit.log",
            "api_v1_items_id=7.log",
            "bin_checkout_cart.log",
        ]
    );
    assert_eq!(lines(&produced[1]).len(), 5, "request, error line, three trace lines");
    assert_eq!(result.missing_lines, 2);
    assert_eq!(result.extra_lines, 0);
    assert_eq!(
        lines(&result.missing_report),
        vec![
            "01.03.2024 09:15:00.101 *INFO* [main] Server startup complete",
            "01.03.2024 09:15:02.500 *WARN* [scheduler] Cache nearly full",
        ]
    );

    let mut everything = produced.clone();
    everything.push(result.missing_report.clone());
    assert_eq!(tally(&everything), tally(&[input]));
}

/// Input made only of request-start lines, several keys, with exact repeats.
/// Every line lands in exactly one output and nothing goes missing.
#[test]
fn e2e_start_lines_only_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let methods = ["GET", "POST", "PUT"];
    let mut content = String::new();
    for i in 0..60 {
        content.push_str(&format!(
            "{} /svc/k{}?page={} HTTP/1.1\n",
            methods[(i % 5) % methods.len()],
            i % 5,
            i % 4
        ));
    }
    let input = write(dir.path(), "in.log", &content);

    let produced = segment(&input, out.path(), &[]).unwrap();
    let result = audit(&input, &produced, out.path()).unwrap();

    assert_eq!(produced.len(), 5 * 4);
    assert_eq!(result.missing_lines, 0);
    assert_eq!(result.extra_lines, 0);
    assert!(lines(&result.missing_report).is_empty());

    let input_tally = tally(&[input]);
    assert!(input_tally.values().any(|&n| n > 1), "input has repeated lines");
    let mut everything = produced;
    everything.push(result.missing_report);
    assert_eq!(tally(&everything), input_tally);
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn e2e_split_with_concat_builds_archive() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_in(dir.path());
    let request = RunRequest::beside_input(input, split(&["/checkout"]));

    let report = pipeline::run(&request, &RunOptions::default(), &mut NoopObserver).unwrap();

    let RunOutcome::Split {
        work_dir,
        outputs,
        concat_outputs,
        lines_read,
        audit,
        checksum,
        archive,
        ..
    } = &report.outcome
    else {
        panic!("expected a split outcome");
    };

    assert_eq!(work_dir, &dir.path().join("filtered_app_server_sample"));
    assert_eq!(*lines_read, 14);
    let names: Vec<String> = outputs.iter().map(|p| file_name(p)).collect();
    assert_eq!(names, vec!["content_home.html.log", "api_v1_items_id=7.log"]);
    assert_eq!(concat_outputs, &vec![work_dir.join("checkout.log")]);
    assert_eq!(lines(&concat_outputs[0]).len(), 6);

    let audit = audit.as_ref().expect("audit report");
    assert_eq!(audit.missing_lines, 2);
    assert_eq!(audit.extra_lines, 0);
    let checksum = checksum.as_ref().expect("checksum report");
    assert_eq!(checksum.original, checksum.processed);

    let ArchiveStatus::Written { path } = archive else {
        panic!("expected an archive, got {archive:?}");
    };
    assert_eq!(path, &dir.path().join("filtered_app_server_sample.zip"));
    assert_eq!(
        archive_entries(path),
        vec![
            "_checksum.log",
            "_missing_lines.log",
            "api_v1_items_id=7.log",
            "checkout.log",
            "content_home.html.log",
        ]
    );
}

#[test]
fn e2e_second_run_never_overwrites_first() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_in(dir.path());
    let request = RunRequest::beside_input(input, split(&[]));
    let options = RunOptions::default();

    pipeline::run(&request, &options, &mut NoopObserver).unwrap();
    let second = pipeline::run(&request, &options, &mut NoopObserver).unwrap();

    let RunOutcome::Split {
        work_dir, archive, ..
    } = &second.outcome
    else {
        panic!("expected a split outcome");
    };
    assert_eq!(work_dir, &dir.path().join("filtered_app_server_sample(1)"));
    assert_eq!(
        archive,
        &ArchiveStatus::Written {
            path: dir.path().join("filtered_app_server_sample(1).zip")
        }
    );
    assert!(dir.path().join("filtered_app_server_sample.zip").exists());
}

#[test]
fn e2e_separate_save_dir_and_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let save = tempfile::tempdir().unwrap();
    let input = sample_in(dir.path());
    let request = RunRequest {
        input,
        save_dir: save.path().join("results"),
        mode: split(&[]),
    };
    let options = RunOptions {
        keep_work_dir: false,
        ..RunOptions::default()
    };

    let report = pipeline::run(&request, &options, &mut NoopObserver).unwrap();

    let RunOutcome::Split {
        work_dir_removed, ..
    } = report.outcome
    else {
        panic!("expected a split outcome");
    };
    assert!(work_dir_removed);
    let left: Vec<String> = fs::read_dir(save.path().join("results"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(left, vec!["filtered_app_server_sample.zip"]);
}

#[test]
fn e2e_filter_in_place_moves_blocks_out_of_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_in(dir.path());
    let before = lines(&input);
    let request = RunRequest::beside_input(
        input.clone(),
        Mode::Filter {
            param: "/checkout".to_string(),
            in_place: true,
        },
    );

    let report = pipeline::run(&request, &RunOptions::default(), &mut NoopObserver).unwrap();

    let RunOutcome::Filtered {
        output,
        lines_read,
        lines_written,
    } = &report.outcome
    else {
        panic!("expected a filter outcome");
    };
    assert_eq!(output, &dir.path().join("filtered_checkout.log"));
    assert_eq!((*lines_read, *lines_written), (14, 6));

    let after = lines(&input);
    assert_eq!(after.len(), 8);
    let mut rejoined = after.clone();
    rejoined.extend(lines(output));
    rejoined.sort();
    let mut original = before;
    original.sort();
    assert_eq!(rejoined, original);
    assert!(report.message().contains("Lines kept: 6 of 14"));
}
