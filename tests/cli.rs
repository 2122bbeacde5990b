use std::error::Error;
use std::fs;
use std::process::{Command, Output};
use tempfile::tempdir;

fn cipherbench_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cipherbench"))
}

fn run(args: &[&str]) -> Output {
    cipherbench_cmd()
        .args(args)
        .output()
        .expect("failed to run cipherbench binary")
}

#[test]
fn version_flag_prints_build_information() {
    let output = run(&["--version"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("cipherbench "), "unexpected version line: {}", stdout);
    assert!(stdout.contains("build"), "missing build number: {}", stdout);
}

#[test]
fn running_without_subcommand_displays_help() {
    let output = cipherbench_cmd().output().expect("failed to run cipherbench binary");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "help output missing usage: {}", stdout);
    assert!(stdout.contains("compare"));
}

#[test]
fn run_prints_report_and_progress() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("original.txt");
    let work = dir.path().join("work");
    fs::write(&source, b"Hello123")?;

    let output = run(&[
        "run",
        source.to_str().unwrap(),
        "--copies",
        "3",
        "--work-dir",
        work.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("[1/4] duplicate: 3 units"));
    assert!(stdout.contains("Phase 4 - compare"));
    assert!(stdout.contains("Total (TT):"));
    assert!(stdout.contains("3 ok, 0 hash mismatch"));
    assert_eq!(fs::read_dir(&work)?.count(), 0);
    Ok(())
}

#[test]
fn run_json_is_machine_readable() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("original.txt");
    fs::write(&source, b"The quick brown fox 42\n")?;

    let output = run(&[
        "run",
        source.to_str().unwrap(),
        "-n",
        "4",
        "-w",
        "2",
        "--io-path",
        "read-back",
        "--buffering",
        "unbuffered",
        "--json",
    ]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["copies"], 4);
    assert_eq!(report["workers"], 2);
    assert_eq!(report["io_path"], "read-back");
    assert_eq!(report["buffering"], "unbuffered");
    assert_eq!(report["outcomes"]["success"], 4);
    assert_eq!(report["phases"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[test]
fn run_keep_leaves_artifacts() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("original.txt");
    let work = dir.path().join("work");
    fs::write(&source, b"Hello123")?;

    let output = run(&[
        "run",
        source.to_str().unwrap(),
        "-n",
        "2",
        "--work-dir",
        work.to_str().unwrap(),
        "--keep",
        "--quiet",
    ]);
    assert!(output.status.success());

    assert_eq!(fs::read(work.join("2.txt"))?, b"Khoor876");
    assert_eq!(fs::read(work.join("2_2.txt"))?, b"Hello123");
    let stored = fs::read_to_string(work.join("1.sha"))?;
    assert_eq!(stored.len(), 64);
    Ok(())
}

#[test]
fn run_rejects_bad_copy_count() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("original.txt");
    fs::write(&source, b"abc")?;

    for copies in ["0", "51"] {
        let output = run(&["run", source.to_str().unwrap(), "-n", copies, "--quiet"]);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Invalid copy count"), "unexpected stderr: {}", stderr);
    }
    Ok(())
}

#[test]
fn run_missing_source_fails() {
    let output = run(&["run", "/definitely/not/here.txt", "--quiet"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Source file not found"));
}

#[test]
fn run_rejects_unknown_io_path() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("original.txt");
    fs::write(&source, b"abc")?;

    let output = run(&["run", source.to_str().unwrap(), "--io-path", "tape"]);
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn compare_reports_difference() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("original.txt");
    fs::write(&source, b"Lorem ipsum 2024\n".repeat(64))?;

    let output = run(&["compare", source.to_str().unwrap(), "-n", "3", "--quiet"]);
    assert!(
        output.status.success(),
        "compare failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("=== Baseline ==="));
    assert!(stdout.contains("=== Optimized ==="));
    assert!(stdout.contains("Difference (DF):"));
    assert!(stdout.contains("Improvement (PM):"));
    Ok(())
}

#[test]
fn digest_matches_known_vectors() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let empty = dir.path().join("empty");
    let abc = dir.path().join("abc");
    fs::write(&empty, b"")?;
    fs::write(&abc, b"abc")?;

    let stdout = String::from_utf8(run(&["digest", empty.to_str().unwrap()]).stdout)?;
    assert!(stdout.starts_with("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  "));

    let stdout = String::from_utf8(run(&["digest", abc.to_str().unwrap()]).stdout)?;
    assert!(stdout.starts_with("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  "));
    Ok(())
}

#[test]
fn encode_then_decode_restores_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let plain = dir.path().join("plain.txt");
    let coded = dir.path().join("coded.txt");
    let back = dir.path().join("back.txt");
    fs::write(&plain, b"Zebra 0 to 9, xyz!")?;

    assert!(run(&["encode", plain.to_str().unwrap(), coded.to_str().unwrap()]).status.success());
    assert_eq!(fs::read(&coded)?, b"Cheud 9 wr 0, abc!");

    assert!(run(&["decode", coded.to_str().unwrap(), back.to_str().unwrap()]).status.success());
    assert_eq!(fs::read(&back)?, fs::read(&plain)?);
    Ok(())
}
