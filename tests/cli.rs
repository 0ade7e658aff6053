//! Runs the verify-rpms binary against shell scripts standing in for skopeo, oc and rpm.
//!
//! The stand-ins key their behavior off the image reference:
//! - skopeo: `*missing*` fails, `*multi*` is an index of `@sha256:good` and `@sha256:unsigned`
//! - oc: `*broken*` fails, anything else records the image name in the target directory
//! - rpm: every image has one signed package and a gpg-pubkey, `*unsigned*` adds an unsigned one
#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Output},
    sync::OnceLock,
};

use similar_asserts::assert_eq;
use tempfile::TempDir;

const SKOPEO: &str = r#"#!/bin/sh
case "$3" in
  *missing*) echo "manifest unknown" >&2; exit 1 ;;
  *multi*) echo '{"schemaVersion":2,"manifests":[{"digest":"sha256:good"},{"digest":"sha256:unsigned"}]}' ;;
  *) echo '{"schemaVersion":2,"config":{"digest":"sha256:cfg"},"layers":[]}' ;;
esac
"#;

const OC: &str = r#"#!/bin/sh
case "$3" in
  *broken*) echo "error: unable to read image $3" >&2; exit 1 ;;
esac
printf '%s' "$3" > "${5#*:}/image"
"#;

const RPM: &str = r#"#!/bin/sh
img=$(cat "$5/image") || exit 1
echo "bash-5.1.8-6.el9 RSA/SHA256, Mon 1 Jan , Key ID 199e2f91fd431d51"
echo "gpg-pubkey-fd431d51-4ae0493b (none)"
case "$img" in
  *unsigned*) echo "vim-9.0-1.el9 (none)" ;;
esac
"#;

/// Writes the stand-in tools once, before any test gets to spawn anything.
fn fake_tools() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("verify-rpms-fake-tools");
        fs::create_dir_all(&dir).unwrap();
        for (name, script) in [("skopeo", SKOPEO), ("oc", OC), ("rpm", RPM)] {
            let path = dir.join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    })
}

fn verify_rpms(workdir: &Path, args: &[&str]) -> Output {
    let tools = fake_tools();
    Command::new(env!("CARGO_BIN_EXE_verify-rpms"))
        .args(args)
        .arg("--workdir")
        .arg(workdir)
        .arg("--skopeo")
        .arg(tools.join("skopeo"))
        .arg("--oc")
        .arg(tools.join("oc"))
        .arg("--rpm")
        .arg(tools.join("rpm"))
        .output()
        .unwrap()
}

fn read(workdir: &TempDir, name: &str) -> String {
    fs::read_to_string(workdir.path().join(name)).unwrap()
}

/// Only the status and results files may be left behind.
fn assert_scratch_cleaned(workdir: &TempDir) {
    let mut names: Vec<_> = fs::read_dir(workdir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["results", "status"]);
}

#[test]
fn test_index_with_unsigned_rpm_fails() {
    let workdir = tempfile::tempdir().unwrap();
    let out = verify_rpms(
        workdir.path(),
        &[
            "--image-url",
            "quay.io/test/multi:latest",
            "--image-digest",
            "sha256:index",
            "--fail-unsigned",
            "true",
        ],
    );

    assert!(!out.status.success());
    assert_eq!(read(&workdir, "status"), "ERROR");
    assert_eq!(
        read(&workdir, "results"),
        r#"{"keys":{"199e2f91fd431d51":2,"unsigned":1}}"#
    );

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Image: quay.io/test/multi@sha256:good\nNo unsigned RPMs found\n"));
    assert!(stdout.contains(
        "Image: quay.io/test/multi@sha256:unsigned\nFound unsigned RPMs:\n[\"vim-9.0-1.el9\"]\n"
    ));
    assert!(stdout.ends_with("{\"keys\":{\"199e2f91fd431d51\":2,\"unsigned\":1}}\n"));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Found unsigned RPMs"));
    assert_scratch_cleaned(&workdir);
}

#[test]
fn test_unsigned_rpm_without_fail_unsigned_passes() {
    let workdir = tempfile::tempdir().unwrap();
    let out = verify_rpms(
        workdir.path(),
        &[
            "--image-url",
            "quay.io/test/multi:latest",
            "--image-digest",
            "sha256:index",
            "--fail-unsigned",
            "false",
        ],
    );

    assert!(out.status.success());
    assert_eq!(read(&workdir, "status"), "ERROR");
    assert_scratch_cleaned(&workdir);
}

#[test]
fn test_single_image_all_signed() {
    let workdir = tempfile::tempdir().unwrap();
    let out = verify_rpms(
        workdir.path(),
        &[
            "--image-url",
            "registry.local:5000/test/single:v1",
            "--image-digest",
            "sha256:abc",
            "--fail-unsigned",
            "true",
            "--jobs",
            "1",
        ],
    );

    assert!(out.status.success());
    assert_eq!(read(&workdir, "status"), "SUCCESS");
    assert_eq!(
        read(&workdir, "results"),
        r#"{"keys":{"199e2f91fd431d51":1,"unsigned":0}}"#
    );
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("Image: registry.local:5000/test/single@sha256:abc\n"));
    assert_scratch_cleaned(&workdir);
}

#[test]
fn test_snapshot_with_broken_image() {
    let workdir = tempfile::tempdir().unwrap();
    let snapshot = r#"{"components": [
        {"containerImage": "quay.io/x/ok@sha256:1"},
        {"containerImage": "quay.io/x/broken@sha256:2"},
        {"containerImage": "quay.io/x/unsigned@sha256:3"}
    ]}"#;
    let out = verify_rpms(
        workdir.path(),
        &["--input", snapshot, "--fail-unsigned", "false"],
    );

    assert!(out.status.success());
    assert_eq!(read(&workdir, "status"), "ERROR");
    assert_eq!(
        read(&workdir, "results"),
        r#"{"error":"error: unable to read image quay.io/x/broken@sha256:2\n"}"#
    );
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Image: quay.io/x/ok@sha256:1\nNo unsigned RPMs found\n"));
    assert!(stdout.contains("Image: quay.io/x/broken@sha256:2\nError occurred:\n"));
    assert!(stdout.contains("Image: quay.io/x/unsigned@sha256:3\nFound unsigned RPMs:\n"));
    assert_scratch_cleaned(&workdir);
}

#[test]
fn test_unresolvable_image_always_fails() {
    let workdir = tempfile::tempdir().unwrap();
    let out = verify_rpms(
        workdir.path(),
        &[
            "--image-url",
            "quay.io/test/missing:latest",
            "--image-digest",
            "sha256:gone",
            "--fail-unsigned",
            "false",
        ],
    );

    assert!(!out.status.success());
    assert_eq!(read(&workdir, "status"), "ERROR");
    let results: serde_json::Value = serde_json::from_str(&read(&workdir, "results")).unwrap();
    assert!(results["error"]
        .as_str()
        .unwrap()
        .contains("manifest unknown"));
    assert_scratch_cleaned(&workdir);
}

#[test]
fn test_custom_output_paths() {
    let workdir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    let status = outdir.path().join("verify-status");
    let results = outdir.path().join("verify-results");
    let out = verify_rpms(
        workdir.path(),
        &[
            "--input",
            "quay.io/x/ok@sha256:1",
            "--fail-unsigned",
            "true",
            "--status-path",
            status.to_str().unwrap(),
            "--results-path",
            results.to_str().unwrap(),
        ],
    );

    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&status).unwrap(), "SUCCESS");
    assert!(results.exists());
    assert_eq!(fs::read_dir(workdir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_image_arguments() {
    let workdir = tempfile::tempdir().unwrap();
    let out = verify_rpms(workdir.path(), &["--fail-unsigned", "true"]);
    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(2));
}
