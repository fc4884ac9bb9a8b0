use std::fs;

use bytes::Bytes;
use tempfile::TempDir;
use wayback_engine::{ensure_output_dir, AtomicFileWriter, PartialDownload};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
    // Idempotent.
    ensure_output_dir(&new_dir).unwrap();
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("plain");
    fs::write(&file_path, "x").unwrap();
    assert!(ensure_output_dir(&file_path).is_err());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("failed_urls.txt", "a\n").unwrap();
    assert_eq!(first.file_name().unwrap(), "failed_urls.txt");
    assert_eq!(fs::read_to_string(&first).unwrap(), "a\n");

    let second = writer.write("failed_urls.txt", "b\n").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "b\n");
}

#[test]
fn remove_reports_whether_a_file_existed() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    writer.write("stale.txt", "x").unwrap();

    assert!(writer.remove("stale.txt").unwrap());
    assert!(!writer.remove("stale.txt").unwrap());
}

#[tokio::test]
async fn partial_download_only_appears_after_commit() {
    let temp = TempDir::new().unwrap();
    let mut partial = PartialDownload::create(temp.path(), "report.pdf", 4096).unwrap();

    partial.write_chunk(&Bytes::from_static(b"PDF-")).await.unwrap();
    partial.write_chunk(&Bytes::from_static(b"DATA")).await.unwrap();
    assert_eq!(partial.bytes_written(), 8);
    assert!(partial.temp_path().exists());
    assert!(!partial.target().exists());

    let temp_path = partial.temp_path().to_path_buf();
    let path = partial.commit().await.unwrap();

    assert_eq!(path, temp.path().join("report.pdf"));
    assert_eq!(fs::read(&path).unwrap(), b"PDF-DATA");
    assert!(!temp_path.exists());
}

#[tokio::test]
async fn dropped_partial_download_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let mut partial = PartialDownload::create(temp.path(), "big.iso", 4096).unwrap();
    partial.write_chunk(&Bytes::from_static(b"truncated")).await.unwrap();
    let temp_path = partial.temp_path().to_path_buf();

    drop(partial);

    assert!(!temp_path.exists());
    assert!(!temp.path().join("big.iso").exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}
