//! End-to-end applier tests: index a ROM tree plus reference documents, then sort or extract.

use romcat::apply::{extract, sort};
use romcat::engine::hashing::hash_reader;
use romcat::utils::config::UNKNOWN_BUCKET;
use romcat::{Opts, Session, Sources};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;
use zip::write::{SimpleFileOptions, ZipWriter};

const TETRIS: &[u8] = b"tetris rom bytes for the game boy";
const ALPHA: &[u8] = b"alpha rom bytes, shipped zipped";

struct Fixture {
    _dir: TempDir,
    roms: PathBuf,
    dats: PathBuf,
    out: PathBuf,
    storage: PathBuf,
}

fn rom_line(name: &str, data: &[u8]) -> String {
    let fp = hash_reader(data).unwrap();
    format!(
        r#"<rom name="{name}" size="{}" crc="{}" md5="{}" sha1="{}"/>"#,
        fp.size,
        hex::encode(&fp.crc32),
        hex::encode(&fp.md5),
        hex::encode(&fp.sha1)
    )
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let roms = base.join("roms");
    let dats = base.join("dats");
    fs::create_dir_all(roms.join("pack")).unwrap();
    fs::create_dir_all(roms.join("notes")).unwrap();
    fs::create_dir_all(&dats).unwrap();

    fs::write(roms.join("tetris.gb"), TETRIS).unwrap();
    let mut zip = ZipWriter::new(File::create(roms.join("pack").join("alpha.zip")).unwrap());
    zip.start_file("alpha.gb", SimpleFileOptions::default()).unwrap();
    zip.write_all(ALPHA).unwrap();
    zip.finish().unwrap();
    fs::write(roms.join("notes").join("readme.txt"), b"not a rom").unwrap();
    fs::write(roms.join("broken.zip"), b"PK\x03\x04truncated").unwrap();

    let dat = format!(
        r#"<?xml version="1.0"?>
<datafile>
  <header><name>Nintendo - Game Boy</name><category>Console</category><version>1</version></header>
  <game name="Tetris (World)"><description>Tetris (World)</description>{}</game>
  <game name="Alpha"><description>Alpha</description>{}</game>
</datafile>
"#,
        rom_line("Tetris (World).gb", TETRIS),
        rom_line("Alpha.gb", ALPHA)
    );
    fs::write(dats.join("gb.dat"), dat).unwrap();

    Fixture {
        out: base.join("out"),
        storage: base.join("catalog.db"),
        _dir: dir,
        roms,
        dats,
    }
}

fn session(storage: &Path) -> Session {
    let opts = Opts {
        storage: Some(storage.to_path_buf()),
        pool_size: 2,
        verbose: false,
    };
    Session::open(&opts, Arc::new(AtomicBool::new(false))).unwrap()
}

// --- sort ---

#[test]
fn test_sort_places_matched_unknown_and_skips_corrupted() {
    let fx = fixture();
    let mut s = session(&fx.storage);
    let sources = Sources {
        dat_dir: Some(fx.dats.as_path()),
        rdb: None,
    };
    s.index(&[fx.roms.clone()], sources).unwrap();

    let report = sort(&s.conn, &[fx.roms.clone()], &fx.out, &s.ctx).unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.placed, 2);
    assert_eq!(report.unknown, 1);
    assert_eq!(report.skipped_corrupted, 1);
    assert_eq!(report.duplicates, 0);

    let set = fx.out.join("Nintendo - Game Boy");
    assert_eq!(fs::read(set.join("Tetris (World).gb")).unwrap(), TETRIS);
    // Zipped sources keep their container extension.
    assert!(set.join("Alpha.zip").is_file());
    assert!(!set.join("Alpha.gb").exists());
    assert_eq!(
        fs::read(fx.out.join(UNKNOWN_BUCKET).join("notes").join("readme.txt")).unwrap(),
        b"not a rom"
    );
    assert!(!fx.out.join(UNKNOWN_BUCKET).join("broken.zip").exists());
}

#[test]
fn test_second_sort_only_finds_duplicates() {
    let fx = fixture();
    let mut s = session(&fx.storage);
    let sources = Sources {
        dat_dir: Some(fx.dats.as_path()),
        rdb: None,
    };
    s.index(&[fx.roms.clone()], sources).unwrap();
    sort(&s.conn, &[fx.roms.clone()], &fx.out, &s.ctx).unwrap();

    let again = sort(&s.conn, &[fx.roms.clone()], &fx.out, &s.ctx).unwrap();
    assert_eq!(again.placed, 0);
    assert_eq!(again.unknown, 0);
    assert_eq!(again.duplicates, 3);
}

#[test]
fn test_sort_without_reference_sends_everything_to_unknown() {
    let fx = fixture();
    let mut s = session(&fx.storage);
    s.index(&[fx.roms.clone()], Sources::default()).unwrap();

    let report = sort(&s.conn, &[fx.roms.clone()], &fx.out, &s.ctx).unwrap();
    assert_eq!(report.placed, 0);
    assert_eq!(report.unknown, 3);
    assert!(fx.out.join(UNKNOWN_BUCKET).join("tetris.gb").is_file());
    assert!(fx.out.join(UNKNOWN_BUCKET).join("pack").join("alpha.zip").is_file());
}

#[test]
fn test_three_file_scenario() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let (roms, dats) = (base.join("in"), base.join("dat"));
    fs::create_dir_all(&roms).unwrap();
    fs::create_dir_all(&dats).unwrap();
    fs::write(roms.join("plain.gb"), TETRIS).unwrap();
    let mut zip = ZipWriter::new(File::create(roms.join("packed.zip")).unwrap());
    zip.start_file("inner.gb", SimpleFileOptions::default()).unwrap();
    zip.write_all(ALPHA).unwrap();
    zip.finish().unwrap();
    fs::write(roms.join("unreadable.zip"), b"PK\x03\x04cut short").unwrap();
    fs::write(
        dats.join("set.dat"),
        format!(
            "<datafile><header><name>Set</name></header><game name=\"Plain\">{}</game></datafile>",
            rom_line("Plain.gb", TETRIS)
        ),
    )
    .unwrap();

    let mut s = session(&base.join("catalog.db"));
    let sources = Sources {
        dat_dir: Some(dats.as_path()),
        rdb: None,
    };
    s.index(&[roms.clone()], sources).unwrap();
    let entries = romcat::engine::db_ops::list_entries(&s.conn).unwrap();
    assert_eq!(entries.iter().filter(|e| e.is_fingerprinted()).count(), 2);
    assert_eq!(entries.iter().filter(|e| e.corrupted.is_some()).count(), 1);

    let out = base.join("out");
    let report = sort(&s.conn, &[roms.clone()], &out, &s.ctx).unwrap();
    assert_eq!(report.placed, 1);
    assert_eq!(report.unknown, 1);
    assert_eq!(report.skipped_corrupted, 1);
    assert!(out.join("Set").join("Plain.gb").is_file());
    assert!(out.join(UNKNOWN_BUCKET).join("packed.zip").is_file());
}

#[test]
fn test_misnamed_zip_is_placed_by_content_type() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let (roms, dats) = (base.join("in"), base.join("dat"));
    fs::create_dir_all(&roms).unwrap();
    fs::create_dir_all(&dats).unwrap();
    let mut zip = ZipWriter::new(File::create(roms.join("game.bin")).unwrap());
    zip.start_file("inner.gb", SimpleFileOptions::default()).unwrap();
    zip.write_all(ALPHA).unwrap();
    zip.finish().unwrap();
    fs::write(
        dats.join("set.dat"),
        format!(
            "<datafile><header><name>Set</name></header><game name=\"Game\">{}</game></datafile>",
            rom_line("Game.gb", ALPHA)
        ),
    )
    .unwrap();

    let mut s = session(&base.join("catalog.db"));
    let sources = Sources {
        dat_dir: Some(dats.as_path()),
        rdb: None,
    };
    s.index(&[roms.clone()], sources).unwrap();

    let out = base.join("out");
    let report = sort(&s.conn, &[roms.clone()], &out, &s.ctx).unwrap();
    assert_eq!(report.placed, 1);
    assert!(out.join("Set").join("Game.zip").is_file());
    assert!(!out.join("Set").join("Game.bin").exists());
}

// --- sessions ---

#[test]
fn test_snapshot_survives_between_sessions() {
    let fx = fixture();
    {
        let mut s = session(&fx.storage);
        let sources = Sources {
            dat_dir: Some(fx.dats.as_path()),
            rdb: None,
        };
        s.index(&[fx.roms.clone()], sources).unwrap();
        s.save().unwrap();
    }
    assert!(fx.storage.is_file());

    let mut s = session(&fx.storage);
    let before = s.stats().unwrap();
    assert_eq!(before.files, 4);
    assert_eq!(before.datasets, 1);
    assert_eq!(before.candidates, 2);

    let sources = Sources {
        dat_dir: Some(fx.dats.as_path()),
        rdb: None,
    };
    let reports = s.index(&[fx.roms.clone()], sources).unwrap();
    assert!(reports.iter().all(|r| r.queued == 0));
    assert_eq!(s.stats().unwrap(), before);
}

#[test]
fn test_prune_files_after_deletion() {
    let fx = fixture();
    let mut s = session(&fx.storage);
    s.index(&[fx.roms.clone()], Sources::default()).unwrap();
    fs::remove_file(fx.roms.join("tetris.gb")).unwrap();

    assert_eq!(s.prune_files().unwrap(), 1);
    assert_eq!(s.stats().unwrap().files, 3);
}

// --- extract ---

#[cfg(unix)]
fn fake_decoder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let tool = dir.join("decoder.sh");
    fs::write(&tool, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
    tool
}

#[cfg(unix)]
#[test]
fn test_extract_copies_fuzzy_matches() {
    let fx = fixture();
    let rdbs = fx.dats.join("rdb");
    fs::create_dir_all(&rdbs).unwrap();
    fs::write(rdbs.join("Nintendo - Game Boy.rdb"), b"binary").unwrap();
    let sha1 = hex::encode(hash_reader(TETRIS).unwrap().sha1);
    let tool = fake_decoder(
        &fx.dats,
        &format!(
            "echo '{{\"name\":\"Tetris\",\"sha1\":\"{sha1}\"}}'\necho '{{\"name\":\"Nothing\",\"crc\":\"00000000\"}}'"
        ),
    );

    let mut s = session(&fx.storage);
    let sources = Sources {
        dat_dir: None,
        rdb: Some((rdbs.as_path(), tool.as_path())),
    };
    s.index(&[fx.roms.clone()], sources).unwrap();
    assert_eq!(s.stats().unwrap().items, 2);

    let report = extract(&s.conn, &fx.out, &s.ctx).unwrap();
    assert_eq!(report.placed, 1);
    assert_eq!(report.unknown, 2);
    assert_eq!(report.skipped_corrupted, 1);
    assert_eq!(
        fs::read(fx.out.join("Nintendo - Game Boy").join("Tetris.gb")).unwrap(),
        TETRIS
    );
    assert!(!fx.out.join(UNKNOWN_BUCKET).exists());
}

#[cfg(unix)]
#[test]
fn test_extract_names_target_by_catalogued_extension() {
    let fx = fixture();
    fs::rename(
        fx.roms.join("pack").join("alpha.zip"),
        fx.roms.join("pack").join("alpha.bin"),
    )
    .unwrap();
    let rdbs = fx.dats.join("rdb");
    fs::create_dir_all(&rdbs).unwrap();
    fs::write(rdbs.join("Alpha Set.rdb"), b"binary").unwrap();
    let sha1 = hex::encode(hash_reader(ALPHA).unwrap().sha1);
    let tool = fake_decoder(
        &fx.dats,
        &format!("echo '{{\"name\":\"Alpha\",\"sha1\":\"{sha1}\"}}'"),
    );

    let mut s = session(&fx.storage);
    let sources = Sources {
        dat_dir: None,
        rdb: Some((rdbs.as_path(), tool.as_path())),
    };
    s.index(&[fx.roms.clone()], sources).unwrap();

    let report = extract(&s.conn, &fx.out, &s.ctx).unwrap();
    assert_eq!(report.placed, 1);
    assert!(fx.out.join("Alpha Set").join("Alpha.zip").is_file());
}

#[cfg(unix)]
#[test]
fn test_failing_decoder_skips_document() {
    let fx = fixture();
    let rdbs = fx.dats.join("rdb");
    fs::create_dir_all(&rdbs).unwrap();
    fs::write(rdbs.join("broken.rdb"), b"binary").unwrap();
    let tool = fake_decoder(&fx.dats, "echo 'cannot decode' >&2\nexit 2");

    let mut s = session(&fx.storage);
    let sources = Sources {
        dat_dir: None,
        rdb: Some((rdbs.as_path(), tool.as_path())),
    };
    let reports = s.index(&[fx.roms.clone()], sources).unwrap();
    let rdb_report = reports.last().unwrap();
    assert_eq!(rdb_report.queued, 1);
    assert_eq!(rdb_report.failed, 1);
    assert_eq!(s.stats().unwrap().collections, 0);
}
