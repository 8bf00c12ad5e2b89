//! Store-level matching tests: exact against DAT candidates, fuzzy against RDB items.

use romcat::engine::db_ops::{
    insert_parsed_dat, insert_parsed_rdb, mark_corrupted, open_db_in_memory, upsert_fingerprint,
};
use romcat::engine::hashing::hash_reader;
use romcat::engine::{find_exact_match, find_fuzzy_match};
use romcat::{
    Candidate, Collection, Dataset, DatasetEntry, Fingerprint, FingerprintedFile, Item, ParsedDat,
    ParsedRdb,
};
use rusqlite::Connection;

const ROM: &str = "/roms/tetris.gb";

fn rom_fingerprint() -> Fingerprint {
    hash_reader(&b"tetris rom bytes"[..]).unwrap()
}

fn store_with_rom() -> Connection {
    let conn = open_db_in_memory().unwrap();
    upsert_fingerprint(
        &conn,
        &FingerprintedFile {
            filepath: ROM.to_string(),
            extension: ".gb".to_string(),
            mimetype: "application/octet-stream".to_string(),
            fingerprint: rom_fingerprint(),
        },
    )
    .unwrap();
    conn
}

fn dat(filepath: &str, name: &str, candidates: Vec<(&str, Fingerprint)>) -> ParsedDat {
    let mut parsed = ParsedDat {
        filepath: filepath.to_string(),
        datasets: vec![Dataset {
            filepath: filepath.to_string(),
            name: name.to_string(),
            category: "Console".to_string(),
            version: "1".to_string(),
            ..Dataset::default()
        }],
        ..ParsedDat::default()
    };
    for (i, (cand, fp)) in candidates.into_iter().enumerate() {
        parsed.entries.push(DatasetEntry {
            dataset: 0,
            name: format!("entry {i}"),
            description: format!("Entry {i}"),
        });
        parsed.candidates.push(Candidate {
            entry: i,
            name: cand.to_string(),
            size: fp.size,
            sha1: fp.sha1,
            md5: fp.md5,
            crc32: fp.crc32,
        });
    }
    parsed
}

fn rdb(filepath: &str, name: &str, items: Vec<Item>) -> ParsedRdb {
    ParsedRdb {
        filepath: filepath.to_string(),
        collections: vec![Collection {
            filepath: filepath.to_string(),
            name: name.to_string(),
        }],
        items,
    }
}

// --- find_exact_match ---

#[test]
fn test_exact_match_joins_dataset_and_entry() {
    let mut conn = store_with_rom();
    insert_parsed_dat(
        &mut conn,
        &dat("/dats/gb.dat", "Game Boy", vec![("Tetris (World).gb", rom_fingerprint())]),
    )
    .unwrap();

    let m = find_exact_match(&conn, ROM).unwrap().unwrap();
    assert_eq!(m.filepath, ROM);
    assert_eq!(m.dataset_name, "Game Boy");
    assert_eq!(m.dataset_category, "Console");
    assert_eq!(m.entry_name, "entry 0");
    assert_eq!(m.candidate_name, "Tetris (World).gb");
    assert_eq!(m.extension.as_deref(), Some(".gb"));
}

#[test]
fn test_exact_match_needs_every_hash() {
    let mut conn = store_with_rom();
    let mut other = rom_fingerprint();
    other.crc32 = vec![0, 0, 0, 0];
    insert_parsed_dat(&mut conn, &dat("/dats/gb.dat", "Game Boy", vec![("x.gb", other)])).unwrap();

    assert!(find_exact_match(&conn, ROM).unwrap().is_none());
}

#[test]
fn test_exact_match_prefers_first_inserted_dataset() {
    let mut conn = store_with_rom();
    insert_parsed_dat(&mut conn, &dat("/dats/a.dat", "First", vec![("a.gb", rom_fingerprint())]))
        .unwrap();
    insert_parsed_dat(&mut conn, &dat("/dats/b.dat", "Second", vec![("b.gb", rom_fingerprint())]))
        .unwrap();

    let m = find_exact_match(&conn, ROM).unwrap().unwrap();
    assert_eq!(m.dataset_name, "First");
    assert_eq!(m.candidate_name, "a.gb");
}

#[test]
fn test_corrupted_entry_never_matches() {
    let mut conn = store_with_rom();
    insert_parsed_dat(&mut conn, &dat("/dats/gb.dat", "Game Boy", vec![("t.gb", rom_fingerprint())]))
        .unwrap();
    mark_corrupted(&conn, ROM, None, None, "flagged").unwrap();

    assert!(find_exact_match(&conn, ROM).unwrap().is_none());
    assert!(find_fuzzy_match(&conn, ROM).unwrap().is_none());
}

#[test]
fn test_unknown_path_has_no_match() {
    let conn = store_with_rom();
    assert!(find_exact_match(&conn, "/roms/absent.gb").unwrap().is_none());
    assert!(find_fuzzy_match(&conn, "/roms/absent.gb").unwrap().is_none());
}

// --- find_fuzzy_match ---

#[test]
fn test_fuzzy_match_on_sha1_alone() {
    let mut conn = store_with_rom();
    let item = Item {
        collection: 0,
        name: "Tetris".to_string(),
        sha1: Some(rom_fingerprint().sha1),
        ..Item::default()
    };
    insert_parsed_rdb(&mut conn, &rdb("/rdb/gb.rdb", "Nintendo - Game Boy", vec![item])).unwrap();

    let m = find_fuzzy_match(&conn, ROM).unwrap().unwrap();
    assert_eq!(m.collection_name, "Nintendo - Game Boy");
    assert_eq!(m.item_name, "Tetris");
}

#[test]
fn test_fuzzy_sha1_item_checks_recorded_size() {
    let mut conn = store_with_rom();
    let fp = rom_fingerprint();
    let wrong_size = Item {
        name: "Wrong size".to_string(),
        sha1: Some(fp.sha1.clone()),
        size: Some(fp.size + 1),
        ..Item::default()
    };
    let right = Item {
        name: "Right".to_string(),
        sha1: Some(fp.sha1.clone()),
        size: Some(fp.size),
        ..Item::default()
    };
    insert_parsed_rdb(&mut conn, &rdb("/rdb/gb.rdb", "GB", vec![wrong_size, right])).unwrap();

    assert_eq!(find_fuzzy_match(&conn, ROM).unwrap().unwrap().item_name, "Right");
}

#[test]
fn test_fuzzy_fallback_without_sha1() {
    let mut conn = store_with_rom();
    let fp = rom_fingerprint();
    let partial = Item {
        name: "No size".to_string(),
        md5: Some(fp.md5.clone()),
        crc32: Some(fp.crc32.clone()),
        ..Item::default()
    };
    insert_parsed_rdb(&mut conn, &rdb("/rdb/a.rdb", "A", vec![partial])).unwrap();
    assert!(find_fuzzy_match(&conn, ROM).unwrap().is_none());

    let full = Item {
        name: "Full".to_string(),
        md5: Some(fp.md5.clone()),
        crc32: Some(fp.crc32.clone()),
        size: Some(fp.size),
        ..Item::default()
    };
    insert_parsed_rdb(&mut conn, &rdb("/rdb/b.rdb", "B", vec![full])).unwrap();
    let m = find_fuzzy_match(&conn, ROM).unwrap().unwrap();
    assert_eq!(m.collection_name, "B");
    assert_eq!(m.item_name, "Full");
}
