use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

type StdResult = Result<(), Box<dyn std::error::Error>>;

fn roundtrip_via_cli(data: &[u8]) -> StdResult {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("input");
    let zz_path = temp_dir.path().join("input.zz");
    let out_path = temp_dir.path().join("output");
    std::fs::write(&in_path, data)?;

    Command::cargo_bin("zlibctl")?
        .arg("deflate")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&zz_path)
        .assert()
        .success();

    Command::cargo_bin("zlibctl")?
        .arg("inflate")
        .arg("-i").arg(&zz_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();

    let compressed = std::fs::read(&zz_path)?;
    assert_eq!(&compressed[0..2], &[0x78, 0x9C]);

    let restored = std::fs::read(&out_path)?;
    assert_eq!(restored, data);
    Ok(())
}

#[test]
fn empty_file_roundtrips() -> StdResult {
    roundtrip_via_cli(b"")
}

#[test]
fn single_char_roundtrips() -> StdResult {
    roundtrip_via_cli(b"a")
}

#[test]
fn repeated_byte_roundtrips_via_back_reference() -> StdResult {
    roundtrip_via_cli(&vec![b'a'; 256])
}

#[test]
fn repeating_pattern_roundtrips() -> StdResult {
    roundtrip_via_cli(b"abcabcabcabc")
}

#[test]
fn plain_text_file_roundtrips() -> StdResult {
    let text = "the quick brown fox jumps over the lazy dog\n".repeat(200);
    roundtrip_via_cli(text.as_bytes())
}

#[test]
fn inflate_rejects_corrupted_adler_trailer() -> StdResult {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("input");
    let zz_path = temp_dir.path().join("input.zz");
    let out_path = temp_dir.path().join("output");
    std::fs::write(&in_path, b"corrupt me please")?;

    Command::cargo_bin("zlibctl")?
        .arg("deflate")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&zz_path)
        .assert()
        .success();

    let mut bytes = std::fs::read(&zz_path)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&zz_path, &bytes)?;

    Command::cargo_bin("zlibctl")?
        .arg("inflate")
        .arg("-i").arg(&zz_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Adler"));
    Ok(())
}

#[test]
fn inflate_rejects_illegal_btype() -> StdResult {
    let temp_dir = tempfile::tempdir()?;
    let zz_path = temp_dir.path().join("bad.zz");
    let out_path = temp_dir.path().join("output");

    let mut f = std::fs::File::create(&zz_path)?;
    // zlib header, then a single byte whose low 3 bits are bfinal=1,
    // btype=11 (reserved/illegal).
    f.write_all(&[0x78, 0x9C, 0b0000_0111])?;
    drop(f);

    Command::cargo_bin("zlibctl")?
        .arg("inflate")
        .arg("-i").arg(&zz_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("IllegalBtype"));
    Ok(())
}
