use super::Fixture;
use crate::{ConfinedFsError, ContentCodec, ContentWriter, ErrorKind, GzipCodec, WriteMode};
use flate2::read::{GzDecoder, MultiGzDecoder};
use std::io::{self, Read, Write};

#[test]
fn mode_tokens_are_case_insensitive() {
    assert_eq!(
        WriteMode::from_token(None).unwrap(),
        WriteMode::CreateExclusive
    );
    assert_eq!(
        WriteMode::from_token(Some("append")).unwrap(),
        WriteMode::Append
    );
    assert_eq!(
        WriteMode::from_token(Some("APPEND")).unwrap(),
        WriteMode::Append
    );
    assert_eq!(
        WriteMode::from_token(Some("OverWrite")).unwrap(),
        WriteMode::OverwriteTruncate
    );
    assert_eq!(WriteMode::from_overwrite(false), WriteMode::CreateExclusive);
    assert_eq!(
        WriteMode::from_overwrite(true),
        WriteMode::OverwriteTruncate
    );
}

#[test]
fn unknown_mode_token_is_a_format_error() {
    let err = WriteMode::from_token(Some("TRUNCATE")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("'OVERWRITE' or 'APPEND'"));
    assert!(err.to_string().contains("TRUNCATE"));
}

#[test]
fn create_exclusive_refuses_second_write() {
    let fx = Fixture::new();
    let target = fx.admit("note.txt");
    let writer = ContentWriter::plain();

    writer
        .write(&target, b"first", WriteMode::CreateExclusive)
        .unwrap();
    let err = writer
        .write(&target, b"second", WriteMode::CreateExclusive)
        .unwrap_err();

    assert!(matches!(err, ConfinedFsError::AlreadyExists { .. }));
    assert_eq!(fx.read("note.txt"), "first");
}

#[test]
fn append_accumulates_on_fresh_path() {
    let fx = Fixture::new();
    let target = fx.admit("log.txt");
    let writer = ContentWriter::plain();

    writer.write(&target, b"foo", WriteMode::Append).unwrap();
    writer.write(&target, b"bar", WriteMode::Append).unwrap();
    assert_eq!(fx.read("log.txt"), "foobar");
}

#[test]
fn overwrite_truncates_longer_previous_content() {
    let fx = Fixture::new();
    fx.file("data.txt", "a much longer previous body");
    let target = fx.admit("data.txt");

    ContentWriter::plain()
        .write(&target, b"short", WriteMode::OverwriteTruncate)
        .unwrap();
    assert_eq!(fx.read("data.txt"), "short");
}

#[test]
fn parents_are_created_for_every_mode() {
    let fx = Fixture::new();
    let writer = ContentWriter::plain();
    for (path, mode) in [
        ("a/one/x.txt", WriteMode::CreateExclusive),
        ("b/two/x.txt", WriteMode::Append),
        ("c/three/x.txt", WriteMode::OverwriteTruncate),
    ] {
        writer.write(&fx.admit(path), b"x", mode).unwrap();
        assert_eq!(fx.read(path), "x");
    }
}

#[test]
fn writing_onto_a_directory_is_an_io_error() {
    let fx = Fixture::new();
    std::fs::create_dir(fx.dir.path().join("dir")).unwrap();
    let err = ContentWriter::plain()
        .write(&fx.admit("dir"), b"x", WriteMode::OverwriteTruncate)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn gzip_codec_round_trips_through_flate2() {
    let fx = Fixture::new();
    let payload = b"compress me please, compress me please".to_vec();
    ContentWriter::gzip()
        .write(&fx.admit("blob.gz"), &payload, WriteMode::CreateExclusive)
        .unwrap();

    let raw = std::fs::read(fx.dir.path().join("blob.gz")).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    let mut decoded = Vec::new();
    GzDecoder::new(&raw[..]).read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, payload);
}

#[test]
fn gzip_level_trades_size_for_speed() {
    let fx = Fixture::new();
    let payload = vec![b'a'; 4096];
    for (name, level) in [("stored.gz", 0), ("best.gz", 9)] {
        ContentWriter::with_codec(GzipCodec::new(level))
            .write(&fx.admit(name), &payload, WriteMode::CreateExclusive)
            .unwrap();
    }

    let stored = fx.admit("stored.gz").metadata().unwrap().len();
    let best = fx.admit("best.gz").metadata().unwrap().len();
    assert!(stored > payload.len() as u64, "stored: {stored}");
    assert!(best < stored / 10, "best: {best}, stored: {stored}");

    let raw = std::fs::read(fx.dir.path().join("stored.gz")).unwrap();
    let mut decoded = Vec::new();
    GzDecoder::new(&raw[..]).read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, payload);
}

#[test]
fn gzip_append_yields_multi_member_stream() {
    let fx = Fixture::new();
    let target = fx.admit("events.gz");
    let writer = ContentWriter::gzip();
    writer.write(&target, b"foo", WriteMode::Append).unwrap();
    writer.write(&target, b"bar", WriteMode::Append).unwrap();

    let raw = std::fs::read(fx.dir.path().join("events.gz")).unwrap();
    let mut decoded = String::new();
    MultiGzDecoder::new(&raw[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, "foobar");
}

struct Reversed;

impl ContentCodec for Reversed {
    fn encode(&self, content: &[u8], sink: &mut dyn Write) -> io::Result<()> {
        let reversed: Vec<u8> = content.iter().rev().copied().collect();
        sink.write_all(&reversed)
    }
}

#[test]
fn custom_codecs_plug_into_the_writer() {
    let fx = Fixture::new();
    ContentWriter::with_codec(Reversed)
        .write(&fx.admit("rev.txt"), b"abc", WriteMode::CreateExclusive)
        .unwrap();
    assert_eq!(fx.read("rev.txt"), "cba");
}
