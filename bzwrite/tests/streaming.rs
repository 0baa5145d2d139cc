//! Streaming writer behaviour.

use bzwrite::{BlockSize, BzError, BzWriter, WriterOptions, compress};
use std::io::{self, Read, Write};

fn inflate(compressed: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    bzip2::read::BzDecoder::new(compressed)
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn sample(len: usize) -> Vec<u8> {
    let mut state = 11u64;
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let byte = b'a' + (state >> 40) as u8 % 6;
        let repeat = if state % 5 == 0 { ((state >> 16) % 300) as usize } else { 1 };
        data.extend(std::iter::repeat_n(byte, repeat));
    }
    data.truncate(len);
    data
}

fn level_one() -> WriterOptions {
    WriterOptions::new().with_block_size(BlockSize::new(1).unwrap())
}

#[test]
fn test_chunked_writes_match_single_write() {
    let data = sample(500_000);
    let expected = compress(&data, BlockSize::new(1).unwrap()).unwrap();

    for chunk_size in [3, 259, 4096, 100_000] {
        let mut writer = BzWriter::with_options(Vec::new(), level_one()).unwrap();
        for chunk in data[..20_000].chunks(chunk_size.min(64)) {
            writer.write(chunk).unwrap();
        }
        for chunk in data[20_000..].chunks(chunk_size) {
            writer.write(chunk).unwrap();
        }
        let out = writer.finish().unwrap();
        assert!(out == expected, "chunk size {chunk_size} changed the output");
    }

    assert_eq!(inflate(&expected), data);
}

#[test]
fn test_io_copy_into_writer() {
    let data = sample(300_000);
    let mut writer = BzWriter::with_options(Vec::new(), level_one().with_workers(2)).unwrap();
    let copied = io::copy(&mut &data[..], &mut writer).unwrap();
    assert_eq!(copied as usize, data.len());
    let out = writer.finish().unwrap();
    assert_eq!(inflate(&out), data);
}

#[test]
fn test_single_worker() {
    let data = sample(250_000);
    let options = level_one().with_workers(1).with_queue_depth(1);
    let mut writer = BzWriter::with_options(Vec::new(), options).unwrap();
    writer.write(&data).unwrap();
    assert_eq!(inflate(&writer.finish().unwrap()), data);
}

#[test]
fn test_small_bit_cache() {
    let data = sample(50_000);
    let options = level_one().with_bit_cache_bytes(1);
    let mut writer = BzWriter::with_options(Vec::new(), options).unwrap();
    writer.write(&data).unwrap();
    assert_eq!(inflate(&writer.finish().unwrap()), data);
}

#[test]
fn test_empty_write_then_close() {
    let mut writer = BzWriter::new(Vec::new());
    writer.write(&[]).unwrap();
    let out = writer.finish().unwrap();
    assert!(inflate(&out).is_empty());
}

#[test]
fn test_block_size_rules() {
    let mut writer = BzWriter::new(Vec::new());
    assert!(matches!(
        writer.set_block_size(0),
        Err(BzError::InvalidArgument { .. })
    ));
    writer.set_block_size(2).unwrap();
    writer.write(b"data").unwrap();
    assert!(writer.set_block_size(3).is_err());
    let out = writer.finish().unwrap();
    assert_eq!(&out[..4], b"BZh2");
}

#[test]
fn test_closed_writer() {
    let mut writer = BzWriter::new(Vec::new());
    writer.write(b"data").unwrap();
    writer.close().unwrap();
    assert!(matches!(writer.write(b"x"), Err(BzError::ClosedWriter)));
}

#[test]
fn test_sink_failure_surfaces_on_close() {
    struct FailAfter(usize);
    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.0 < buf.len() {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "sink full"));
            }
            self.0 -= buf.len();
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let data = sample(400_000);
    let mut writer = BzWriter::with_options(FailAfter(1000), level_one()).unwrap();
    for chunk in data.chunks(10_000) {
        match writer.write(chunk) {
            Ok(_) => {}
            Err(BzError::PipelineAborted) => break,
            Err(other) => panic!("unexpected write error: {other}"),
        }
    }
    match writer.close() {
        Err(BzError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::StorageFull),
        other => panic!("expected sink error, got {other:?}"),
    }
}
