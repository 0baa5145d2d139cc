//! The streaming writer.

use crate::config::{BlockSize, WriterOptions};
use crate::pipeline::Pipeline;
use bzwrite_core::{BzError, Result};
use log::{debug, warn};
use std::io::{self, Write};

/// Largest piece of caller input queued as one intake item.
const INTAKE_CHUNK: usize = 64 * 1024;

enum State<W: Write + Send + 'static> {
    /// Nothing written yet; the block size can still change.
    Idle(W),
    Running(Pipeline<W>),
    /// Holds the sink if the stream was completed successfully.
    Closed(Option<W>),
}

/// BZip2 stream writer.
///
/// Bytes written are compressed on background threads. The stream header
/// is written when the pipeline starts, on the first call to
/// [`write`](BzWriter::write); [`close`](BzWriter::close) waits for every
/// block and writes the end-of-stream marker.
///
/// # Example
///
/// ```
/// use bzwrite::BzWriter;
///
/// let mut writer = BzWriter::new(Vec::new());
/// writer.set_block_size(1).unwrap();
/// writer.write(b"hello hello hello").unwrap();
/// let compressed = writer.finish().unwrap();
/// assert_eq!(&compressed[..4], b"BZh1");
/// ```
pub struct BzWriter<W: Write + Send + 'static> {
    options: WriterOptions,
    state: State<W>,
}

impl<W: Write + Send + 'static> BzWriter<W> {
    /// Create a writer with default options.
    pub fn new(sink: W) -> Self {
        Self {
            options: WriterOptions::default(),
            state: State::Idle(sink),
        }
    }

    /// Create a writer with the given options.
    pub fn with_options(sink: W, options: WriterOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            state: State::Idle(sink),
        })
    }

    /// Current options.
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Set the block size level (1-9).
    ///
    /// Only allowed before the first write.
    pub fn set_block_size(&mut self, level: u8) -> Result<()> {
        match self.state {
            State::Idle(_) => {}
            State::Running(_) => {
                return Err(BzError::invalid_argument(
                    "block size cannot change after the first write",
                ));
            }
            State::Closed(_) => return Err(BzError::ClosedWriter),
        }
        let block_size = BlockSize::new(level)?;
        self.options = self.options.clone().with_block_size(block_size);
        Ok(())
    }

    /// Queue `buf` for compression and return its length.
    ///
    /// Fails with [`BzError::PipelineAborted`] once a background stage has
    /// stopped; [`close`](BzWriter::close) then reports why.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if let State::Idle(_) = self.state {
            self.start()?;
        }
        let State::Running(pipeline) = &self.state else {
            return Err(BzError::ClosedWriter);
        };

        for chunk in buf.chunks(INTAKE_CHUNK) {
            pipeline.send(chunk.to_vec())?;
        }
        Ok(buf.len())
    }

    /// Flush all buffered data, finish the stream and wait for the sink to
    /// receive the end-of-stream marker.
    ///
    /// Any failure of a background stage is reported here. Closing twice is
    /// a no-op.
    pub fn close(&mut self) -> Result<()> {
        let pipeline = match std::mem::replace(&mut self.state, State::Closed(None)) {
            State::Idle(sink) => Pipeline::start(sink, &self.options)?,
            State::Running(pipeline) => pipeline,
            closed @ State::Closed(_) => {
                self.state = closed;
                return Ok(());
            }
        };

        let sink = pipeline.finish()?;
        debug!("writer closed");
        self.state = State::Closed(Some(sink));
        Ok(())
    }

    /// Close the stream and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        match std::mem::replace(&mut self.state, State::Closed(None)) {
            State::Closed(Some(sink)) => Ok(sink),
            _ => Err(BzError::ClosedWriter),
        }
    }

    fn start(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed(None)) {
            State::Idle(sink) => {
                self.state = State::Running(Pipeline::start(sink, &self.options)?);
            }
            other => self.state = other,
        }
        Ok(())
    }
}

impl<W: Write + Send + 'static> Write for BzWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BzWriter::write(self, buf).map_err(io::Error::from)
    }

    /// Blocks are only complete once they are full or the stream is
    /// closed, so this does not force any output.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write + Send + 'static> Drop for BzWriter<W> {
    fn drop(&mut self) {
        if matches!(self.state, State::Closed(_)) {
            return;
        }
        if let Err(err) = self.close() {
            warn!("bzip2 stream dropped without a clean close: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::{Arc, Mutex};

    /// Sink that stays readable after the writer is gone.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn decompress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        bzip2::read::BzDecoder::new(data)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_write_and_finish() {
        let mut writer = BzWriter::new(Vec::new());
        assert_eq!(writer.write(b"hello world").unwrap(), 11);
        let out = writer.finish().unwrap();
        assert_eq!(&out[..4], b"BZh9");
        assert_eq!(decompress(&out), b"hello world");
    }

    #[test]
    fn test_set_block_size_before_write() {
        let mut writer = BzWriter::new(Vec::new());
        writer.set_block_size(3).unwrap();
        assert_eq!(writer.options().block_size().level(), 3);
        writer.write(b"abc").unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(&out[..4], b"BZh3");
    }

    #[test]
    fn test_set_block_size_after_write_fails() {
        let mut writer = BzWriter::new(Vec::new());
        writer.write(b"abc").unwrap();
        assert!(matches!(
            writer.set_block_size(1),
            Err(BzError::InvalidArgument { .. })
        ));
        assert_eq!(writer.options().block_size().level(), 9);
    }

    #[test]
    fn test_set_block_size_out_of_range() {
        let mut writer = BzWriter::new(Vec::new());
        assert!(writer.set_block_size(0).is_err());
        assert!(writer.set_block_size(10).is_err());
        assert_eq!(writer.options().block_size().level(), 9);
    }

    #[test]
    fn test_write_after_close() {
        let mut writer = BzWriter::new(Vec::new());
        writer.write(b"abc").unwrap();
        writer.close().unwrap();
        assert!(matches!(writer.write(b"more"), Err(BzError::ClosedWriter)));
        assert!(matches!(
            writer.set_block_size(2),
            Err(BzError::ClosedWriter)
        ));
        // Second close is a no-op
        writer.close().unwrap();
    }

    #[test]
    fn test_close_without_write() {
        let mut writer = BzWriter::new(Vec::new());
        writer.close().unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(out.len(), 14);
        assert!(decompress(&out).is_empty());
    }

    #[test]
    fn test_zero_byte_write() {
        let mut writer = BzWriter::new(Vec::new());
        assert_eq!(writer.write(b"").unwrap(), 0);
        let out = writer.finish().unwrap();
        assert!(decompress(&out).is_empty());
    }

    #[test]
    fn test_io_write_trait() {
        let mut writer = BzWriter::new(Vec::new());
        writeln!(writer, "line one").unwrap();
        writeln!(writer, "line two").unwrap();
        writer.flush().unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(decompress(&out), b"line one\nline two\n");
    }

    #[test]
    fn test_io_error_kind_after_close() {
        let mut writer = BzWriter::new(Vec::new());
        writer.close().unwrap();
        let err = Write::write(&mut writer, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_drop_closes_stream() {
        let sink = SharedSink::default();
        {
            let mut writer = BzWriter::new(sink.clone());
            writer.write(b"dropped, not closed").unwrap();
        }
        let out = sink.0.lock().unwrap().clone();
        assert_eq!(decompress(&out), b"dropped, not closed");
    }

    #[test]
    fn test_invalid_options() {
        let options = WriterOptions::new().with_workers(0);
        assert!(BzWriter::with_options(Vec::new(), options).is_err());
    }
}
