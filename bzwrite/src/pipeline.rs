//! Concurrent block pipeline.
//!
//! ```text
//!   write() ──▶ run-length ──▶ chunker ──▶ emitter ──▶ sink
//!                                 │            ▲
//!                                 ▼            │
//!                          encode workers ─────┘ (one-shot per block)
//! ```
//!
//! Each arrow between stages is a bounded queue, so a stage that gets ahead
//! of its consumer waits. The chunker hands every full block to the worker
//! pool and forwards a [`PendingBlock`] for it to the emitter in creation
//! order. The emitter waits on each pending block in turn, so blocks reach
//! the sink in the order they were cut no matter which finishes encoding
//! first.

use crate::block::{BlockEncoder, EncodedBlock};
use crate::config::WriterOptions;
use crate::format::{BZIP2_MAGIC, EOS_MAGIC, HUFFMAN_VERSION, RLE1_RUN_THRESHOLD};
use crate::rle::RunLengthEncoder;
use bzwrite_core::{BitWriter, BzError, Result, combine_stream_crc};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, error, trace};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Function run on a worker to encode one block.
pub(crate) type EncodeFn = Arc<dyn Fn(&mut BlockEncoder) -> Result<EncodedBlock> + Send + Sync>;

/// Tracks run-length groups in RLE1 output so blocks are never cut inside one.
#[derive(Debug, Default, Clone, Copy)]
struct GroupScanner {
    last: Option<u8>,
    run: usize,
}

impl GroupScanner {
    fn feed(&mut self, byte: u8) {
        if self.run == RLE1_RUN_THRESHOLD {
            // Count byte closes the group
            self.last = None;
            self.run = 0;
        } else if self.last == Some(byte) {
            self.run += 1;
        } else {
            self.last = Some(byte);
            self.run = 1;
        }
    }

    /// Trailing bytes that may belong to a group still in progress.
    fn open_bytes(&self) -> usize {
        self.run
    }
}

/// Cuts the RLE1 byte stream into blocks.
///
/// A block is cut as soon as it is full. Any trailing bytes of a run that is
/// not closed yet move to the next block, so a decoder that starts each
/// block afresh sees every group whole.
#[derive(Debug)]
pub struct Chunker {
    capacity: usize,
    next_seq: u64,
    current: BlockEncoder,
    scanner: GroupScanner,
}

impl Chunker {
    /// Create a chunker producing blocks of at most `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity <= RLE1_RUN_THRESHOLD {
            return Err(BzError::invalid_argument(format!(
                "block capacity {capacity} cannot hold a run-length group"
            )));
        }
        Ok(Self {
            capacity,
            next_seq: 0,
            current: BlockEncoder::new(0, capacity),
            scanner: GroupScanner::default(),
        })
    }

    /// Append RLE1 bytes and return every block that filled up.
    pub fn push(&mut self, mut bytes: &[u8]) -> Vec<BlockEncoder> {
        let mut full = Vec::new();
        while !bytes.is_empty() {
            let taken = self.current.write(bytes);
            for &byte in &bytes[..taken] {
                self.scanner.feed(byte);
            }
            bytes = &bytes[taken..];

            if self.current.is_full() {
                full.push(self.cut());
            }
        }
        full
    }

    /// Return the final partial block, if it holds anything.
    pub fn finish(self) -> Option<BlockEncoder> {
        (!self.current.is_empty()).then_some(self.current)
    }

    fn cut(&mut self) -> BlockEncoder {
        let carry = self.current.take_tail(self.scanner.open_bytes());
        self.next_seq += 1;
        let block = std::mem::replace(
            &mut self.current,
            BlockEncoder::new(self.next_seq, self.capacity),
        );

        self.scanner = GroupScanner::default();
        self.current.write(&carry);
        for &byte in &carry {
            self.scanner.feed(byte);
        }

        trace!(
            "cut block {} at {} bytes, carried {}",
            block.seq(),
            block.len(),
            carry.len()
        );
        block
    }
}

/// A block handed to the worker pool; resolves to its encoded form.
#[derive(Debug)]
pub struct PendingBlock {
    seq: u64,
    result: Receiver<Result<EncodedBlock>>,
}

impl PendingBlock {
    /// Position of the block in the stream.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Block until the worker has finished.
    pub fn wait(self) -> Result<EncodedBlock> {
        self.result.recv().map_err(|_| {
            BzError::internal(format!("block {} encoder stopped without a result", self.seq))
        })?
    }
}

/// Encode `block` on `pool`.
fn scatter(pool: &ThreadPool, mut block: BlockEncoder, encode: &EncodeFn) -> PendingBlock {
    let (done, result) = bounded(1);
    let seq = block.seq();
    let encode = Arc::clone(encode);
    pool.spawn(move || {
        // The emitter may already have given up on the stream
        let _ = done.send(encode(&mut block));
    });
    PendingBlock { seq, result }
}

/// Running pipeline stages feeding one sink.
pub struct Pipeline<W: Write + Send + 'static> {
    intake: Sender<Vec<u8>>,
    run_length: JoinHandle<Result<()>>,
    chunker: JoinHandle<Result<()>>,
    emitter: JoinHandle<Result<W>>,
    _pool: Arc<ThreadPool>,
}

impl<W: Write + Send + 'static> Pipeline<W> {
    /// Start all stages. The stream header is written before the first block.
    pub fn start(sink: W, options: &WriterOptions) -> Result<Self> {
        Self::start_with(sink, options, Arc::new(BlockEncoder::encode))
    }

    pub(crate) fn start_with(sink: W, options: &WriterOptions, encode: EncodeFn) -> Result<Self> {
        options.validate()?;
        let depth = options.queue_depth();
        let capacity = options.block_size().capacity();
        let digit = options.block_size().digit();
        let cache_bytes = options.bit_cache_bytes();

        let pool = ThreadPoolBuilder::new()
            .num_threads(options.workers())
            .thread_name(|i| format!("bzwrite-encode-{i}"))
            .panic_handler(|_| error!("block encoder panicked"))
            .build()
            .map_err(|e| BzError::internal(format!("cannot start encode workers: {e}")))?;
        let pool = Arc::new(pool);

        let (intake, raw) = bounded::<Vec<u8>>(depth);
        let (rle_tx, rle_rx) = bounded::<Vec<u8>>(depth);
        let (pending_tx, pending_rx) = bounded::<PendingBlock>(depth.max(options.workers()));

        debug!(
            "starting pipeline: level {}, {} workers, queue depth {}",
            options.block_size().level(),
            options.workers(),
            depth
        );

        let emitter = thread::Builder::new()
            .name("bzwrite-emit".into())
            .spawn(move || emit_stage(sink, digit, cache_bytes, pending_rx))?;

        let chunk_pool = Arc::clone(&pool);
        let chunker = thread::Builder::new()
            .name("bzwrite-chunk".into())
            .spawn(move || chunk_stage(rle_rx, pending_tx, capacity, &chunk_pool, &encode))?;

        let run_length = thread::Builder::new()
            .name("bzwrite-rle".into())
            .spawn(move || run_length_stage(raw, rle_tx))?;

        Ok(Self {
            intake,
            run_length,
            chunker,
            emitter,
            _pool: pool,
        })
    }

    /// Queue raw bytes, waiting while the intake queue is full.
    pub fn send(&self, bytes: Vec<u8>) -> Result<()> {
        self.intake.send(bytes).map_err(|_| BzError::PipelineAborted)
    }

    /// Close the intake, let every stage drain, and return the sink.
    ///
    /// Reports the first real failure of any stage rather than the
    /// disconnects it caused upstream.
    pub fn finish(self) -> Result<W> {
        drop(self.intake);

        let run_length = join_stage(self.run_length, "run-length");
        let chunker = join_stage(self.chunker, "chunker");
        let (sink, emit_err) = match join_stage(self.emitter, "emitter") {
            Ok(sink) => (Some(sink), None),
            Err(err) => (None, Some(err)),
        };

        if let Some(err) = root_cause([emit_err, chunker.err(), run_length.err()]) {
            error!("pipeline failed: {err}");
            return Err(err);
        }
        sink.ok_or(BzError::PipelineAborted)
    }
}

fn join_stage<T>(handle: JoinHandle<Result<T>>, name: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| BzError::internal(format!("{name} stage panicked")))?
}

fn root_cause(errors: impl IntoIterator<Item = Option<BzError>>) -> Option<BzError> {
    let mut aborted = None;
    for err in errors.into_iter().flatten() {
        if matches!(err, BzError::PipelineAborted) {
            aborted.get_or_insert(err);
        } else {
            return Some(err);
        }
    }
    aborted
}

fn run_length_stage(input: Receiver<Vec<u8>>, output: Sender<Vec<u8>>) -> Result<()> {
    let mut encoder = RunLengthEncoder::new();
    let mut total = 0usize;

    for chunk in input.iter() {
        total += chunk.len();
        let encoded = encoder.push(&chunk);
        if !encoded.is_empty() {
            output.send(encoded).map_err(|_| BzError::PipelineAborted)?;
        }
    }

    let tail = encoder.finish();
    if !tail.is_empty() {
        output.send(tail).map_err(|_| BzError::PipelineAborted)?;
    }
    debug!("run-length stage done after {total} input bytes");
    Ok(())
}

fn chunk_stage(
    input: Receiver<Vec<u8>>,
    output: Sender<PendingBlock>,
    capacity: usize,
    pool: &ThreadPool,
    encode: &EncodeFn,
) -> Result<()> {
    let mut chunker = Chunker::new(capacity)?;

    for bytes in input.iter() {
        for block in chunker.push(&bytes) {
            output
                .send(scatter(pool, block, encode))
                .map_err(|_| BzError::PipelineAborted)?;
        }
    }

    if let Some(block) = chunker.finish() {
        output
            .send(scatter(pool, block, encode))
            .map_err(|_| BzError::PipelineAborted)?;
    }
    debug!("chunker done");
    Ok(())
}

fn emit_stage<W: Write>(
    sink: W,
    digit: u8,
    cache_bytes: usize,
    input: Receiver<PendingBlock>,
) -> Result<W> {
    let mut out = BitWriter::with_capacity(sink, cache_bytes)?;
    for byte in [BZIP2_MAGIC[0], BZIP2_MAGIC[1], HUFFMAN_VERSION, digit] {
        out.write_bits(byte as u32, 8)?;
    }

    let mut stream_crc = 0u32;
    let mut expected = 0u64;
    for pending in input.iter() {
        if pending.seq() != expected {
            return Err(BzError::internal(format!(
                "block {} arrived while waiting for block {expected}",
                pending.seq()
            )));
        }
        let block = pending.wait()?;
        block.serialize(&mut out)?;
        stream_crc = combine_stream_crc(stream_crc, block.crc());
        trace!("emitted block {} ({} bytes)", block.seq(), block.input_len());
        expected += 1;
    }

    out.write_u48(EOS_MAGIC)?;
    out.write_bits(stream_crc, 32)?;
    out.close()?;
    debug!(
        "stream complete: {expected} blocks, {} bits, crc {stream_crc:#010x}",
        out.bits_written()
    );
    out.into_inner()
}
