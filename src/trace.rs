use std::{
    fs,
    io::{self, BufRead, BufReader},
    mem,
    path::PathBuf,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use thiserror::Error;
use xz2::read::XzDecoder;

/// One line of a trace: `r <addr>` or `w <addr> <byte>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u64),
    Write(u64, u8),
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("could not read trace: {0}")]
    Io(#[from] io::Error),
    #[error("trace line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

fn parse_num(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("bad number {text:?}: {err}"))
}

/// Parses one trace line. Blank lines and `#` comments yield `None`.
pub fn parse_line(text: &str) -> Result<Option<Access>, String> {
    let text = text.split('#').next().unwrap_or("").trim();
    let mut fields = text.split_whitespace();
    let Some(op) = fields.next() else {
        return Ok(None);
    };
    let addr = parse_num(fields.next().ok_or("missing address")?)?;
    let access = match op {
        "r" | "R" => Access::Read(addr),
        "w" | "W" => {
            let byte = parse_num(fields.next().ok_or("missing byte to write")?)?;
            let byte = u8::try_from(byte).map_err(|_| format!("{byte:#x} does not fit in a byte"))?;
            Access::Write(addr, byte)
        }
        _ => return Err(format!("unknown access kind {op:?}")),
    };
    match fields.next() {
        Some(extra) => Err(format!("unexpected {extra:?}")),
        None => Ok(Some(access)),
    }
}

/// A trace decoded on a background thread and handed over in blocks.
/// The channel closes once the trace is exhausted or after the first error.
pub struct Trace {
    pub rec: Receiver<Result<Vec<Access>, TraceError>>,
    _thread: JoinHandle<()>,
}

impl Trace {
    pub fn read(path: PathBuf, access_per_block: usize, blocks_per_queue: usize) -> io::Result<Trace> {
        let stream = fs::File::open(&path)?;
        let compressed = path.extension().is_some_and(|ext| ext == "xz");
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue);
        let access_per_block = access_per_block.max(1);

        let t = thread::spawn(move || {
            if compressed {
                Trace::run_thread(BufReader::new(XzDecoder::new(stream)), access_per_block, sender)
            } else {
                Trace::run_thread(BufReader::new(stream), access_per_block, sender)
            }
        });

        Ok(Trace {
            rec: receiver,
            _thread: t,
        })
    }

    fn run_thread<R: BufRead>(
        stream: R,
        access_per_block: usize,
        queue: Sender<Result<Vec<Access>, TraceError>>,
    ) {
        let mut buffer = Vec::with_capacity(access_per_block);
        for (idx, line) in stream.lines().enumerate() {
            let parsed = line.map_err(TraceError::from).and_then(|text| {
                parse_line(&text).map_err(|reason| TraceError::Parse {
                    line: idx + 1,
                    reason,
                })
            });
            match parsed {
                Ok(Some(access)) => buffer.push(access),
                Ok(None) => continue,
                Err(err) => {
                    let _ = queue.send(Err(err));
                    return;
                }
            }
            if buffer.len() == access_per_block {
                let full = mem::replace(&mut buffer, Vec::with_capacity(access_per_block));
                match queue.send(Ok(full)) {
                    Ok(()) => {}
                    Err(_) => return,
                }
            }
        }
        if !buffer.is_empty() {
            let _ = queue.send(Ok(buffer));
        }
    }
}
