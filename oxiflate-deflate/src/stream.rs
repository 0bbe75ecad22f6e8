//! Session façade over the compression and decompression engines.
//!
//! A [`Stream`] owns one engine at a time and reports every outcome as a
//! [`ReturnCode`]. Errors never escape as values of their own: the code
//! tells the caller what happened and [`Stream::message`] keeps the text of
//! the last failure.
//!
//! # Example
//!
//! ```rust
//! use oxiflate_core::{FlushMode, ReturnCode};
//! use oxiflate_deflate::{DeflateConfig, InflateConfig, Stream};
//!
//! let mut deflate = Stream::new();
//! assert_eq!(deflate.init_compress(DeflateConfig::new()), ReturnCode::Ok);
//! let mut compressed = vec![0u8; deflate.bound(11)];
//! let progress = deflate.process(b"hello world", &mut compressed, FlushMode::Finish);
//! assert_eq!(progress.code, ReturnCode::StreamEnd);
//! compressed.truncate(progress.produced);
//!
//! let mut inflate = Stream::new();
//! assert_eq!(inflate.init_decompress(InflateConfig::new()), ReturnCode::Ok);
//! let mut output = [0u8; 32];
//! let progress = inflate.process(&compressed, &mut output, FlushMode::None);
//! assert_eq!(progress.code, ReturnCode::StreamEnd);
//! assert_eq!(&output[..progress.produced], b"hello world");
//! ```

use crate::deflate::{DeflateConfig, Deflater, Strategy, conservative_bound};
use crate::gzip::GzipHeader;
use crate::inflate::{InflateConfig, Inflater};
use crate::wrapper::WrapperType;
use log::debug;
use oxiflate_core::buffers::StreamBuffers;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressionLevel, FlushMode, ReturnCode};

/// Outcome of one [`Stream::process`] or [`Stream::sync`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Output bytes written.
    pub produced: usize,
    /// Result code.
    pub code: ReturnCode,
}

#[derive(Debug, Default)]
enum Engine {
    #[default]
    Idle,
    Deflate(Box<Deflater>),
    Inflate(Box<Inflater>),
}

/// A compression or decompression session.
#[derive(Debug, Default)]
pub struct Stream {
    engine: Engine,
    message: Option<String>,
}

impl Stream {
    /// Create a session with no engine; call an `init_*` method next.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compression session.
    pub fn deflate(config: DeflateConfig) -> Result<Self> {
        Ok(Self {
            engine: Engine::Deflate(Box::new(Deflater::new(config)?)),
            message: None,
        })
    }

    /// Create a decompression session.
    pub fn inflate(config: InflateConfig) -> Result<Self> {
        Ok(Self {
            engine: Engine::Inflate(Box::new(Inflater::new(config)?)),
            message: None,
        })
    }

    /// Start compressing, replacing any current engine.
    pub fn init_compress(&mut self, config: DeflateConfig) -> ReturnCode {
        let result = Deflater::new(config).map(|deflater| {
            self.engine = Engine::Deflate(Box::new(deflater));
            ReturnCode::Ok
        });
        self.message = None;
        self.settle(result)
    }

    /// Start decompressing, replacing any current engine.
    pub fn init_decompress(&mut self, config: InflateConfig) -> ReturnCode {
        let result = Inflater::new(config).map(|inflater| {
            self.engine = Engine::Inflate(Box::new(inflater));
            ReturnCode::Ok
        });
        self.message = None;
        self.settle(result)
    }

    /// Run the engine over `input` into `output`.
    pub fn process(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Progress {
        let mut buf = StreamBuffers::new(input, output);
        let result = match &mut self.engine {
            Engine::Idle => Err(not_initialized()),
            Engine::Deflate(deflater) => deflater.deflate(&mut buf, flush),
            Engine::Inflate(inflater) => inflater.inflate(&mut buf, flush),
        };
        Progress {
            consumed: buf.consumed(),
            produced: buf.produced(),
            code: self.settle(result),
        }
    }

    /// Skip `input` up to and past the next `00 00 FF FF` marker.
    ///
    /// Decompression only.
    pub fn sync(&mut self, input: &[u8]) -> Progress {
        let mut sink = [0u8; 0];
        let mut buf = StreamBuffers::new(input, &mut sink);
        let result = match &mut self.engine {
            Engine::Inflate(inflater) => inflater.sync(&mut buf),
            Engine::Deflate(_) => Err(OxiFlateError::invalid_state(
                "sync is only available when decompressing",
            )),
            Engine::Idle => Err(not_initialized()),
        };
        Progress {
            consumed: buf.consumed(),
            produced: 0,
            code: self.settle(result),
        }
    }

    /// Install a preset dictionary.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> ReturnCode {
        let result = match &mut self.engine {
            Engine::Deflate(deflater) => deflater.set_dictionary(dictionary),
            Engine::Inflate(inflater) => inflater.set_dictionary(dictionary),
            Engine::Idle => Err(not_initialized()),
        };
        self.settle(result.map(|_| ReturnCode::Ok))
    }

    /// Change level and strategy mid-stream (compression only).
    pub fn set_params(&mut self, level: CompressionLevel, strategy: Strategy) -> ReturnCode {
        let result = match &mut self.engine {
            Engine::Deflate(deflater) => {
                deflater.set_params(level, strategy);
                Ok(ReturnCode::Ok)
            }
            Engine::Inflate(_) => Err(OxiFlateError::invalid_state(
                "parameters apply to compression only",
            )),
            Engine::Idle => Err(not_initialized()),
        };
        self.settle(result)
    }

    /// Supply the gzip header to write (gzip compression, before the first
    /// [`process`](Self::process)).
    pub fn set_gzip_header(&mut self, header: GzipHeader) -> ReturnCode {
        let result = match &mut self.engine {
            Engine::Deflate(deflater) => deflater.set_gzip_header(header),
            Engine::Inflate(_) => Err(OxiFlateError::invalid_state(
                "gzip headers are written when compressing",
            )),
            Engine::Idle => Err(not_initialized()),
        };
        self.settle(result.map(|()| ReturnCode::Ok))
    }

    /// The gzip header read by a decompression session.
    pub fn gzip_header(&self) -> Option<&GzipHeader> {
        match &self.engine {
            Engine::Inflate(inflater) => inflater.gzip_header(),
            _ => None,
        }
    }

    /// Start a new stream with the same settings.
    pub fn reset(&mut self) -> ReturnCode {
        let result = match &mut self.engine {
            Engine::Deflate(deflater) => {
                deflater.reset();
                Ok(ReturnCode::Ok)
            }
            Engine::Inflate(inflater) => {
                inflater.reset();
                Ok(ReturnCode::Ok)
            }
            Engine::Idle => Err(not_initialized()),
        };
        if result.is_ok() {
            self.message = None;
        }
        self.settle(result)
    }

    /// Release the engine. Only a fresh init is valid afterwards.
    pub fn end(&mut self) -> ReturnCode {
        match std::mem::take(&mut self.engine) {
            Engine::Idle => self.settle(Err(not_initialized())),
            Engine::Deflate(deflater) => {
                debug!(
                    "deflate end: {} bytes in, {} bytes out",
                    deflater.total_in(),
                    deflater.total_out()
                );
                ReturnCode::Ok
            }
            Engine::Inflate(inflater) => {
                debug!(
                    "inflate end: {} bytes in, {} bytes out",
                    inflater.total_in(),
                    inflater.total_out()
                );
                ReturnCode::Ok
            }
        }
    }

    /// Running checksum; see [`Deflater::adler`] and [`Inflater::adler`].
    pub fn adler(&self) -> u32 {
        match &self.engine {
            Engine::Deflate(deflater) => deflater.adler(),
            Engine::Inflate(inflater) => inflater.adler(),
            Engine::Idle => 1,
        }
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        match &self.engine {
            Engine::Deflate(deflater) => deflater.total_in(),
            Engine::Inflate(inflater) => inflater.total_in(),
            Engine::Idle => 0,
        }
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        match &self.engine {
            Engine::Deflate(deflater) => deflater.total_out(),
            Engine::Inflate(inflater) => inflater.total_out(),
            Engine::Idle => 0,
        }
    }

    /// Text of the last error.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Upper bound on the compressed size of `source_len` bytes.
    ///
    /// Outside a compression session the bound assumes gzip framing.
    pub fn bound(&self, source_len: usize) -> usize {
        match &self.engine {
            Engine::Deflate(deflater) => deflater.bound(source_len),
            _ => conservative_bound(source_len) + WrapperType::Gzip.overhead(),
        }
    }

    fn settle(&mut self, result: Result<ReturnCode>) -> ReturnCode {
        result.unwrap_or_else(|err| {
            let code = err.return_code();
            self.message = Some(err.to_string());
            code
        })
    }
}

fn not_initialized() -> OxiFlateError {
    OxiFlateError::invalid_state("stream is not initialized")
}
