use std::io::{ErrorKind, Write};

use bertrpc_term::{Encoder, Term};
use bertrpc_transport::BertStream;
use bytes::BytesMut;

use crate::codec::{encode_frame, encode_term_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Blocking BERP frame writer over any [`Write`] sink.
///
/// Each frame is staged in memory and handed to the sink as one buffer,
/// then flushed. Callers that share a writer behind a lock therefore never
/// interleave partial frames.
pub struct FrameWriter<T> {
    sink: T,
    staged: BytesMut,
    config: FrameConfig,
    encoder: Encoder,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(sink: T) -> Self {
        Self::with_config(sink, FrameConfig::default())
    }

    pub fn with_config(sink: T, config: FrameConfig) -> Self {
        Self {
            sink,
            staged: BytesMut::with_capacity(8 * 1024),
            config,
            encoder: Encoder::default(),
        }
    }

    /// Use `encoder` for [`write_term`](Self::write_term), e.g. to speak
    /// the legacy protocol generation.
    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Encode `term` directly into the frame buffer and send it.
    ///
    /// Nothing reaches the sink if the encoded body exceeds the configured
    /// maximum.
    pub fn write_term(&mut self, term: &Term) -> Result<()> {
        self.staged.clear();
        encode_term_frame(
            &self.encoder,
            term,
            &mut self.staged,
            self.config.max_payload_size,
        )?;
        self.drain()
    }

    /// Frame and send an already-encoded term.
    pub fn write_encoded(&mut self, body: &[u8]) -> Result<()> {
        let max = self.config.max_payload_size;
        if body.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: body.len(),
                max,
            });
        }
        self.staged.clear();
        encode_frame(body, &mut self.staged)?;
        self.drain()
    }

    fn drain(&mut self) -> Result<()> {
        let mut rest = &self.staged[..];
        while !rest.is_empty() {
            match self.sink.write(rest) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => rest = &rest[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        while let Err(err) = self.sink.flush() {
            if err.kind() != ErrorKind::Interrupted {
                return Err(err.into());
            }
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &T {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.sink
    }

    pub fn into_inner(self) -> T {
        self.sink
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<BertStream> {
    /// Wrap a connected stream, applying `config.write_timeout` to it.
    pub fn for_stream(stream: BertStream, config: FrameConfig) -> Result<Self> {
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bertrpc_term::{decode, EncodeConfig, Generation};

    use super::*;
    use crate::codec::decode_frame;

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> BytesMut {
        BytesMut::from(writer.into_inner().into_inner().as_slice())
    }

    #[test]
    fn write_single_term() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.write_term(&Term::Integer(42)).unwrap();

        assert_eq!(&written(writer)[..], &[0, 0, 0, 3, 131, 97, 42]);
    }

    #[test]
    fn write_multiple_terms() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.write_term(&Term::atom("one")).unwrap();
        writer.write_term(&Term::from("two")).unwrap();

        let mut wire = written(writer);
        let first = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        let second = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(decode(&first).unwrap(), Term::atom("one"));
        assert_eq!(decode(&second).unwrap(), Term::from("two"));
        assert!(wire.is_empty());
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig::default().with_max_payload_size(4);
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::new()), cfg);

        let err = writer.write_term(&Term::from("oversized")).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        let err = writer.write_encoded(b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn legacy_encoder_writes_bare_booleans() {
        let encoder = Encoder::new(EncodeConfig::default().with_generation(Generation::Legacy));
        let mut writer = FrameWriter::new(Cursor::new(Vec::new())).with_encoder(encoder);
        writer.write_term(&Term::Boolean(true)).unwrap();

        assert_eq!(
            &written(writer)[..],
            &[0, 0, 0, 8, 131, 100, 0, 4, 116, 114, 117, 101]
        );
    }

    #[test]
    fn header_and_body_flushed_once() {
        let sink = CountingWriter::default();
        let writes = Arc::clone(&sink.writes);
        let flushes = Arc::clone(&sink.flushes);
        let mut writer = FrameWriter::new(sink);

        writer.write_term(&Term::atom("ping")).unwrap();

        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = FrameWriter::new(InterruptedOnce::default());
        writer.write_term(&Term::atom("retry")).unwrap();
        assert!(!writer.into_inner().data.is_empty());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.write_term(&Term::Nil).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct CountingWriter {
        writes: Arc<AtomicUsize>,
        flushes: Arc<AtomicUsize>,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptedOnce {
        write_interrupted: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.write_interrupted {
                self.write_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
