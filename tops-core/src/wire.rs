//! Capture-формат событий.
//!
//! ```text
//! "EVCP" | version:u8 | frame*
//! frame = len:u32 LE | crc32(payload):u32 LE | postcard(Event)
//! ```
//!
//! Чистый EOF на границе кадра - конец потока. Всё остальное
//! (оборванный кадр, CRC, мусор в payload) - ошибка декодирования.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crc32fast::Hasher as Crc32;

use crate::error::WireError;
use crate::source::EventSource;
use crate::types::Event;

/// Magic в начале capture-файла
pub const CAPTURE_MAGIC: [u8; 4] = *b"EVCP";

/// Текущая версия формата
pub const WIRE_VERSION: u8 = 1;

/// Верхняя граница длины одного кадра
pub const MAX_FRAME_LEN: u32 = 1 << 20;

const HEADER_LEN: u64 = 5;
const FRAME_HEADER_LEN: usize = 8;

/// Кадр целиком: длина, CRC, payload
pub fn encode_frame(event: &Event) -> Result<Vec<u8>, WireError> {
    let payload = postcard::to_allocvec(event)?;
    let mut hasher = Crc32::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Запись capture-файла
pub struct CaptureWriter<W: Write> {
    inner: W,
}

impl CaptureWriter<BufWriter<File>> {
    /// Создать (перезаписать) файл
    pub fn create(path: impl AsRef<Path>) -> Result<Self, WireError> {
        let file = File::create(path)?;
        Self::new(BufWriter::with_capacity(1 << 20, file))
    }
}

impl<W: Write> CaptureWriter<W> {
    /// Пишет заголовок сразу
    pub fn new(mut inner: W) -> Result<Self, WireError> {
        inner.write_all(&CAPTURE_MAGIC)?;
        inner.write_all(&[WIRE_VERSION])?;
        Ok(Self { inner })
    }

    pub fn write_event(&mut self, event: &Event) -> Result<(), WireError> {
        self.inner.write_all(&encode_frame(event)?)?;
        Ok(())
    }

    /// flush и вернуть writer
    pub fn finish(mut self) -> Result<W, WireError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Чтение capture-файла как [`EventSource`]
pub struct CaptureReader<R: Read> {
    inner: R,
    offset: u64,
}

impl CaptureReader<BufReader<File>> {
    /// Открыть файл и проверить заголовок
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WireError> {
        let file = File::open(path)?;
        Self::new(BufReader::with_capacity(1 << 20, file))
    }
}

impl<R: Read> CaptureReader<R> {
    /// Читает и проверяет заголовок
    pub fn new(mut inner: R) -> Result<Self, WireError> {
        let mut header = [0u8; HEADER_LEN as usize];
        let n = read_full(&mut inner, &mut header)?;
        if n < 4 || header[..4] != CAPTURE_MAGIC {
            return Err(WireError::BadMagic);
        }
        if n < header.len() {
            return Err(WireError::Truncated { offset: 0 });
        }
        if header[4] != WIRE_VERSION {
            return Err(WireError::UnsupportedWireVersion(header[4]));
        }
        Ok(Self {
            inner,
            offset: HEADER_LEN,
        })
    }

    /// Смещение следующего кадра
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: Read> EventSource for CaptureReader<R> {
    fn next_event(&mut self) -> Result<Option<Event>, WireError> {
        let offset = self.offset;

        let mut head = [0u8; FRAME_HEADER_LEN];
        match read_full(&mut self.inner, &mut head)? {
            0 => return Ok(None),
            FRAME_HEADER_LEN => {}
            _ => return Err(WireError::Truncated { offset }),
        }

        let len = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
        let expected = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);
        if len > MAX_FRAME_LEN {
            return Err(WireError::FrameTooLarge { len, offset });
        }

        let mut payload = vec![0u8; len as usize];
        if read_full(&mut self.inner, &mut payload)? < payload.len() {
            return Err(WireError::Truncated { offset });
        }

        let mut hasher = Crc32::new();
        hasher.update(&payload);
        let actual = hasher.finalize();
        if actual != expected {
            return Err(WireError::CrcMismatch {
                offset,
                expected,
                actual,
            });
        }

        self.offset += FRAME_HEADER_LEN as u64 + u64::from(len);
        Ok(Some(postcard::from_bytes(&payload)?))
    }
}

/// Читает до заполнения буфера или EOF, возвращает число байт
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
