//! Opening track and genome text files
//!
//! Chromosome sizes, genome properties, wiggle and bedGraph inputs may be
//! plain, gzip or bzip2 compressed. Large plain files are memory-mapped.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Read buffer for decompressed and small plain inputs
pub const READ_BUFFER_SIZE: usize = 128 * 1024;

/// Plain files at least this large are memory-mapped
pub const MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Compression of a text input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Bzip2,
}

impl Compression {
    /// Decide by extension, falling back to the leading magic bytes
    pub fn detect(path: &Path) -> io::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") | Some("bgz") => return Ok(Compression::Gzip),
            Some("bz2") => return Ok(Compression::Bzip2),
            _ => {}
        }

        let mut head = [0u8; 3];
        let n = File::open(path)?.read(&mut head)?;
        let head = &head[..n];
        Ok(if head.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else {
            Compression::Plain
        })
    }
}

/// Cursor over a memory-mapped track file
struct MappedTrack {
    mmap: Mmap,
    offset: usize,
}

impl Read for MappedTrack {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.fill_buf()?.read(buf)?;
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for MappedTrack {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.mmap[self.offset..])
    }

    fn consume(&mut self, amt: usize) {
        self.offset = (self.offset + amt).min(self.mmap.len());
    }
}

/// Open a text input for line-oriented reading
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    Ok(match Compression::detect(path)? {
        Compression::Gzip => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            flate2::read::MultiGzDecoder::new(file),
        )),
        Compression::Bzip2 => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
        Compression::Plain if file.metadata()?.len() >= MMAP_THRESHOLD => {
            // SAFETY: inputs are only read while mapped
            let mmap = unsafe { Mmap::map(&file)? };
            Box::new(MappedTrack { mmap, offset: 0 })
        }
        Compression::Plain => Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
    })
}

/// Lines without their terminator, read into one reused buffer
pub struct LineIterator<R: BufRead> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::with_capacity(256),
            line_number: 0,
        }
    }

    /// Next line, or None at end of input
    pub fn next_line(&mut self) -> Option<io::Result<&str>> {
        self.line.clear();
        match self.reader.read_line(&mut self.line) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                let len = self.line.trim_end_matches(['\n', '\r']).len();
                self.line.truncate(len);
                Some(Ok(&self.line))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// 1-based number of the line last returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read_all(path: &Path) -> io::Result<String> {
        let mut content = String::new();
        open_input(path)?.read_to_string(&mut content)?;
        Ok(content)
    }

    #[test]
    fn test_line_iterator_strips_terminators() -> io::Result<()> {
        let data = b"chr1\t100\r\nchr2\t200\nchr3\t300";
        let mut lines = LineIterator::new(BufReader::new(&data[..]));

        assert_eq!(lines.next_line().unwrap()?, "chr1\t100");
        assert_eq!(lines.line_number(), 1);
        assert_eq!(lines.next_line().unwrap()?, "chr2\t200");
        assert_eq!(lines.next_line().unwrap()?, "chr3\t300");
        assert_eq!(lines.line_number(), 3);
        assert!(lines.next_line().is_none());
        Ok(())
    }

    #[test]
    fn test_mapped_track_reads_everything() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(b"variableStep chrom=chr1\n1 0.5\n")?;
        temp.flush()?;

        let mmap = unsafe { Mmap::map(&File::open(temp.path())?)? };
        let mut track = MappedTrack { mmap, offset: 0 };
        let mut content = String::new();
        track.read_to_string(&mut content)?;
        assert_eq!(content, "variableStep chrom=chr1\n1 0.5\n");
        Ok(())
    }

    #[test]
    fn test_gzip_by_extension_and_magic() -> io::Result<()> {
        use flate2::write::GzEncoder;

        let content = b"chr1\t0\t10\t1.5\n";
        let mut plain = NamedTempFile::new()?;
        plain.write_all(content)?;
        plain.flush()?;

        let named = tempfile::Builder::new().suffix(".gz").tempfile()?;
        let unnamed = NamedTempFile::new()?;
        for path in [named.path(), unnamed.path()] {
            let mut encoder = GzEncoder::new(File::create(path)?, flate2::Compression::default());
            encoder.write_all(content)?;
            encoder.finish()?;
            assert_eq!(Compression::detect(path)?, Compression::Gzip);
            assert_eq!(read_all(path)?, read_all(plain.path())?);
        }
        assert_eq!(Compression::detect(plain.path())?, Compression::Plain);
        Ok(())
    }

    #[test]
    fn test_bzip2_by_magic() -> io::Result<()> {
        use bzip2::write::BzEncoder;

        let temp = NamedTempFile::new()?;
        let mut encoder = BzEncoder::new(File::create(temp.path())?, bzip2::Compression::default());
        encoder.write_all(b"chr1\t100\n")?;
        encoder.finish()?;

        assert_eq!(Compression::detect(temp.path())?, Compression::Bzip2);
        assert_eq!(read_all(temp.path())?, "chr1\t100\n");
        Ok(())
    }
}
