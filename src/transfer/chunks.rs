use std::io::{self, Read};

/// Pull-style producer over an open file
///
/// Each call fills at most `min(buf.len(), cap)` bytes from the current
/// cursor and returns 0 once the file is exhausted. The sequence is finite and
/// cannot be restarted: a new transfer reopens the file and builds a new
/// producer at offset 0.
pub struct ChunkProducer<R> {
    reader: R,
    cap: usize,
    offset: u64,
    exhausted: bool,
}

impl<R: Read> ChunkProducer<R> {
    pub fn new(reader: R, cap: usize) -> Self {
        Self {
            reader,
            cap: cap.max(1),
            offset: 0,
            exhausted: false,
        }
    }

    /// Fill `buf` with the next chunk. `Ok(0)` signals end of data.
    pub fn produce(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exhausted {
            return Ok(0);
        }

        let want = buf.len().min(self.cap);
        let mut filled = 0;
        while filled < want {
            match self.reader.read(&mut buf[filled..want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled == 0 && want > 0 {
            self.exhausted = true;
        }
        self.offset += filled as u64;

        Ok(filled)
    }

    /// Bytes produced so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Iterator of owned chunks, for transports that consume a stream of bodies
pub struct FileChunks<R> {
    producer: ChunkProducer<R>,
    chunk_size: usize,
}

impl<R: Read> FileChunks<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            producer: ChunkProducer::new(reader, chunk_size),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        self.producer.offset()
    }
}

impl<R: Read> Iterator for FileChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = vec![0u8; self.chunk_size];
        match self.producer.produce(&mut buf) {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(buf))
            }
            Err(e) => {
                // an I/O error ends the sequence
                self.producer.exhausted = true;
                Some(Err(e))
            }
        }
    }
}
