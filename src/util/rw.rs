use std::{fmt::Write, fs::File, io};

use super::rc::{RcRefCell, RcRefCellT};

pub struct StringBuffer {
    s: String,
}

impl StringBuffer {
    pub fn new() -> StringBuffer {
        StringBuffer { s: String::new() }
    }

    pub fn as_str(&self) -> &str {
        self.s.as_str()
    }

    pub fn clear(&mut self) {
        self.s = String::new();
    }

    pub fn export_string(&mut self) -> String {
        std::mem::take(&mut self.s)
    }
}

// String only implements fmt::Write
impl io::Write for StringBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let str_rep = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let res = self.s.write_str(str_rep);
        match res {
            Ok(_) => Ok(buf.len()),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// For convenience, so we can pass around a shared stream writer.
//
// One use is to capture errors of interest to users, so they can
// be presented either on stderr, or buffered for tests to assert on.
#[derive(Clone)]
pub struct WriteHandle {
    w: RcRefCell<dyn io::Write>,
}

impl WriteHandle {
    pub fn stdout_write_handle() -> WriteHandle {
        WriteHandle { w: RcRefCellT::new(io::stdout()) }
    }

    pub fn stderr_write_handle() -> WriteHandle {
        WriteHandle { w: RcRefCellT::new(io::stderr()) }
    }

    pub fn string_buff_write_handle() -> (WriteHandle, RcRefCell<StringBuffer>) {
        let buffer = RcRefCellT::new(StringBuffer::new());
        let h = WriteHandle { w: buffer.clone() };
        (h, buffer)
    }

    pub fn file_write_handle(f: File) -> WriteHandle {
        WriteHandle { w: RcRefCellT::new(f) }
    }

    pub fn empty_write_handle() -> WriteHandle {
        WriteHandle { w: RcRefCellT::new(io::empty()) }
    }
}

impl io::Write for WriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Trace here, since tests should generally disable the error writer
        // or use a string buffer.
        // The test framework cannot capture direct writes to stdout or stderr,
        // only writes through print/println/eprintln.
        tracing::info!("WriteHandle::write {}", {
            let mut b = StringBuffer::new();
            let _ = b.write(buf);
            b
        }
        .as_str());
        self.w.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.borrow_mut().flush()
    }
}

// tt - TokenTree
// ($($arg:tt)*) Variable number of tts
#[macro_export]
macro_rules! write_errln {
    ($w:expr, $($arg:tt)*) => {{
        use std::io::Write;
        let _ = writeln!($w, $($arg)*);
    }};
}
