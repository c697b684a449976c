//! Memory map file reader.

use std::{ffi::c_void, fs, ptr, slice};

use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};

use super::*;

/// File reader based on `mmap(2)`.
pub struct Mmap {
    content: MmapContent,
}

impl FileReader for Mmap {
    type Bytes = MmapContent;

    fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = fs::File::open(path)?;

        let length: usize = file.metadata()?.len().try_into().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "memory map length is too large to fit in `usize`",
            )
        })?;

        // `mmap(2)` rejects zero-length maps; an empty file is simply an
        // empty byte slice.
        if length == 0 {
            return Ok(Self {
                content: MmapContent { _file: file, pointer: ptr::null(), length: 0 },
            });
        }

        let pointer = unsafe {
            mmap(ptr::null_mut(), length, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
                .map_err(|errno| std::io::Error::from_raw_os_error(errno.raw_os_error()))?
        };

        Ok(Self { content: MmapContent { _file: file, pointer, length } })
    }

    fn read_as_bytes(self) -> Result<Self::Bytes> {
        Ok(self.content)
    }
}

/// Represents the content read from a [`Mmap`].
pub struct MmapContent {
    _file: fs::File,
    pointer: *const c_void,
    length: usize,
}

impl Deref for MmapContent {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        if self.pointer.is_null() {
            return &[];
        }

        unsafe { slice::from_raw_parts(self.pointer as *const u8, self.length) }
    }
}

impl Drop for MmapContent {
    fn drop(&mut self) {
        if self.pointer.is_null() {
            return;
        }

        // The pointer came from `mmap` with offset 0, so it is page
        // aligned already.
        let _ = unsafe { munmap(self.pointer as *mut _, self.length) };
    }
}

// SAFETY: `MmapContent.pointer`'s lifetime is tied to `MmapContent._file`.
unsafe impl Send for MmapContent {}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_mmap() -> Result<()> {
        let path = std::env::temp_dir().join("braze-file-mmap-test.bin");
        fs::File::create(&path)?.write_all(b"abcdef")?;

        let file = Mmap::open(&path)?;
        let content = file.read_as_bytes()?;

        assert_eq!(&*content, b"abcdef");

        fs::remove_file(&path)?;

        Ok(())
    }

    #[test]
    fn test_mmap_empty_file() -> Result<()> {
        let path = std::env::temp_dir().join("braze-file-mmap-empty-test.bin");
        fs::File::create(&path)?;

        let content = Mmap::open(&path)?.read_as_bytes()?;

        assert!(content.is_empty());

        fs::remove_file(&path)?;

        Ok(())
    }
}
