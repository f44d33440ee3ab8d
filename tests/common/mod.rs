use std::path::PathBuf;

fn test_temp_file_path(suffix: &str) -> PathBuf {
    let tmpdir = std::env::temp_dir();

    let make_file_path = |val: u32| {
        let fname = format!("b3notes-test-{}-{}", val, suffix);
        tmpdir.join(fname)
    };

    for val in 1..1000000 {
        let path = make_file_path(val);
        if !path.exists() {
            return path;
        }
    }
    panic!("Could not create a temp file path that does not already exist");
}

/// A unique temp file path, removed (if it was created) on drop.
pub struct TestTempFile {
    pub path: PathBuf,
}

impl TestTempFile {
    pub fn new(suffix: &str) -> TestTempFile {
        TestTempFile { path: test_temp_file_path(suffix) }
    }

    pub fn with_contents(suffix: &str, contents: &str) -> TestTempFile {
        let f = TestTempFile::new(suffix);
        std::fs::write(&f.path, contents).unwrap();
        f
    }
}

impl Drop for TestTempFile {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
