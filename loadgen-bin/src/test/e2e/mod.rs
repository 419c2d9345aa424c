use std::{io::Write, sync::Arc};

use parking_lot::Mutex;

pub(super) mod target;

mod test_load_run;

/// Report sink that can be inspected after the writer was moved into a run.
#[derive(Debug, Clone, Default)]
pub(super) struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub(super) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
